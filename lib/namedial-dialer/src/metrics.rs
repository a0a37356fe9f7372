//! Prometheus instrumentation for connectors

use crate::{Connector, Network};
use anyhow::Result;
use async_trait::async_trait;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Prometheus metrics for connection attempts
#[derive(Clone)]
pub struct ConnectorMetrics {
    /// Connection attempts by network and outcome
    pub connect_total: IntCounterVec,
    /// Connection attempt latency in seconds
    pub connect_duration_seconds: HistogramVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl ConnectorMetrics {
    /// Create a new set of connector metrics in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let connect_total = IntCounterVec::new(
            Opts::new("namedial_connect_total", "Connection attempts by outcome"),
            &["network", "outcome"],
        )?;

        let connect_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "namedial_connect_duration_seconds",
                "Connection attempt latency in seconds",
            ),
            &["network"],
        )?;

        registry.register(Box::new(connect_total.clone()))?;
        registry.register(Box::new(connect_duration_seconds.clone()))?;

        Ok(Self {
            connect_total,
            connect_duration_seconds,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn record(&self, network: Network, outcome: &str, started: Instant) {
        self.connect_total
            .with_label_values(&[network.as_str(), outcome])
            .inc();
        self.connect_duration_seconds
            .with_label_values(&[network.as_str()])
            .observe(started.elapsed().as_secs_f64());
    }
}

/// Connector wrapper that records metrics and logs each attempt.
///
/// The inner connector's result is returned as is.
pub struct InstrumentedConnector<C> {
    inner: C,
    metrics: ConnectorMetrics,
}

impl<C> InstrumentedConnector<C> {
    pub fn new(inner: C, metrics: ConnectorMetrics) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> &ConnectorMetrics {
        &self.metrics
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Connector> Connector for InstrumentedConnector<C> {
    type Conn = C::Conn;

    async fn connect(&self, network: Network, addr: &str) -> io::Result<C::Conn> {
        let started = Instant::now();
        let result = self.inner.connect(network, addr).await;
        match &result {
            Ok(_) => {
                debug!("Connected to {} over {} in {:?}", addr, network, started.elapsed());
                self.metrics.record(network, "success", started);
            }
            Err(e) => {
                warn!("Connect to {} over {} failed: {}", addr, network, e);
                self.metrics.record(network, "error", started);
            }
        }
        result
    }
}
