//! Dialer that resolves service names through discovery at connect time

use crate::{Connector, DialError, DialerConfig, NetConnector, Network, RandomSelector, Result, Selector};
use namedial_core::{CoreError, Discovery, ServiceSet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Service name part of a dial target: everything before the first colon
pub fn service_name(target: &str) -> &str {
    target.split_once(':').map_or(target, |(name, _)| name)
}

/// ResolvingDialer connects to services by name.
///
/// A target such as `"payments:8080"` is reduced to its service name, the
/// name is resolved to a live [`ServiceSet`], and one member address is
/// handed to the underlying [`Connector`]. The port in the target is ignored;
/// members carry their own.
///
/// Service sets are looked up once per name and kept for the lifetime of the
/// dialer. They are live views, so membership changes show up without a new
/// lookup. Failed lookups are not cached.
pub struct ResolvingDialer<C = NetConnector> {
    discovery: Arc<dyn Discovery>,
    connector: C,
    selector: Box<dyn Selector>,
    sets: RwLock<HashMap<String, Arc<dyn ServiceSet>>>,
}

impl ResolvingDialer<NetConnector> {
    /// Create a dialer that connects with the platform dialer
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self::with_connector(discovery, NetConnector::new())
    }

    /// Create a dialer with selection and connect timeout taken from `config`
    pub fn from_config(discovery: Arc<dyn Discovery>, config: &DialerConfig) -> Self {
        Self::with_connector(discovery, NetConnector::from_config(config))
            .with_selector(config.selection.build())
    }
}

impl<C: Connector> ResolvingDialer<C> {
    /// Create a dialer that connects through `connector`
    pub fn with_connector(discovery: Arc<dyn Discovery>, connector: C) -> Self {
        Self {
            discovery,
            connector,
            selector: Box::new(RandomSelector),
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the address selector
    pub fn with_selector(mut self, selector: Box<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// The underlying connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Dial `target` (`name` or `name:port`) over `network`.
    ///
    /// Lookup and connector errors are returned as they were produced.
    pub async fn dial(&self, network: Network, target: &str) -> Result<C::Conn> {
        let set = self
            .service_set(service_name(target))
            .await
            .map_err(DialError::Lookup)?;

        let addrs = set.addrs();
        if addrs.is_empty() {
            return Err(DialError::NoServicesAvailable);
        }
        let addr = self
            .selector
            .select(&addrs)
            .ok_or(DialError::NoServicesAvailable)?;

        self.connector
            .connect(network, addr)
            .await
            .map_err(DialError::Connect)
    }

    /// Resolve a service name to its cached service set, looking it up on first use
    pub async fn service_set(&self, name: &str) -> std::result::Result<Arc<dyn ServiceSet>, CoreError> {
        {
            let sets = self.sets.read().await;
            if let Some(set) = sets.get(name) {
                return Ok(set.clone());
            }
        }
        self.create_set(name).await
    }

    async fn create_set(&self, name: &str) -> std::result::Result<Arc<dyn ServiceSet>, CoreError> {
        // The lookup runs under the write lock, which stalls every other
        // dial until it returns.
        let mut sets = self.sets.write().await;

        // Another dial may have filled the entry while we waited for the lock
        if let Some(set) = sets.get(name) {
            return Ok(set.clone());
        }

        let set = self.discovery.service_set(name).await?;
        sets.insert(name.to_string(), set.clone());
        Ok(set)
    }

    /// Names that currently have a cached service set, sorted
    pub async fn cached_services(&self) -> Vec<String> {
        let sets = self.sets.read().await;
        let mut names: Vec<String> = sets.keys().cloned().collect();
        names.sort();
        names
    }
}
