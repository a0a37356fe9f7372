use anyhow::{anyhow, bail, Context, Result};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::Uri;
use namedial_core::{Discovery, ServiceRegistry};
use namedial_dialer::{
    find_dial_error, http_client, serve_text, ConnectorMetrics, DialError, DialerConfig,
    InstrumentedConnector, NetConnector, ResolvingDialer,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const MEMBERS_ENV: &str = "NAMEDIAL_MEMBERS";
const SERVE_ENV: &str = "NAMEDIAL_SERVE";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting namedial-probe...");

    let config = DialerConfig::from_env()?;
    info!("Dialer configuration loaded");
    info!("  - Selection: {}", config.selection);
    info!("  - Connect timeout: {:?}", config.connect_timeout);

    let registry = Arc::new(ServiceRegistry::new());

    // Static members from the environment
    if let Ok(members) = std::env::var(MEMBERS_ENV) {
        for (name, addr) in parse_members(&members)? {
            registry.register(&name, &addr).await?;
            info!("Registered {} for {}", addr, name);
        }
    }

    // Optionally answer for a service ourselves
    if let Ok(name) = std::env::var(SERVE_ENV) {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let body = Bytes::from(format!("{} says hello\n", name));
        tokio::task::spawn(async move {
            if let Err(e) = serve_text(listener, body).await {
                error!("HTTP responder stopped: {}", e);
            }
        });

        let discovery: Arc<dyn Discovery> = registry.clone();
        let registration = discovery.register(&name, &addr.to_string()).await?;
        info!("Serving {} on {} ({})", name, addr, registration.id);
    }

    debug!("Registry state:\n{}", registry.snapshot_json().await?);

    let metrics = ConnectorMetrics::new()?;
    let connector =
        InstrumentedConnector::new(NetConnector::from_config(&config), metrics.clone());
    let dialer = ResolvingDialer::with_connector(registry.clone(), connector)
        .with_selector(config.selection.build());
    let client = http_client::<_, Empty<Bytes>>(Arc::new(dialer));

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        warn!("No URLs given; usage: namedial-probe http://<service>/path ...");
    }

    let mut failed = 0;
    for url in &urls {
        let uri: Uri = url.parse().with_context(|| format!("invalid URL {}", url))?;
        match client.get(uri).await {
            Ok(response) => {
                let status = response.status();
                let body = response.into_body().collect().await?.to_bytes();
                info!("GET {} -> {} ({} bytes)", url, status, body.len());
                println!("{}", String::from_utf8_lossy(&body).trim_end());
            }
            Err(e) => {
                failed += 1;
                match find_dial_error(&e) {
                    Some(DialError::NoServicesAvailable) => {
                        warn!("GET {} failed: no members registered", url)
                    }
                    Some(dial_err) if dial_err.is_discovery() => {
                        warn!("GET {} failed during lookup: {}", url, dial_err)
                    }
                    Some(dial_err) => warn!("GET {} failed to connect: {}", url, dial_err),
                    None => warn!("GET {} failed: {}", url, e),
                }
            }
        }
    }

    print!("{}", metrics.gather()?);

    if failed > 0 {
        bail!("{} of {} requests failed", failed, urls.len());
    }
    Ok(())
}

/// Parse `name=host:port` pairs separated by commas
fn parse_members(members: &str) -> Result<Vec<(String, String)>> {
    members
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, addr) = entry.split_once('=').ok_or_else(|| {
                anyhow!("{}: expected name=host:port, got {:?}", MEMBERS_ENV, entry)
            })?;
            Ok((name.trim().to_string(), addr.trim().to_string()))
        })
        .collect()
}
