//! HTTP client wiring: hyper clients that connect to services by name

use crate::{Connector, DialError, NetConn, Network, ResolvingDialer};
use http_body_util::Full;
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Connector for `hyper_util`'s legacy client that dials the URI host
/// through a [`ResolvingDialer`].
///
/// `http://payments/` and `http://payments:8080/` both connect to a member
/// of the `payments` service.
pub struct DialerConnector<C> {
    dialer: Arc<ResolvingDialer<C>>,
}

impl<C> DialerConnector<C> {
    pub fn new(dialer: Arc<ResolvingDialer<C>>) -> Self {
        Self { dialer }
    }
}

impl<C> Clone for DialerConnector<C> {
    fn clone(&self) -> Self {
        Self {
            dialer: self.dialer.clone(),
        }
    }
}

impl<C> tower::Service<Uri> for DialerConnector<C>
where
    C: Connector<Conn = NetConn> + 'static,
{
    type Response = TokioIo<TcpStream>;
    type Error = DialError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialer = self.dialer.clone();
        Box::pin(async move {
            let target = dial_target(&uri);
            let conn = dialer.dial(Network::Tcp, &target).await?;
            let stream = conn.into_tcp().map_err(DialError::Connect)?;
            Ok(TokioIo::new(stream))
        })
    }
}

/// `host[:port]` of a URI, without any userinfo
fn dial_target(uri: &Uri) -> String {
    match (uri.host(), uri.port_u16()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Build an HTTP client whose connections are resolved by `dialer`
pub fn http_client<C, B>(dialer: Arc<ResolvingDialer<C>>) -> Client<DialerConnector<C>, B>
where
    C: Connector<Conn = NetConn> + 'static,
    B: Body + Send,
    B::Data: Send,
{
    Client::builder(TokioExecutor::new()).build(DialerConnector::new(dialer))
}

/// Find the [`DialError`] behind a client error, if the failure came from dialing
pub fn find_dial_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a DialError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(dial_err) = e.downcast_ref::<DialError>() {
            return Some(dial_err);
        }
        current = e.source();
    }
    None
}

/// Serve a fixed text body over HTTP/1 on every request until accepting fails
pub async fn serve_text(listener: TcpListener, body: Bytes) -> io::Result<()> {
    info!("HTTP responder listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let body = body.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let body = body.clone();
                async move {
                    debug!("{} {} from {}", req.method(), req.uri().path(), peer_addr);
                    Ok::<_, Infallible>(Response::new(Full::new(body)))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectorMetrics, InstrumentedConnector, NetConnector};
    use http_body_util::{BodyExt, Empty};
    use hyper::StatusCode;
    use namedial_core::{CoreError, ServiceRegistry};

    async fn spawn_responder(body: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_text(listener, Bytes::from_static(body.as_bytes())));
        addr
    }

    #[tokio::test]
    async fn test_http_client_waits_for_registration() {
        let registry = Arc::new(ServiceRegistry::new());
        let dialer = Arc::new(ResolvingDialer::new(registry.clone()));
        let client: Client<_, Empty<Bytes>> = http_client(dialer);
        let uri: Uri = "http://httpclient/".parse().unwrap();

        let err = client.get(uri.clone()).await.unwrap_err();
        assert!(matches!(
            find_dial_error(&err),
            Some(DialError::NoServicesAvailable)
        ));

        let addr = spawn_responder("OK\n").await;
        registry
            .register("httpclient", &addr.to_string())
            .await
            .unwrap();

        let response = client.get(uri).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK\n");
    }

    #[tokio::test]
    async fn test_port_in_url_is_ignored() {
        let registry = Arc::new(ServiceRegistry::new());
        let addr = spawn_responder("hello\n").await;
        registry.register("web", &addr.to_string()).await.unwrap();

        let metrics = ConnectorMetrics::new().unwrap();
        let connector = InstrumentedConnector::new(NetConnector::new(), metrics.clone());
        let dialer = Arc::new(ResolvingDialer::with_connector(registry, connector));
        let client: Client<_, Empty<Bytes>> = http_client(dialer);

        let response = client
            .get("http://web:1/index.html".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let count = metrics
            .connect_total
            .with_label_values(&["tcp", "success"])
            .get();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_userinfo_is_not_the_service_name() {
        let registry = Arc::new(ServiceRegistry::new());
        let addr = spawn_responder("hello\n").await;
        registry.register("svc", &addr.to_string()).await.unwrap();

        let dialer = Arc::new(ResolvingDialer::new(registry));
        let client: Client<_, Empty<Bytes>> = http_client(dialer.clone());

        let response = client
            .get("http://user:pw@svc/".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dialer.cached_services().await, vec!["svc"]);
    }

    #[test]
    fn test_dial_target() {
        let target = |s: &str| dial_target(&s.parse::<Uri>().unwrap());
        assert_eq!(target("http://user:pw@svc:8080/x"), "svc:8080");
        assert_eq!(target("http://user@svc/"), "svc");
        assert_eq!(target("http://svc/"), "svc");
        assert_eq!(target("/relative/only"), "");
    }

    #[tokio::test]
    async fn test_invalid_name_surfaces_lookup_error() {
        let registry = Arc::new(ServiceRegistry::new());
        let dialer = Arc::new(ResolvingDialer::new(registry));
        let mut connector = DialerConnector::new(dialer);

        let uri: Uri = "/relative/only".parse().unwrap();
        let err = tower::Service::call(&mut connector, uri).await.unwrap_err();
        assert!(matches!(
            err,
            DialError::Lookup(CoreError::InvalidServiceName(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_error_reachable_from_client_error() {
        let registry = Arc::new(ServiceRegistry::new());
        // Reserve a port and release it so the connection is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        registry.register("down", &addr.to_string()).await.unwrap();

        let dialer = Arc::new(ResolvingDialer::new(registry));
        let client: Client<_, Empty<Bytes>> = http_client(dialer);

        let err = client
            .get("http://down/".parse().unwrap())
            .await
            .unwrap_err();
        match find_dial_error(&err) {
            Some(DialError::Connect(io_err)) => {
                assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
