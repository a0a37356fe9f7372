//! Connectors turn a concrete address into an established connection

use crate::{DialerConfig, Network};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream, UdpSocket};

/// Connect-by-address primitive used by the resolving dialer
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced on success
    type Conn: Send;

    /// Establish a connection to `addr` over `network`
    async fn connect(&self, network: Network, addr: &str) -> io::Result<Self::Conn>;
}

/// Connection produced by [`NetConnector`]
#[derive(Debug)]
pub enum NetConn {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl NetConn {
    /// Unwrap a TCP stream, failing for datagram sockets
    pub fn into_tcp(self) -> io::Result<TcpStream> {
        match self {
            NetConn::Tcp(stream) => Ok(stream),
            NetConn::Udp(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "expected a tcp connection, got udp",
            )),
        }
    }

    /// Remote address of the connection
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            NetConn::Tcp(stream) => stream.peer_addr(),
            NetConn::Udp(socket) => socket.peer_addr(),
        }
    }
}

/// Platform dialer: tokio TCP streams and connected UDP sockets
#[derive(Clone, Debug, Default)]
pub struct NetConnector {
    connect_timeout: Option<Duration>,
}

impl NetConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DialerConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
        }
    }

    /// Fail connection attempts that take longer than `timeout`
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    async fn connect_inner(&self, network: Network, addr: &str) -> io::Result<NetConn> {
        let candidates: Vec<SocketAddr> = lookup_host(addr)
            .await?
            .filter(|candidate| network.accepts(candidate))
            .collect();

        let first = candidates.first().copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no {} address for {}", network, addr),
            )
        })?;

        if network.is_udp() {
            // Bind on the family of the first candidate and only try peers of that family
            let local: SocketAddr = if first.is_ipv4() {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let peers: Vec<SocketAddr> = candidates
                .into_iter()
                .filter(|peer| peer.is_ipv4() == first.is_ipv4())
                .collect();

            let socket = UdpSocket::bind(local).await?;
            socket.connect(&peers[..]).await?;
            return Ok(NetConn::Udp(socket));
        }

        let stream = TcpStream::connect(&candidates[..]).await?;
        Ok(NetConn::Tcp(stream))
    }
}

#[async_trait]
impl Connector for NetConnector {
    type Conn = NetConn;

    async fn connect(&self, network: Network, addr: &str) -> io::Result<NetConn> {
        match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.connect_inner(network, addr))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect to {} timed out after {:?}", addr, timeout),
                    )
                })?,
            None => self.connect_inner(network, addr).await,
        }
    }
}

/// Adapts an async function into a [`Connector`]
#[derive(Clone)]
pub struct ConnectFn<F>(F);

impl<F> ConnectFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut, T> Connector for ConnectFn<F>
where
    F: Fn(Network, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    type Conn = T;

    async fn connect(&self, network: Network, addr: &str) -> io::Result<T> {
        (self.0)(network, addr.to_string()).await
    }
}
