//! Dial-time service name resolution
//!
//! [`ResolvingDialer`] turns a target such as `"payments:8080"` into a
//! connection to one live member of the `payments` service, using a
//! [`namedial_core::Discovery`] backend for membership and a [`Connector`]
//! for the actual connect.
pub mod config;
pub mod connector;
pub mod dialer;
pub mod error;
pub mod http;
pub mod metrics;
pub mod network;
pub mod selector;

pub use config::DialerConfig;
pub use connector::{ConnectFn, Connector, NetConn, NetConnector};
pub use dialer::{service_name, ResolvingDialer};
pub use error::{ConfigError, DialError, Result};
pub use http::{find_dial_error, http_client, serve_text, DialerConnector};
pub use metrics::{ConnectorMetrics, InstrumentedConnector};
pub use network::Network;
pub use selector::{RandomSelector, RoundRobinSelector, SelectionStrategy, Selector};
