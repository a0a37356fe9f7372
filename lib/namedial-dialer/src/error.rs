use namedial_core::CoreError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DialError>;

/// Errors returned by [`ResolvingDialer::dial`](crate::ResolvingDialer::dial).
///
/// Only `NoServicesAvailable` originates in the dialer. Lookup and connect
/// failures carry the collaborator's error untouched, so callers can tell
/// discovery problems from connection problems.
#[derive(Error, Debug)]
pub enum DialError {
    #[error("no online services found")]
    NoServicesAvailable,

    #[error(transparent)]
    Lookup(CoreError),

    #[error(transparent)]
    Connect(io::Error),
}

impl DialError {
    /// Whether the failure happened before a connection was attempted
    pub fn is_discovery(&self) -> bool {
        !matches!(self, DialError::Connect(_))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
