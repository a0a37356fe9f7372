//! Discovery contract consumed by dialers

use crate::{Registration, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Live view of the current members of a named service.
///
/// Implementations keep themselves up to date; readers only ever take
/// snapshots.
pub trait ServiceSet: Send + Sync {
    /// Name of the service this set tracks
    fn name(&self) -> &str;

    /// Snapshot of the current member addresses. Empty means no live members.
    fn addrs(&self) -> Vec<String>;
}

/// Discovery backend: attach to service sets and register addresses
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Attach to the live membership of `name`.
    async fn service_set(&self, name: &str) -> Result<Arc<dyn ServiceSet>>;

    /// Register `addr` as a member of `name`.
    async fn register(&self, name: &str, addr: &str) -> Result<Registration>;
}
