//! Registered service instances
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single member of a service: one address that answers for the name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub addr: String,
    pub registered_at: DateTime<Utc>,
}

impl Instance {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            addr: addr.into(),
            registered_at: Utc::now(),
        }
    }
}

/// Handle returned when an address is registered for a service.
///
/// Dropping the handle does not deregister the instance; pass `id` to
/// `ServiceRegistry::deregister` for that.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub service: String,
    pub addr: String,
}
