//! In-process service registry with live service sets

use crate::{CoreError, Discovery, Instance, Registration, Result, ServiceSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use uuid::Uuid;

/// ServiceRegistry maintains the members of each service name.
///
/// Every service is backed by a watch channel, so the sets handed out by
/// [`ServiceRegistry::attach`] observe later registrations without polling.
pub struct ServiceRegistry {
    // Map of service name to its membership channel
    services: Arc<RwLock<HashMap<String, watch::Sender<Vec<Instance>>>>>,
}

/// Information about a registered service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub instances: Vec<Instance>,
}

/// Service set that follows a registry entry as it changes
#[derive(Clone, Debug)]
pub struct LiveServiceSet {
    name: String,
    members: watch::Receiver<Vec<Instance>>,
}

impl LiveServiceSet {
    /// Current instances, including ids and registration times
    pub fn instances(&self) -> Vec<Instance> {
        self.members.borrow().clone()
    }
}

impl ServiceSet for LiveServiceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn addrs(&self) -> Vec<String> {
        self.members
            .borrow()
            .iter()
            .map(|instance| instance.addr.clone())
            .collect()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Attach to a service, creating an empty entry if nobody registered it yet
    pub async fn attach(&self, name: &str) -> Result<LiveServiceSet> {
        validate_name(name)?;

        {
            let services = self.services.read().await;
            if let Some(sender) = services.get(name) {
                return Ok(LiveServiceSet {
                    name: name.to_string(),
                    members: sender.subscribe(),
                });
            }
        }

        let mut services = self.services.write().await;
        let sender = services
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0);

        debug!("Attached to service: {}", name);
        Ok(LiveServiceSet {
            name: name.to_string(),
            members: sender.subscribe(),
        })
    }

    /// Register an address as a member of a service
    pub async fn register(&self, name: &str, addr: &str) -> Result<Registration> {
        validate_name(name)?;
        validate_addr(addr)?;

        let instance = Instance::new(addr);
        let registration = Registration {
            id: instance.id,
            service: name.to_string(),
            addr: addr.to_string(),
        };

        let mut services = self.services.write().await;
        let sender = services
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0);
        sender.send_modify(|instances| instances.push(instance));

        debug!("Registered {} for service {} ({})", addr, name, registration.id);
        Ok(registration)
    }

    /// Remove a single instance from a service
    pub async fn deregister(&self, name: &str, id: Uuid) -> Result<()> {
        let services = self.services.read().await;
        let sender = services
            .get(name)
            .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))?;

        let removed = sender.send_if_modified(|instances| {
            let before = instances.len();
            instances.retain(|instance| instance.id != id);
            instances.len() != before
        });

        if !removed {
            return Err(CoreError::InstanceNotFound {
                service: name.to_string(),
                instance: id.to_string(),
            });
        }

        debug!("Deregistered {} from service {}", id, name);
        Ok(())
    }

    /// Get service information
    pub async fn get_service(&self, name: &str) -> Result<ServiceInfo> {
        let services = self.services.read().await;
        services
            .get(name)
            .map(|sender| ServiceInfo {
                name: name.to_string(),
                instances: sender.borrow().clone(),
            })
            .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))
    }

    /// List all services, sorted by name
    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        let services = self.services.read().await;
        let mut list: Vec<ServiceInfo> = services
            .iter()
            .map(|(name, sender)| ServiceInfo {
                name: name.clone(),
                instances: sender.borrow().clone(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    /// Render the registry contents as pretty JSON
    pub async fn snapshot_json(&self) -> Result<String> {
        let services = self.list_services().await?;
        Ok(serde_json::to_string_pretty(&services)?)
    }

    /// Get count of known services
    pub async fn service_count(&self) -> usize {
        let services = self.services.read().await;
        services.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Discovery for ServiceRegistry {
    async fn service_set(&self, name: &str) -> Result<Arc<dyn ServiceSet>> {
        let set = self.attach(name).await?;
        Ok(Arc::new(set))
    }

    async fn register(&self, name: &str, addr: &str) -> Result<Registration> {
        ServiceRegistry::register(self, name, addr).await
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c == ':' || c == '/' || c.is_whitespace());
    if invalid {
        return Err(CoreError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

fn validate_addr(addr: &str) -> Result<()> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(CoreError::InvalidAddress(addr.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attach_unknown_service_is_empty() {
        let registry = ServiceRegistry::new();
        let set = registry.attach("payments").await.unwrap();
        assert_eq!(set.name(), "payments");
        assert!(set.addrs().is_empty());
        assert_eq!(registry.service_count().await, 1);
    }

    #[tokio::test]
    async fn test_attached_set_sees_later_registrations() {
        let registry = ServiceRegistry::new();
        let set = registry.attach("payments").await.unwrap();

        registry.register("payments", "10.0.0.1:8080").await.unwrap();
        registry.register("payments", "10.0.0.2:8080").await.unwrap();

        assert_eq!(set.addrs(), vec!["10.0.0.1:8080", "10.0.0.2:8080"]);
    }

    #[tokio::test]
    async fn test_deregister_removes_instance() {
        let registry = ServiceRegistry::new();
        let set = registry.attach("payments").await.unwrap();
        let first = registry.register("payments", "10.0.0.1:8080").await.unwrap();
        registry.register("payments", "10.0.0.2:8080").await.unwrap();

        registry.deregister("payments", first.id).await.unwrap();
        assert_eq!(set.addrs(), vec!["10.0.0.2:8080"]);

        let err = registry.deregister("payments", first.id).await.unwrap_err();
        assert!(matches!(err, CoreError::InstanceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_deregister_unknown_service() {
        let registry = ServiceRegistry::new();
        let err = registry.deregister("ghost", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::ServiceNotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_invalid_service_names() {
        let registry = ServiceRegistry::new();
        for name in ["", "svc:80", "a/b", "has space"] {
            let err = registry.attach(name).await.unwrap_err();
            assert!(matches!(err, CoreError::InvalidServiceName(_)), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_addresses() {
        let registry = ServiceRegistry::new();
        for addr in ["", "10.0.0.1", ":8080", "10.0.0.1:http", "10.0.0.1:70000"] {
            let err = registry.register("svc", addr).await.unwrap_err();
            assert!(matches!(err, CoreError::InvalidAddress(_)), "{addr:?}");
        }
        registry.register("svc", "[::1]:8080").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_services_sorted() {
        let registry = ServiceRegistry::new();
        registry.register("web", "10.0.0.1:80").await.unwrap();
        registry.register("api", "10.0.0.2:80").await.unwrap();

        let names: Vec<String> = registry
            .list_services()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["api", "web"]);

        let info = registry.get_service("web").await.unwrap();
        assert_eq!(info.instances.len(), 1);
        assert_eq!(info.instances[0].addr, "10.0.0.1:80");
    }

    #[tokio::test]
    async fn test_snapshot_json() {
        let registry = ServiceRegistry::new();
        registry.register("web", "10.0.0.1:80").await.unwrap();

        let json = registry.snapshot_json().await.unwrap();
        let parsed: Vec<ServiceInfo> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].instances[0].addr, "10.0.0.1:80");
    }

    #[tokio::test]
    async fn test_discovery_trait_object() {
        let registry: Arc<dyn Discovery> = Arc::new(ServiceRegistry::new());
        let set = registry.service_set("web").await.unwrap();
        registry.register("web", "10.0.0.1:80").await.unwrap();
        assert_eq!(set.addrs(), vec!["10.0.0.1:80"]);
    }
}
