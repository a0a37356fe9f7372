use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Instance {instance} not found in service {service}")]
    InstanceNotFound { service: String, instance: String },

    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Discovery backend unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
