//! Core service discovery functionality
//!
//! This library provides:
//! - The discovery contract consumed by the resolving dialer
//! - An in-process service registry with live service sets
//! - Instance and registration types

pub mod discovery;
pub mod error;
pub mod instance;
pub mod registry;

pub use discovery::{Discovery, ServiceSet};
pub use error::{CoreError, Result};
pub use instance::{Instance, Registration};
pub use registry::{LiveServiceSet, ServiceInfo, ServiceRegistry};
