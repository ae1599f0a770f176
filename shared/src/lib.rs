//! Shared utilities for the user service: logging and metrics setup and
//! the service-discovery registration subsystem.

// Re-export common dependencies
pub use thiserror;
pub use tracing;
pub use uuid;

pub mod discovery;
pub mod observability;

pub use discovery::{
    ConsulClient, ConsulConfig, DiscoveryClient, DiscoveryError, HeartbeatSupervisor,
    RegistrationState, Registrar, ServiceDescriptor, ServiceRegistry, DEFAULT_HEARTBEAT_INTERVAL,
};
pub use observability::{
    init_logging, init_metrics, record_http_request, LogConfig, LogFormat, LogLevel,
    PrometheusHandle,
};
