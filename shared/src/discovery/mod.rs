//! Service discovery registration
//!
//! Announces this service instance to the discovery backend, keeps the
//! announcement alive from a background heartbeat, and withdraws it on
//! shutdown. The registrar is the only writer of [`RegistrationState`].

pub mod client;
pub mod consul;
pub mod descriptor;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod registrar;
pub mod registry;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use client::DiscoveryClient;
pub use consul::{ConsulClient, ConsulConfig};
pub use descriptor::ServiceDescriptor;
pub use error::{DiscoveryError, DiscoveryResult};
pub use heartbeat::{HeartbeatSupervisor, DEFAULT_HEARTBEAT_INTERVAL};
pub use identity::generate_instance_id;
pub use registrar::Registrar;
pub use registry::ServiceRegistry;
pub use state::RegistrationState;
