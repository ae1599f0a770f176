//! Host-facing lifecycle hooks for discovery registration

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::client::DiscoveryClient;
use super::descriptor::ServiceDescriptor;
use super::heartbeat::HeartbeatSupervisor;
use super::registrar::Registrar;

/// Owns the registrar and its heartbeat for the lifetime of the process.
pub struct ServiceRegistry {
    registrar: Arc<Registrar>,
    heartbeat: HeartbeatSupervisor,
}

impl ServiceRegistry {
    pub fn new(
        descriptor: ServiceDescriptor,
        client: Arc<dyn DiscoveryClient>,
        heartbeat_interval: Duration,
    ) -> Self {
        let registrar = Arc::new(Registrar::new(descriptor, client));
        let heartbeat = HeartbeatSupervisor::new(registrar.clone(), heartbeat_interval);

        Self {
            registrar,
            heartbeat,
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        self.registrar.descriptor()
    }

    pub fn is_registered(&self) -> bool {
        self.registrar.is_registered()
    }

    /// Attempt the initial registration, then start the heartbeat. A failed
    /// attempt is reported but does not hold up startup.
    pub async fn on_startup(&self) -> bool {
        let registered = self.registrar.register_service().await;
        if !registered {
            warn!(
                service = %self.descriptor().service_name(),
                interval_secs = self.heartbeat.interval().as_secs(),
                "Initial registration failed, heartbeat will retry"
            );
        }

        self.heartbeat.start().await;
        registered
    }

    /// Stop the heartbeat, then withdraw the registration. Stopping first
    /// keeps a late tick from re-announcing an instance that is going away.
    pub async fn on_shutdown(&self) -> bool {
        self.heartbeat.stop().await;
        let deregistered = self.registrar.deregister_service().await;

        info!(
            service = %self.descriptor().service_name(),
            service_id = %self.descriptor().instance_id(),
            deregistered,
            "Service registry shut down"
        );
        deregistered
    }
}
