//! Single registration and deregistration attempts
//!
//! Both operations report their outcome as a `bool` and never return an
//! error: they run during startup and inside the heartbeat task, where an
//! escaping error would take down the process or the loop.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use super::client::DiscoveryClient;
use super::descriptor::ServiceDescriptor;
use super::state::RegistrationState;
use crate::observability::{record_discovery_attempt, record_registration_state};

pub struct Registrar {
    descriptor: ServiceDescriptor,
    client: Arc<dyn DiscoveryClient>,
    state: Arc<RegistrationState>,
    // Held for the whole backend round trip so attempts never overlap.
    attempt_lock: Mutex<()>,
}

impl Registrar {
    pub fn new(descriptor: ServiceDescriptor, client: Arc<dyn DiscoveryClient>) -> Self {
        record_registration_state(descriptor.service_name(), false);

        Self {
            descriptor,
            client,
            state: Arc::new(RegistrationState::new()),
            attempt_lock: Mutex::new(()),
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Read handle on the registration flag
    pub fn state(&self) -> Arc<RegistrationState> {
        self.state.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.state.is_registered()
    }

    /// Announce this instance once. Returns `true` and marks the state
    /// registered on success; on failure the state is left untouched.
    pub async fn register_service(&self) -> bool {
        let _guard = self.attempt_lock.lock().await;

        let result = self.client.register(&self.descriptor).await;
        record_discovery_attempt(self.descriptor.service_name(), "register", result.is_ok());

        match result {
            Ok(()) => {
                self.state.set_registered(true);
                record_registration_state(self.descriptor.service_name(), true);
                info!(
                    service = %self.descriptor.service_name(),
                    service_id = %self.descriptor.instance_id(),
                    target = %self.descriptor.target(),
                    "Service registered with discovery backend"
                );
                true
            }
            Err(e) => {
                error!(
                    service = %self.descriptor.service_name(),
                    service_id = %self.descriptor.instance_id(),
                    target = %self.descriptor.target(),
                    retryable = e.is_retryable(),
                    "Failed to register service with discovery backend: {}",
                    e
                );
                false
            }
        }
    }

    /// Withdraw this instance. Skips the backend call entirely when we are
    /// not registered. A failure is logged and not retried.
    pub async fn deregister_service(&self) -> bool {
        let _guard = self.attempt_lock.lock().await;

        if !self.state.is_registered() {
            return true;
        }

        let result = self.client.deregister(self.descriptor.instance_id()).await;
        record_discovery_attempt(self.descriptor.service_name(), "deregister", result.is_ok());

        match result {
            Ok(()) => {
                self.state.set_registered(false);
                record_registration_state(self.descriptor.service_name(), false);
                info!(
                    service = %self.descriptor.service_name(),
                    service_id = %self.descriptor.instance_id(),
                    "Service deregistered from discovery backend"
                );
                true
            }
            Err(e) => {
                error!(
                    service = %self.descriptor.service_name(),
                    service_id = %self.descriptor.instance_id(),
                    target = %self.descriptor.target(),
                    "Failed to deregister service from discovery backend: {}",
                    e
                );
                false
            }
        }
    }
}
