//! Discovery backend capability used by the registrar

use async_trait::async_trait;

use super::descriptor::ServiceDescriptor;
use super::error::DiscoveryResult;

/// Minimal surface the registrar needs from a discovery backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Announce the instance. Registering the same instance id again
    /// refreshes the existing entry instead of adding a second one.
    async fn register(&self, descriptor: &ServiceDescriptor) -> DiscoveryResult<()>;

    /// Withdraw the instance. An id the backend does not know is not an error.
    async fn deregister(&self, instance_id: &str) -> DiscoveryResult<()>;
}
