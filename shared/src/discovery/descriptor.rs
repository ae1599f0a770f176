use std::time::Duration;

use super::identity::generate_instance_id;

/// What this instance announces to the discovery backend.
///
/// Built once at startup; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    service_name: String,
    instance_id: String,
    address: String,
    port: u16,
    health_check_url: String,
    health_check_interval: Duration,
}

impl ServiceDescriptor {
    /// Create a descriptor with a freshly generated instance id. The health
    /// check points at `/health` on the announced address and port.
    pub fn new(
        service_name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        health_check_interval: Duration,
    ) -> Self {
        let service_name = service_name.into();
        let address = address.into();
        let instance_id = generate_instance_id(&service_name);
        let health_check_url = format!("http://{}:{}/health", address, port);

        Self {
            service_name,
            instance_id,
            address,
            port,
            health_check_url,
            health_check_interval,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn health_check_url(&self) -> &str {
        &self.health_check_url
    }

    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
    }

    /// `address:port`, as used in log lines.
    pub fn target(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_descriptor_fields() {
        let descriptor = ServiceDescriptor::new("user", "user", 8002, Duration::from_secs(10));

        assert_eq!(descriptor.service_name(), "user");
        assert!(descriptor.instance_id().starts_with("user-"));
        assert_eq!(descriptor.health_check_url(), "http://user:8002/health");
        assert_eq!(descriptor.health_check_interval(), Duration::from_secs(10));
        assert_eq!(descriptor.target(), "user:8002");
    }

    #[test]
    fn test_each_descriptor_gets_its_own_instance_id() {
        let a = ServiceDescriptor::new("user", "user", 8002, Duration::from_secs(10));
        let b = ServiceDescriptor::new("user", "user", 8002, Duration::from_secs(10));
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
