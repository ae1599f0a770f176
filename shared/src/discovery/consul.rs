//! Consul agent backend
//!
//! Talks to the local Consul agent's HTTP API:
//! `PUT /v1/agent/service/register` and
//! `PUT /v1/agent/service/deregister/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::client::DiscoveryClient;
use super::descriptor::ServiceDescriptor;
use super::error::{DiscoveryError, DiscoveryResult};

/// Connection settings for the Consul agent
#[derive(Debug, Clone)]
pub struct ConsulConfig {
    pub host: String,
    pub port: u16,
    pub token: Option<String>,
    /// Upper bound for a single agent call
    pub request_timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            host: "consul".to_string(),
            port: 8500,
            token: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl ConsulConfig {
    fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}

/// Agent registration payload
#[derive(Debug, Serialize)]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Check")]
    check: AgentServiceCheck<'a>,
}

#[derive(Debug, Serialize)]
struct AgentServiceCheck<'a> {
    #[serde(rename = "HTTP")]
    http: &'a str,
    #[serde(rename = "Interval")]
    interval: String,
}

impl<'a> From<&'a ServiceDescriptor> for AgentServiceRegistration<'a> {
    fn from(descriptor: &'a ServiceDescriptor) -> Self {
        Self {
            id: descriptor.instance_id(),
            name: descriptor.service_name(),
            address: descriptor.address(),
            port: descriptor.port(),
            check: AgentServiceCheck {
                http: descriptor.health_check_url(),
                interval: format!("{}s", descriptor.health_check_interval().as_secs().max(1)),
            },
        }
    }
}

/// [`DiscoveryClient`] backed by a Consul agent
pub struct ConsulClient {
    http_client: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl ConsulClient {
    pub fn new(config: ConsulConfig) -> DiscoveryResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url(),
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn put(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1{}", self.base_url, path);
        let request = self.http_client.put(url);

        match self.token {
            Some(ref token) => request.header("X-Consul-Token", token),
            None => request,
        }
    }

    async fn rejected(response: reqwest::Response) -> DiscoveryError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        DiscoveryError::Rejected { status, body }
    }
}

#[async_trait]
impl DiscoveryClient for ConsulClient {
    async fn register(&self, descriptor: &ServiceDescriptor) -> DiscoveryResult<()> {
        debug!(
            service_id = %descriptor.instance_id(),
            consul = %self.base_url,
            "Registering service in Consul"
        );

        let payload = AgentServiceRegistration::from(descriptor);
        let response = self
            .put("/agent/service/register")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(())
    }

    async fn deregister(&self, instance_id: &str) -> DiscoveryResult<()> {
        debug!(
            service_id = %instance_id,
            consul = %self.base_url,
            "Deregistering service from Consul"
        );

        let response = self
            .put(&format!("/agent/service/deregister/{}", instance_id))
            .send()
            .await?;

        // The agent answers 404 for ids it does not hold.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(service_id = %instance_id, "Service was not registered in Consul");
            return Ok(());
        }

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::put,
        Json, Router,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Clone, Default)]
    struct FakeAgent {
        registrations: Arc<Mutex<Vec<Value>>>,
        deregistrations: Arc<Mutex<Vec<String>>>,
        tokens: Arc<Mutex<Vec<Option<String>>>>,
    }

    async fn register(
        State(agent): State<FakeAgent>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> AxumStatus {
        let token = headers
            .get("X-Consul-Token")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        agent.tokens.lock().unwrap().push(token);

        if body["Name"] == "broken" {
            return AxumStatus::INTERNAL_SERVER_ERROR;
        }
        agent.registrations.lock().unwrap().push(body);
        AxumStatus::OK
    }

    async fn deregister(State(agent): State<FakeAgent>, Path(id): Path<String>) -> AxumStatus {
        match id.as_str() {
            "unknown" => AxumStatus::NOT_FOUND,
            "forbidden" => AxumStatus::FORBIDDEN,
            _ => {
                agent.deregistrations.lock().unwrap().push(id);
                AxumStatus::OK
            }
        }
    }

    async fn spawn_agent() -> (FakeAgent, u16) {
        let agent = FakeAgent::default();
        let app = Router::new()
            .route("/v1/agent/service/register", put(register))
            .route("/v1/agent/service/deregister/:id", put(deregister))
            .with_state(agent.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (agent, port)
    }

    fn client_for(port: u16, token: Option<&str>) -> ConsulClient {
        ConsulClient::new(ConsulConfig {
            host: "127.0.0.1".to_string(),
            port,
            token: token.map(str::to_string),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_keeps_explicit_scheme() {
        let config = ConsulConfig {
            host: "https://consul.internal/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://consul.internal:8500");
        assert_eq!(ConsulConfig::default().base_url(), "http://consul:8500");
    }

    #[tokio::test]
    async fn test_register_sends_agent_payload() {
        let (agent, port) = spawn_agent().await;
        let client = client_for(port, Some("secret"));
        let descriptor = ServiceDescriptor::new("user", "user", 8002, Duration::from_secs(10));

        assert_ok!(client.register(&descriptor).await);

        let registrations = agent.registrations.lock().unwrap().clone();
        assert_eq!(
            registrations,
            vec![json!({
                "ID": descriptor.instance_id(),
                "Name": "user",
                "Address": "user",
                "Port": 8002,
                "Check": {
                    "HTTP": "http://user:8002/health",
                    "Interval": "10s",
                },
            })]
        );
        assert_eq!(
            agent.tokens.lock().unwrap().clone(),
            vec![Some("secret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_register_rejection_carries_status() {
        let (_agent, port) = spawn_agent().await;
        let client = client_for(port, None);
        let descriptor = ServiceDescriptor::new("broken", "broken", 8002, Duration::from_secs(10));

        match client.register(&descriptor).await {
            Err(DiscoveryError::Rejected { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deregister_known_and_unknown_ids() {
        let (agent, port) = spawn_agent().await;
        let client = client_for(port, None);

        assert_ok!(client.deregister("user-1234").await);
        assert_ok!(client.deregister("unknown").await);

        assert_eq!(
            agent.deregistrations.lock().unwrap().clone(),
            vec!["user-1234".to_string()]
        );
        assert_err!(client.deregister("forbidden").await);
    }

    #[tokio::test]
    async fn test_unreachable_agent_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = client_for(port, None);
        let descriptor = ServiceDescriptor::new("user", "user", 8002, Duration::from_secs(10));

        let err = client.register(&descriptor).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Transport(_)));
        assert!(err.is_retryable());
    }
}
