use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{
    ConsulConfig, LogConfig, LogFormat, LogLevel, ServiceDescriptor, DEFAULT_HEARTBEAT_INTERVAL,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    File(#[from] ::config::ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8002,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres:postgres@db:5432/users".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 3,
        }
    }
}

/// Discovery backend location and what this instance announces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub consul_host: String,
    pub consul_port: u16,
    pub consul_token: Option<String>,
    pub service_name: String,
    /// Address the backend should use to reach us; defaults to the service
    /// name, which is the container's DNS name on the compose network.
    pub service_address: Option<String>,
    pub service_port: u16,
    pub health_check_interval_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            consul_host: "consul".to_string(),
            consul_port: 8500,
            consul_token: None,
            service_name: "user".to_string(),
            service_address: None,
            service_port: 8002,
            health_check_interval_seconds: 10,
            heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL.as_secs(),
            request_timeout_seconds: 5,
        }
    }
}

impl DiscoveryConfig {
    pub fn address(&self) -> &str {
        self.service_address
            .as_deref()
            .filter(|address| !address.is_empty())
            .unwrap_or(&self.service_name)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(
            self.service_name.clone(),
            self.address(),
            self.service_port,
            Duration::from_secs(self.health_check_interval_seconds),
        )
    }

    pub fn consul(&self) -> ConsulConfig {
        ConsulConfig {
            host: self.consul_host.clone(),
            port: self.consul_port,
            token: self.consul_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env -> file (`CONFIG_FILE`) -> defaults
    pub fn load() -> ConfigResult<Self> {
        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file; keys it does not mention keep their defaults
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unset variables keep the
    /// current value; set but unparsable ones are an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server configuration
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }

        // Database configuration
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            self.database.max_connections = max;
        }
        if let Some(timeout) = parse_var(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECONDS")? {
            self.database.acquire_timeout_seconds = timeout;
        }

        // Discovery configuration
        if let Some(host) = lookup("CONSUL_HOST") {
            self.discovery.consul_host = host;
        }
        if let Some(port) = parse_var(&lookup, "CONSUL_PORT")? {
            self.discovery.consul_port = port;
        }
        if let Some(token) = lookup("CONSUL_TOKEN") {
            self.discovery.consul_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(name) = lookup("SERVICE_NAME") {
            self.discovery.service_name = name;
        }
        if let Some(address) = lookup("SERVICE_ADDRESS") {
            self.discovery.service_address = Some(address);
        }
        if let Some(port) = parse_var(&lookup, "SERVICE_PORT")? {
            self.discovery.service_port = port;
        }
        if let Some(secs) = parse_var(&lookup, "HEALTH_CHECK_INTERVAL_SECONDS")? {
            self.discovery.health_check_interval_seconds = secs;
        }
        if let Some(secs) = parse_var(&lookup, "HEARTBEAT_INTERVAL_SECONDS")? {
            self.discovery.heartbeat_interval_seconds = secs;
        }
        if let Some(secs) = parse_var(&lookup, "DISCOVERY_REQUEST_TIMEOUT_SECONDS")? {
            self.discovery.request_timeout_seconds = secs;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("Server port cannot be 0".to_string()));
        }
        if self.discovery.service_port == 0 || self.discovery.consul_port == 0 {
            return Err(ConfigError::InvalidValue(
                "Discovery ports cannot be 0".to_string(),
            ));
        }
        if self.discovery.service_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "Service name cannot be empty".to_string(),
            ));
        }
        if self.discovery.heartbeat_interval_seconds == 0
            || self.discovery.health_check_interval_seconds == 0
            || self.discovery.request_timeout_seconds == 0
        {
            return Err(ConfigError::InvalidValue(
                "Discovery intervals and timeouts must be at least 1 second".to_string(),
            ));
        }

        self.log_config()?;
        Ok(())
    }

    pub fn log_config(&self) -> ConfigResult<LogConfig> {
        let level: LogLevel = self
            .logging
            .level
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{}", e)))?;
        let format: LogFormat = self
            .logging
            .format
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{}", e)))?;

        Ok(LogConfig {
            level,
            format,
            service_name: self.discovery.service_name.clone(),
            ..Default::default()
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid {}: {}", key, raw))),
        None => Ok(None),
    }
}
