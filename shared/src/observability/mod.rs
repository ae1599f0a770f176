//! Observability utilities
//!
//! Provides centralized logging and metrics setup for all services

pub mod logging;
pub mod metrics;

pub use logging::*;
pub use self::metrics::{
    init_metrics, metric_names, record_discovery_attempt, record_http_request,
    record_registration_state, PrometheusHandle,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Metrics setup error: {0}")]
    Metrics(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;
