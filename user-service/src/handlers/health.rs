use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::error;

use crate::AppState;

/// Health endpoint polled by the discovery backend.
///
/// Healthy only while the database answers; the backend drops our
/// registration after repeated 503s.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let descriptor = state.registry.descriptor();

    let (status, label) = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => (StatusCode::OK, "healthy"),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": descriptor.service_name(),
            "instance_id": descriptor.instance_id(),
            "registered": state.registry.is_registered(),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now(),
        })),
    )
}
