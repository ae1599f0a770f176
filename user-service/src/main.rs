mod config;
mod handlers;
mod middleware;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use shared::{init_logging, init_metrics, ConsulClient, PrometheusHandle, ServiceRegistry};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(config.log_config()?).context("Failed to initialize logging")?;
    info!("Starting User Service...");

    let metrics_handle = init_metrics().context("Failed to initialize metrics")?;

    // Lazily connected so a database outage only shows up in /health
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect_lazy(&config.database.url)
        .context("Invalid database URL")?;

    let discovery_client =
        ConsulClient::new(config.discovery.consul()).context("Failed to build Consul client")?;
    let registry = Arc::new(ServiceRegistry::new(
        config.discovery.descriptor(),
        Arc::new(discovery_client),
        config.discovery.heartbeat_interval(),
    ));
    info!(
        service_id = %registry.descriptor().instance_id(),
        consul = %format!("{}:{}", config.discovery.consul_host, config.discovery.consul_port),
        "Service registry initialized"
    );

    // A failed first attempt is retried by the heartbeat; keep starting up.
    registry.on_startup().await;

    let app_state = Arc::new(AppState {
        db_pool,
        registry: registry.clone(),
        metrics_handle,
    });
    let app = create_router(app_state);

    let addr = config.server_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            registry.on_shutdown().await;
            return Err(e).with_context(|| format!("Failed to bind to {}", addr));
        }
    };
    info!("User Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("Server error")?;

    info!("User Service shut down gracefully");
    Ok(())
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Resolves on Ctrl-C or SIGTERM, after withdrawing the registration so the
/// backend stops routing to us before the listener closes.
async fn shutdown_signal(registry: Arc<ServiceRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, deregistering from service discovery...");
    registry.on_shutdown().await;
}

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub registry: Arc<ServiceRegistry>,
    pub metrics_handle: PrometheusHandle,
}
