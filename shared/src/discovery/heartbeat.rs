//! Background re-announcement loop
//!
//! Each tick reads the local registration flag and, when it is `false`,
//! asks the registrar for another attempt. The loop never deregisters and
//! never asks the backend what it currently holds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::registrar::Registrar;

/// Default spacing between ticks
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

struct RunningHeartbeat {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct HeartbeatSupervisor {
    registrar: Arc<Registrar>,
    interval: Duration,
    running: Mutex<Option<RunningHeartbeat>>,
}

impl HeartbeatSupervisor {
    pub fn new(registrar: Arc<Registrar>, interval: Duration) -> Self {
        Self {
            registrar,
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the heartbeat task. Returns `false` if one is already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;

        if let Some(ref current) = *running {
            if !current.handle.is_finished() {
                debug!("Heartbeat already running");
                return false;
            }
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(Self::run(
            self.registrar.clone(),
            self.interval,
            cancel_token.clone(),
        ));

        *running = Some(RunningHeartbeat {
            cancel_token,
            handle,
        });

        info!(
            service_id = %self.registrar.descriptor().instance_id(),
            interval_secs = self.interval.as_secs(),
            "Service registry heartbeat started"
        );
        true
    }

    /// Cancel the task and wait for it to exit. An attempt that is already
    /// talking to the backend finishes first. Safe to call when not running.
    pub async fn stop(&self) {
        let current = self.running.lock().await.take();

        let Some(current) = current else {
            return;
        };

        current.cancel_token.cancel();
        if let Err(e) = current.handle.await {
            error!("Heartbeat task ended abnormally: {}", e);
        }

        info!(
            service_id = %self.registrar.descriptor().instance_id(),
            "Service registry heartbeat stopped"
        );
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|current| !current.handle.is_finished())
            .unwrap_or(false)
    }

    async fn run(registrar: Arc<Registrar>, interval: Duration, cancel_token: CancellationToken) {
        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            if !registrar.is_registered() {
                debug!(
                    service_id = %registrar.descriptor().instance_id(),
                    "Not registered, attempting to re-register"
                );
                // Failures are already logged by the registrar; next tick retries.
                registrar.register_service().await;
            }

            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
