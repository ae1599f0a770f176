//! Scripted discovery backend for tests that care about call counts,
//! timing and overlap rather than argument matching.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::DiscoveryClient;
use super::descriptor::ServiceDescriptor;
use super::error::{DiscoveryError, DiscoveryResult};

pub(crate) struct ScriptedClient {
    register_script: Mutex<VecDeque<bool>>,
    deregister_script: Mutex<VecDeque<bool>>,
    // Outcome once a script runs out
    reachable: AtomicBool,
    latency: Option<Duration>,
    register_calls: AtomicUsize,
    deregister_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new(register: Vec<bool>, deregister: Vec<bool>) -> Self {
        Self {
            register_script: Mutex::new(register.into()),
            deregister_script: Mutex::new(deregister.into()),
            reachable: AtomicBool::new(true),
            latency: None,
            register_calls: AtomicUsize::new(0),
            deregister_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn always_succeeding() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub(crate) fn unreachable() -> Self {
        let client = Self::always_succeeding();
        client.set_reachable(false);
        client
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn deregister_calls(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, script: &Mutex<VecDeque<bool>>) -> DiscoveryResult<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = script.lock().unwrap().pop_front();
        let ok = scripted.unwrap_or_else(|| self.reachable.load(Ordering::SeqCst));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if ok {
            Ok(())
        } else {
            Err(DiscoveryError::Transport("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl DiscoveryClient for ScriptedClient {
    async fn register(&self, _descriptor: &ServiceDescriptor) -> DiscoveryResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.call(&self.register_script).await
    }

    async fn deregister(&self, _instance_id: &str) -> DiscoveryResult<()> {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);
        self.call(&self.deregister_script).await
    }
}
