// Listener Registry - named listeners started and stopped together

use crate::application::listener::MessageListener;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Holds listeners by id
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<BTreeMap<String, Arc<MessageListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `id`
    ///
    /// A listener already registered under the same id is replaced and
    /// destroyed.
    pub fn register(&self, id: impl Into<String>, listener: Arc<MessageListener>) {
        let id = id.into();
        let replaced = self.listeners.write().insert(id.clone(), listener);
        if let Some(previous) = replaced {
            warn!(listener_id = %id, "Listener id already registered; replacing");
            previous.destroy();
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<MessageListener>> {
        self.listeners.read().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.listeners.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    fn snapshot(&self) -> Vec<(String, Arc<MessageListener>)> {
        self.listeners
            .read()
            .iter()
            .map(|(id, listener)| (id.clone(), Arc::clone(listener)))
            .collect()
    }

    /// Subscribe every listener; stops at the first failure
    pub fn start_all(&self) -> Result<()> {
        for (id, listener) in self.snapshot() {
            listener.subscribe()?;
            info!(listener_id = %id, queue = %listener.queue().address(), "Listener started");
        }
        Ok(())
    }

    pub fn stop_all(&self) {
        for (_, listener) in self.snapshot() {
            listener.destroy();
        }
    }

    /// Await every listener within one shared `timeout`
    ///
    /// Returns false if any listener did not terminate gracefully.
    pub async fn await_termination_all(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut graceful = true;
        for (id, listener) in self.snapshot() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !listener.await_termination(remaining).await {
                warn!(listener_id = %id, "Listener did not terminate in time");
                graceful = false;
            }
        }
        graceful
    }

    /// True if any listener is running
    pub fn is_running(&self) -> bool {
        self.listeners.read().values().any(|l| l.is_running())
    }
}
