// Poller Supervisor - one long-lived polling task per concurrency unit

mod shutdown;

pub use shutdown::{cancel_channel, CancelSender, CancelToken};

use crate::application::consumer::BatchConsumer;
use crate::application::worker::constants::POLLER_NAME_PREFIX;
use crate::error::{AppError, Result};
use crate::port::IdProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Opaque poller identity
pub type PollerId = String;

/// Active-poller registry
///
/// A poller is active while its id is registered and its cancel sender has
/// not fired. Each poller loop checks its own id here before every cycle.
#[derive(Default)]
pub struct PollerRegistry {
    pollers: Mutex<HashMap<PollerId, CancelSender>>,
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: PollerId, cancel: CancelSender) {
        self.pollers.lock().insert(id, cancel);
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.pollers
            .lock()
            .get(id)
            .is_some_and(|cancel| !cancel.is_cancelled())
    }

    /// Cancel and unregister one poller; false if it was not registered
    pub fn cancel(&self, id: &str) -> bool {
        match self.pollers.lock().remove(id) {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and unregister up to `count` pollers, in no particular order
    pub fn cancel_any(&self, count: usize) -> Vec<PollerId> {
        let mut pollers = self.pollers.lock();
        let victims: Vec<PollerId> = pollers.keys().take(count).cloned().collect();
        for id in &victims {
            if let Some(cancel) = pollers.remove(id) {
                cancel.cancel();
            }
        }
        victims
    }

    /// Cancel and unregister every poller
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(PollerId, CancelSender)> = self.pollers.lock().drain().collect();
        for (_, cancel) in &drained {
            cancel.cancel();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.pollers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.lock().is_empty()
    }

    pub fn ids(&self) -> Vec<PollerId> {
        self.pollers.lock().keys().cloned().collect()
    }
}

struct SupervisorState {
    running: bool,
    target: usize,
    handles: Vec<JoinHandle<()>>,
}

/// Starts, scales and stops the pollers of one queue
pub struct PollerSupervisor {
    consumer: Arc<BatchConsumer>,
    registry: Arc<PollerRegistry>,
    id_provider: Arc<dyn IdProvider>,
    runtime: Handle,
    state: Mutex<SupervisorState>,
}

impl PollerSupervisor {
    pub fn new(
        consumer: Arc<BatchConsumer>,
        id_provider: Arc<dyn IdProvider>,
        runtime: Handle,
        concurrency: usize,
    ) -> Self {
        Self {
            consumer,
            registry: Arc::new(PollerRegistry::new()),
            id_provider,
            runtime,
            state: Mutex::new(SupervisorState {
                running: false,
                target: concurrency,
                handles: Vec::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<PollerRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn target_concurrency(&self) -> usize {
        self.state.lock().target
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Poller tasks that have not exited yet, including cancelled ones
    /// still finishing their cycle
    pub fn running_tasks(&self) -> usize {
        self.state
            .lock()
            .handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Start `target` pollers; no-op when already running
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        let target = state.target;
        for _ in 0..target {
            self.spawn_poller(&mut state);
        }
        info!(
            queue = %self.consumer.queue().address(),
            pollers = target,
            "Pollers started"
        );
    }

    /// Reconcile the active poller set toward `concurrency`
    ///
    /// While stopped only the stored target changes. Scaled-down pollers
    /// finish their current cycle before exiting.
    pub fn set_concurrency(&self, concurrency: usize) -> Result<()> {
        if concurrency == 0 {
            return Err(AppError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let mut state = self.state.lock();
        state.target = concurrency;
        if !state.running {
            debug!(
                queue = %self.consumer.queue().address(),
                concurrency,
                "Concurrency stored for next start"
            );
            return Ok(());
        }

        let active = self.registry.len();
        if active < concurrency {
            for _ in active..concurrency {
                self.spawn_poller(&mut state);
            }
        } else if active > concurrency {
            let cancelled = self.registry.cancel_any(active - concurrency);
            debug!(
                queue = %self.consumer.queue().address(),
                cancelled = ?cancelled,
                "Pollers cancelled for scale-down"
            );
        }
        info!(
            queue = %self.consumer.queue().address(),
            from = active,
            to = concurrency,
            "Poller concurrency changed"
        );
        Ok(())
    }

    /// Cancel every poller; does not wait for them to finish
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }
        state.running = false;
        let cancelled = self.registry.cancel_all();
        info!(
            queue = %self.consumer.queue().address(),
            pollers = cancelled,
            "Pollers stopping"
        );
    }

    /// Wait for every poller task to exit; aborts the rest after `timeout`
    ///
    /// Returns false when the timeout elapsed.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut self.state.lock().handles);
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        if e.is_panic() {
                            warn!(
                                queue = %self.consumer.queue().address(),
                                "Poller task panicked"
                            );
                        }
                    }
                }
                true
            }
            Err(_) => {
                warn!(
                    queue = %self.consumer.queue().address(),
                    pollers = aborts.len(),
                    "Pollers did not finish in time; aborting"
                );
                for abort in aborts {
                    abort.abort();
                }
                false
            }
        }
    }

    fn spawn_poller(&self, state: &mut SupervisorState) {
        state.handles.retain(|handle| !handle.is_finished());

        let id = format!("{}-{}", POLLER_NAME_PREFIX, self.id_provider.generate_id());
        let (cancel, token) = cancel_channel();
        // Registered before spawn so the loop's first liveness check passes.
        self.registry.register(id.clone(), cancel);

        let consumer = Arc::clone(&self.consumer);
        let registry = Arc::clone(&self.registry);
        debug!(queue = %consumer.queue().address(), poller_id = %id, "Spawning poller");
        let handle = self
            .runtime
            .spawn(async move { consumer.run(id, registry, token).await });
        state.handles.push(handle);
    }
}
