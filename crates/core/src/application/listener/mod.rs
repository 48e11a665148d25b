// Message Listener - lifecycle controller for one queue

mod builder;

pub use builder::MessageListenerBuilder;

use crate::application::consumer::BatchConsumer;
use crate::application::poller::PollerSupervisor;
use crate::application::worker::constants::{DEFAULT_SHUTDOWN_TIMEOUT, RECEIVE_ERROR_PAUSE};
use crate::application::worker::{WorkerPool, WorkerPoolConfig};
use crate::application::Queue;
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueTransport, TaskExecutor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Stopped,
}

struct Lifecycle {
    phase: Phase,
    concurrency: usize,
    pollers: Option<Arc<PollerSupervisor>>,
    /// Present only when the pool is owned by this listener
    pool: Option<Arc<WorkerPool>>,
}

/// Queue listener
///
/// `subscribe` starts polling, `destroy` stops it. Both are idempotent and
/// may be called from any thread. A destroyed listener cannot be started
/// again.
pub struct MessageListener {
    queue: Arc<Queue>,
    transport: Arc<dyn QueueTransport>,
    executor: Option<Arc<dyn TaskExecutor>>,
    id_provider: Arc<dyn IdProvider>,
    pool_config: WorkerPoolConfig,
    receive_error_pause: Duration,
    lifecycle: Mutex<Lifecycle>,
}

impl MessageListener {
    pub fn builder(address: impl Into<String>) -> MessageListenerBuilder {
        MessageListenerBuilder::new(address)
    }

    pub(crate) fn new(
        queue: Arc<Queue>,
        transport: Arc<dyn QueueTransport>,
        executor: Option<Arc<dyn TaskExecutor>>,
        id_provider: Arc<dyn IdProvider>,
        pool_config: WorkerPoolConfig,
    ) -> Self {
        let concurrency = queue.concurrency();
        Self {
            queue,
            transport,
            executor,
            id_provider,
            pool_config,
            receive_error_pause: RECEIVE_ERROR_PAUSE,
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Created,
                concurrency,
                pollers: None,
                pool: None,
            }),
        }
    }

    pub(crate) fn set_receive_error_pause(&mut self, pause: Duration) {
        self.receive_error_pause = pause;
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Start polling
    ///
    /// Creates the worker pool (unless an executor was supplied) and the
    /// pollers. Calling it on a running listener does nothing.
    ///
    /// # Errors
    /// - AppError::Terminated after `destroy`
    /// - AppError::NoRuntime outside a Tokio runtime
    pub fn subscribe(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.phase {
            Phase::Running => return Ok(()),
            Phase::Stopped => {
                return Err(AppError::Terminated(self.queue.address().to_string()))
            }
            Phase::Created => {}
        }

        let runtime = Handle::try_current().map_err(|_| AppError::NoRuntime)?;

        let (executor, pool): (Arc<dyn TaskExecutor>, Option<Arc<WorkerPool>>) =
            match &self.executor {
                Some(external) => (Arc::clone(external), None),
                None => {
                    let config = WorkerPoolConfig {
                        max_workers: WorkerPoolConfig::for_queue(
                            lifecycle.concurrency,
                            self.queue.batch_size(),
                        )
                        .max_workers,
                        ..self.pool_config.clone()
                    };
                    let pool = Arc::new(WorkerPool::with_runtime(config, runtime.clone()));
                    (pool.clone() as Arc<dyn TaskExecutor>, Some(pool))
                }
            };

        let consumer = Arc::new(
            BatchConsumer::new(Arc::clone(&self.queue), Arc::clone(&self.transport), executor)
                .with_receive_error_pause(self.receive_error_pause),
        );
        let pollers = Arc::new(PollerSupervisor::new(
            consumer,
            Arc::clone(&self.id_provider),
            runtime,
            lifecycle.concurrency,
        ));
        pollers.start();

        lifecycle.pollers = Some(pollers);
        lifecycle.pool = pool;
        lifecycle.phase = Phase::Running;
        info!(
            queue = %self.queue.address(),
            concurrency = lifecycle.concurrency,
            batch_size = self.queue.batch_size(),
            external_executor = self.executor.is_some(),
            "Listener subscribed"
        );
        Ok(())
    }

    /// Stop polling
    ///
    /// Cancels every poller and closes the owned worker pool. Does not wait;
    /// see [`MessageListener::await_termination`].
    pub fn destroy(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let was_running = lifecycle.phase == Phase::Running;
        lifecycle.phase = Phase::Stopped;
        if !was_running {
            return;
        }

        if let Some(pollers) = &lifecycle.pollers {
            pollers.stop();
        }
        if let Some(pool) = &lifecycle.pool {
            pool.close();
        }
        info!(queue = %self.queue.address(), "Listener destroyed");
    }

    /// Wait for pollers, then the owned pool, to drain
    ///
    /// Pollers still running after `timeout` are aborted. Returns false when
    /// either drain did not finish in time.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let (pollers, pool) = {
            let lifecycle = self.lifecycle.lock();
            (lifecycle.pollers.clone(), lifecycle.pool.clone())
        };
        let deadline = Instant::now() + timeout;

        let pollers_done = match pollers {
            Some(pollers) => pollers.await_termination(timeout).await,
            None => true,
        };
        let pool_done = match pool {
            Some(pool) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                pool.await_termination(remaining).await
            }
            None => true,
        };

        let graceful = pollers_done && pool_done;
        if graceful {
            debug!(queue = %self.queue.address(), "Listener terminated");
        } else {
            warn!(
                queue = %self.queue.address(),
                pollers_done,
                pool_done,
                "Listener did not terminate gracefully"
            );
        }
        graceful
    }

    /// `destroy` followed by `await_termination`
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.destroy();
        self.await_termination(timeout).await
    }

    /// `shutdown` with the default 20s bound
    pub async fn shutdown_default(&self) -> bool {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().phase == Phase::Running
    }

    /// Change the number of pollers
    ///
    /// Before `subscribe` this only changes how many pollers will start.
    /// The worker pool keeps the size it was created with.
    pub fn set_concurrency(&self, concurrency: usize) -> Result<()> {
        if concurrency == 0 {
            return Err(AppError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.concurrency = concurrency;
        match (&lifecycle.pollers, lifecycle.phase) {
            (Some(pollers), Phase::Running) => pollers.set_concurrency(concurrency),
            _ => Ok(()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.lifecycle.lock().concurrency
    }

    /// Number of pollers currently registered as active
    pub fn active_pollers(&self) -> usize {
        self.lifecycle
            .lock()
            .pollers
            .as_ref()
            .map_or(0, |pollers| pollers.active_count())
    }

    /// Poller tasks still alive; lags `active_pollers` after a scale-down
    pub fn running_pollers(&self) -> usize {
        self.lifecycle
            .lock()
            .pollers
            .as_ref()
            .map_or(0, |pollers| pollers.running_tasks())
    }

    /// Live workers in the owned pool; zero with an external executor
    pub fn live_workers(&self) -> usize {
        self.lifecycle
            .lock()
            .pool
            .as_ref()
            .map_or(0, |pool| pool.live_workers())
    }
}

impl std::fmt::Debug for MessageListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageListener")
            .field("queue", &self.queue)
            .field("running", &self.is_running())
            .finish()
    }
}
