// Worker Pool - bounded execution context for message tasks

pub mod constants;
mod panic_guard;

use constants::*;
pub use panic_guard::{execute_guarded_async, PanicGuardResult};

use crate::error::{AppError, Result};
use crate::port::{ExecutorError, TaskExecutor, TaskFuture};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Maximum number of concurrent workers
    pub max_workers: usize,
    /// Workers that never retire for idleness
    pub core_workers: usize,
    /// Idle period after which a worker above `core_workers` retires
    pub keep_alive: Duration,
    /// Prefix used in worker names (logging only)
    pub name_prefix: String,
}

impl WorkerPoolConfig {
    /// Pool sized `concurrency x batch_size + 1`
    pub fn for_queue(concurrency: usize, batch_size: usize) -> Self {
        Self {
            max_workers: concurrency * batch_size + WORKER_HEADROOM,
            ..Default::default()
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_core_workers(mut self, core_workers: usize) -> Self {
        self.core_workers = core_workers;
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: WORKER_HEADROOM,
            core_workers: DEFAULT_CORE_WORKERS,
            keep_alive: DEFAULT_WORKER_KEEP_ALIVE,
            name_prefix: WORKER_NAME_PREFIX.to_string(),
        }
    }
}

#[derive(Default)]
struct PoolState {
    live: usize,
    spawned: usize,
}

struct PoolInner {
    config: WorkerPoolConfig,
    sender: Mutex<Option<mpsc::UnboundedSender<TaskFuture>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<TaskFuture>>,
    state: Mutex<PoolState>,
    tracker: TaskTracker,
    runtime: Handle,
}

/// Worker pool
///
/// Tasks go into an unbounded queue (submission never blocks). Workers are
/// spawned on demand up to `max_workers` and retire after `keep_alive` of
/// idleness while more than `core_workers` are alive.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool on the current Tokio runtime
    pub fn new(config: WorkerPoolConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| AppError::NoRuntime)?;
        Ok(Self::with_runtime(config, runtime))
    }

    pub fn with_runtime(config: WorkerPoolConfig, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            pool = %config.name_prefix,
            max_workers = config.max_workers,
            keep_alive_secs = config.keep_alive.as_secs(),
            "Worker pool created"
        );
        Self {
            inner: Arc::new(PoolInner {
                config,
                sender: Mutex::new(Some(tx)),
                receiver: tokio::sync::Mutex::new(rx),
                state: Mutex::new(PoolState::default()),
                tracker: TaskTracker::new(),
                runtime,
            }),
        }
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.inner.config
    }

    /// Number of workers currently alive
    pub fn live_workers(&self) -> usize {
        self.inner.state.lock().live
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    /// Stop accepting tasks; queued tasks are still drained by the workers
    pub fn close(&self) {
        if self.inner.sender.lock().take().is_some() {
            self.inner.tracker.close();
            debug!(pool = %self.inner.config.name_prefix, "Worker pool closed");
        }
    }

    /// Wait until every worker has exited; false if `timeout` elapsed first
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok()
    }

    /// Close and drain with a bounded wait
    ///
    /// Returns false when tasks were still running after `timeout`. Running
    /// tasks are not cancelled.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.close();
        let graceful = self.await_termination(timeout).await;
        if !graceful {
            warn!(
                pool = %self.inner.config.name_prefix,
                live_workers = self.live_workers(),
                "Worker pool did not terminate gracefully"
            );
        }
        graceful
    }

    fn spawn_worker_if_needed(&self) {
        let mut state = self.inner.state.lock();
        if state.live >= self.inner.config.max_workers {
            return;
        }
        state.live += 1;
        state.spawned += 1;
        let name = format!("{}-{}", self.inner.config.name_prefix, state.spawned);
        let inner = Arc::clone(&self.inner);
        self.inner
            .tracker
            .spawn_on(worker_loop(inner, name), &self.inner.runtime);
    }
}

impl TaskExecutor for WorkerPool {
    fn submit(&self, task: TaskFuture) -> std::result::Result<(), ExecutorError> {
        {
            let sender = self.inner.sender.lock();
            let tx = sender.as_ref().ok_or(ExecutorError::Shutdown)?;
            tx.send(task).map_err(|_| ExecutorError::Shutdown)?;
        }
        self.spawn_worker_if_needed();
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

async fn worker_loop(inner: Arc<PoolInner>, name: String) {
    debug!(worker = %name, "Worker started");
    loop {
        // Each idle worker runs its own keep-alive timer, including while it
        // queues for the receiver.
        let received = tokio::time::timeout(inner.config.keep_alive, async {
            inner.receiver.lock().await.recv().await
        })
        .await;

        let task = match received {
            Ok(Some(task)) => task,
            Ok(None) => {
                inner.state.lock().live -= 1;
                break;
            }
            Err(_) => {
                // Decide under the state lock so a concurrent submit either
                // sees this worker gone or its task is picked up. When the
                // receiver is held, its holder picks up queued work.
                let mut rx = inner.receiver.try_lock().ok();
                let mut state = inner.state.lock();
                match rx.as_mut().map(|rx| rx.try_recv()) {
                    Some(Ok(task)) => task,
                    _ if state.live > inner.config.core_workers => {
                        state.live -= 1;
                        debug!(worker = %name, "Worker retired after idle timeout");
                        return;
                    }
                    _ => continue,
                }
            }
        };

        if let PanicGuardResult::Panicked(msg) = execute_guarded_async(task).await {
            warn!(worker = %name, panic_msg = %msg, "Task panicked; worker continues");
        }
    }
    debug!(worker = %name, "Worker stopped");
}
