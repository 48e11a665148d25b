// Task Executor Port
// Execution context that runs message tasks

use futures::future::BoxFuture;
use thiserror::Error;

/// Unit of work submitted to an executor
pub type TaskFuture = BoxFuture<'static, ()>;

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Executor is shut down")]
    Shutdown,

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),
}

/// Task Executor trait
///
/// Implementations:
/// - WorkerPool: bounded pool owned by a listener
/// - RuntimeExecutor: spawns on a caller-owned Tokio runtime
///
/// Submission never blocks. A task handed to `submit` is either run or
/// dropped; dropping it must be harmless for the caller.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: TaskFuture) -> Result<(), ExecutorError>;
}

/// Executor backed by an externally owned Tokio runtime
///
/// The listener never shuts this executor down; the runtime's owner does.
#[derive(Clone)]
pub struct RuntimeExecutor {
    handle: tokio::runtime::Handle,
}

impl RuntimeExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor on the runtime of the calling context
    pub fn current() -> Result<Self, ExecutorError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| ExecutorError::SpawnFailed(e.to_string()))
    }
}

impl TaskExecutor for RuntimeExecutor {
    fn submit(&self, task: TaskFuture) -> Result<(), ExecutorError> {
        self.handle.spawn(task);
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Spawns on the current runtime and counts submissions
    #[derive(Default)]
    pub struct CountingExecutor {
        submitted: AtomicUsize,
        rejecting: AtomicBool,
    }

    impl CountingExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject (and drop) every task from now on
        pub fn reject_all(&self) {
            self.rejecting.store(true, Ordering::SeqCst);
        }

        pub fn submitted(&self) -> usize {
            self.submitted.load(Ordering::SeqCst)
        }
    }

    impl TaskExecutor for CountingExecutor {
        fn submit(&self, task: TaskFuture) -> Result<(), ExecutorError> {
            if self.rejecting.load(Ordering::SeqCst) {
                return Err(ExecutorError::Shutdown);
            }
            self.submitted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(task);
            Ok(())
        }
    }
}
