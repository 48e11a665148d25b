// Listener configuration properties

use crate::application::worker::constants::{
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WORKER_KEEP_ALIVE, WORKER_NAME_PREFIX,
};
use crate::application::worker::WorkerPoolConfig;
use crate::domain::queue::{
    QueueOptions, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, DEFAULT_VISIBILITY_TIMEOUT_SECS,
};
use crate::domain::{AckMode, PollMode};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerProperties {
    /// When false no listener is started
    pub enabled: bool,
    /// Size of the worker pool shared by every configured listener
    pub pool_size: usize,
    pub pool_keep_alive_secs: u64,
    pub pool_thread_prefix: String,
    pub shutdown_timeout_secs: u64,
    pub queues: Vec<QueueProperties>,
}

impl Default for ListenerProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            pool_size: 10,
            pool_keep_alive_secs: DEFAULT_WORKER_KEEP_ALIVE.as_secs(),
            pool_thread_prefix: WORKER_NAME_PREFIX.to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
            queues: Vec::new(),
        }
    }
}

impl ListenerProperties {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.pool_keep_alive_secs)
    }

    /// Shared worker pool settings built from `pool_*`
    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            max_workers: self.pool_size,
            ..Default::default()
        }
        .with_keep_alive(self.keep_alive())
        .with_name_prefix(self.pool_thread_prefix.clone())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validate every queue entry
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(AppError::Config("pool_size must be at least 1".to_string()));
        }
        if self.pool_thread_prefix.trim().is_empty() {
            return Err(AppError::Config(
                "pool_thread_prefix must not be empty".to_string(),
            ));
        }
        for queue in &self.queues {
            queue.to_options().validate().map_err(|e| {
                AppError::Config(format!("queue '{}': {}", queue.address, e))
            })?;
        }
        Ok(())
    }
}

/// Settings for one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueProperties {
    pub address: String,
    pub batch_size: usize,
    pub visibility_timeout_secs: u32,
    pub long_polling: bool,
    pub auto_acknowledge: bool,
    pub concurrency: usize,
}

impl Default for QueueProperties {
    fn default() -> Self {
        Self {
            address: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            long_polling: true,
            auto_acknowledge: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl QueueProperties {
    pub fn to_options(&self) -> QueueOptions {
        QueueOptions {
            address: self.address.clone(),
            batch_size: self.batch_size,
            visibility_timeout_secs: self.visibility_timeout_secs,
            poll_mode: PollMode::from_long_polling(self.long_polling),
            ack_mode: AckMode::from_auto_acknowledge(self.auto_acknowledge),
            concurrency: self.concurrency,
        }
    }
}
