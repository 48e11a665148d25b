// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue identifier (URL for SQS)
pub type QueueAddress = String;

/// Largest batch the transport accepts in one receive
pub const MAX_BATCH_SIZE: usize = 10;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u32 = 60;
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Receive wait-time strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollMode {
    #[default]
    Long,
    Short,
}

impl PollMode {
    pub fn from_long_polling(long_polling: bool) -> Self {
        if long_polling {
            PollMode::Long
        } else {
            PollMode::Short
        }
    }

    /// Receive wait time in seconds
    pub fn wait_seconds(&self) -> u32 {
        match self {
            PollMode::Long => 20,
            PollMode::Short => 1,
        }
    }
}

/// Acknowledgement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckMode {
    /// Successfully handled messages are deleted in one batch request
    #[default]
    Auto,
    /// Deletion is left to the handler
    Manual,
}

impl AckMode {
    pub fn from_auto_acknowledge(auto: bool) -> Self {
        if auto {
            AckMode::Auto
        } else {
            AckMode::Manual
        }
    }
}

/// Plain queue settings, checked by [`QueueOptions::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOptions {
    pub address: QueueAddress,
    pub batch_size: usize,
    pub visibility_timeout_secs: u32,
    pub poll_mode: PollMode,
    pub ack_mode: AckMode,
    pub concurrency: usize,
}

impl QueueOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(DomainError::EmptyAddress);
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(DomainError::InvalidBatchSize(self.batch_size));
        }
        if self.concurrency == 0 {
            return Err(DomainError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            address: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            poll_mode: PollMode::Long,
            ack_mode: AckMode::Auto,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
