// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Queue address must not be empty")]
    EmptyAddress,

    #[error("Invalid batch size: {0} (expected 1..={max})", max = crate::domain::queue::MAX_BATCH_SIZE)]
    InvalidBatchSize(usize),

    #[error("Invalid concurrency: {0} (expected >= 1)")]
    InvalidConcurrency(usize),

    #[error("Message handler is required")]
    MissingHandler,
}

pub type Result<T> = std::result::Result<T, DomainError>;
