// Central Error Type for the Listener

use thiserror::Error;

/// Listener-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The listener was destroyed and cannot be subscribed again
    #[error("Listener terminated: {0}")]
    Terminated(String),

    #[error("No Tokio runtime available")]
    NoRuntime,

    #[error("Executor error: {0}")]
    Executor(#[from] crate::port::ExecutorError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::port::ExecutorError;

    #[test]
    fn test_conversions_keep_source_message() {
        let err: AppError = DomainError::InvalidBatchSize(11).into();
        assert!(err.to_string().contains("Invalid batch size: 11"));

        let err: AppError = ExecutorError::Shutdown.into();
        assert!(matches!(err, AppError::Executor(ExecutorError::Shutdown)));
    }
}
