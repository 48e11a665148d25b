// Port Layer - Interfaces for external dependencies

pub mod handler;
pub mod id_provider; // For deterministic testing
pub mod task_executor;
pub mod transport;

// Re-exports
pub use handler::{
    async_handler_fn, error_handler_fn, handler_fn, interceptor_fn, ErrorHandler, HandlerError,
    HandlerInterceptor, MessageHandler,
};
pub use id_provider::{IdProvider, UuidProvider};
pub use task_executor::{ExecutorError, RuntimeExecutor, TaskExecutor, TaskFuture};
pub use transport::{DeleteFailure, DeleteOutcome, QueueTransport, ReceiveRequest, TransportError};
