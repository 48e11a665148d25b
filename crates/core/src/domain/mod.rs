// Domain Layer - Queue descriptor and message model

pub mod error;
pub mod message;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use message::{DeleteEntry, Message, MessageContext, MessageId, ReceiptHandle};
pub use queue::{AckMode, PollMode, QueueAddress, QueueOptions};
