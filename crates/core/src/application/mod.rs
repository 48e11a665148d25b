// Application Layer - Listener lifecycle and consumption loop

pub mod consumer;
pub mod interceptor;
pub mod listener;
pub mod poller;
pub mod queue;
pub mod registry;
pub mod routing;
pub mod task;
pub mod worker;

// Re-exports
pub use consumer::{BatchConsumer, BatchOutcome};
pub use interceptor::CorrelationIdInterceptor;
pub use listener::{MessageListener, MessageListenerBuilder};
pub use poller::{cancel_channel, CancelSender, CancelToken, PollerId, PollerRegistry, PollerSupervisor};
pub use queue::Queue;
pub use registry::ListenerRegistry;
pub use routing::AttributeRoutingHandler;
pub use task::{CompletionLatch, MessageTask};
pub use worker::{WorkerPool, WorkerPoolConfig};
