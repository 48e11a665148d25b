// Message Listener Builder

use super::MessageListener;
use crate::application::worker::WorkerPoolConfig;
use crate::application::Queue;
use crate::domain::{AckMode, DomainError, PollMode, QueueOptions};
use crate::error::{AppError, Result};
use crate::port::{
    ErrorHandler, HandlerInterceptor, IdProvider, MessageHandler, QueueTransport, TaskExecutor,
    UuidProvider,
};
use std::sync::Arc;
use std::time::Duration;

/// Builds a [`MessageListener`] and its immutable [`Queue`] descriptor
///
/// Defaults: batch 10, visibility 60s, long polling, automatic
/// acknowledgement, one poller, owned worker pool.
pub struct MessageListenerBuilder {
    options: QueueOptions,
    handler: Option<Arc<dyn MessageHandler>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
    transport: Option<Arc<dyn QueueTransport>>,
    executor: Option<Arc<dyn TaskExecutor>>,
    id_provider: Arc<dyn IdProvider>,
    pool_config: WorkerPoolConfig,
    receive_error_pause: Option<Duration>,
}

impl MessageListenerBuilder {
    pub fn new(address: impl Into<String>) -> Self {
        Self::from_options(QueueOptions::new(address))
    }

    pub fn from_options(options: QueueOptions) -> Self {
        Self {
            options,
            handler: None,
            error_handler: None,
            interceptors: Vec::new(),
            transport: None,
            executor: None,
            id_provider: Arc::new(UuidProvider),
            pool_config: WorkerPoolConfig::default(),
            receive_error_pause: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    pub fn visibility_timeout_secs(mut self, secs: u32) -> Self {
        self.options.visibility_timeout_secs = secs;
        self
    }

    pub fn poll_mode(mut self, mode: PollMode) -> Self {
        self.options.poll_mode = mode;
        self
    }

    pub fn long_polling(self, enabled: bool) -> Self {
        self.poll_mode(PollMode::from_long_polling(enabled))
    }

    pub fn ack_mode(mut self, mode: AckMode) -> Self {
        self.options.ack_mode = mode;
        self
    }

    pub fn auto_acknowledge(self, enabled: bool) -> Self {
        self.ack_mode(AckMode::from_auto_acknowledge(enabled))
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrency = concurrency;
        self
    }

    pub fn handler(self, handler: impl MessageHandler + 'static) -> Self {
        self.shared_handler(Arc::new(handler))
    }

    pub fn shared_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn error_handler(mut self, error_handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(error_handler));
        self
    }

    /// Append an interceptor; interceptors run in insertion order
    pub fn interceptor(mut self, interceptor: impl HandlerInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn transport(mut self, transport: Arc<dyn QueueTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run message tasks on a caller-owned executor instead of an owned pool
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn worker_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.pool_config.keep_alive = keep_alive;
        self
    }

    pub fn core_workers(mut self, core_workers: usize) -> Self {
        self.pool_config.core_workers = core_workers;
        self
    }

    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.pool_config.name_prefix = prefix.into();
        self
    }

    /// Pause after a transient receive failure (default 5s)
    pub fn receive_error_pause(mut self, pause: Duration) -> Self {
        self.receive_error_pause = Some(pause);
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// - AppError::Domain for invalid queue settings or a missing handler
    /// - AppError::Config when no transport was supplied
    pub fn build(self) -> Result<MessageListener> {
        let handler = self.handler.ok_or(DomainError::MissingHandler)?;
        let transport = self
            .transport
            .ok_or_else(|| AppError::Config("a queue transport is required".to_string()))?;
        let queue = Queue::new(self.options, handler, self.error_handler, self.interceptors)?;

        let mut listener = MessageListener::new(
            Arc::new(queue),
            transport,
            self.executor,
            self.id_provider,
            self.pool_config,
        );
        if let Some(pause) = self.receive_error_pause {
            listener.set_receive_error_pause(pause);
        }
        Ok(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::transport::mocks::InMemoryTransport;
    use crate::port::{error_handler_fn, handler_fn, interceptor_fn};

    #[test]
    fn test_builder_defaults() {
        let listener = MessageListenerBuilder::new("testQueue")
            .transport(Arc::new(InMemoryTransport::new()))
            .handler(handler_fn(|_, _| Ok(())))
            .build()
            .unwrap();

        let queue = listener.queue();
        assert_eq!(queue.address(), "testQueue");
        assert_eq!(queue.batch_size(), 10);
        assert_eq!(queue.visibility_timeout_secs(), 60);
        assert_eq!(queue.poll_mode(), PollMode::Long);
        assert_eq!(queue.ack_mode(), AckMode::Auto);
        assert_eq!(queue.concurrency(), 1);
        assert!(queue.error_handler().is_none());
        assert!(queue.interceptors().is_empty());
    }

    #[test]
    fn test_builder_applies_settings() {
        let listener = MessageListenerBuilder::new("testQueue")
            .batch_size(5)
            .visibility_timeout_secs(30)
            .long_polling(false)
            .auto_acknowledge(false)
            .concurrency(4)
            .transport(Arc::new(InMemoryTransport::new()))
            .handler(handler_fn(|_, _| Ok(())))
            .error_handler(error_handler_fn(|_, _| {}))
            .interceptor(interceptor_fn(|_, _| Ok(())))
            .interceptor(interceptor_fn(|_, _| Ok(())))
            .build()
            .unwrap();

        let queue = listener.queue();
        assert_eq!(queue.batch_size(), 5);
        assert_eq!(queue.visibility_timeout_secs(), 30);
        assert_eq!(queue.poll_mode(), PollMode::Short);
        assert_eq!(queue.ack_mode(), AckMode::Manual);
        assert_eq!(listener.concurrency(), 4);
        assert!(queue.error_handler().is_some());
        assert_eq!(queue.interceptors().len(), 2);
    }

    #[test]
    fn test_builder_requires_handler_and_transport() {
        let missing_handler = MessageListenerBuilder::new("testQueue")
            .transport(Arc::new(InMemoryTransport::new()))
            .build();
        assert!(matches!(
            missing_handler,
            Err(AppError::Domain(DomainError::MissingHandler))
        ));

        let missing_transport = MessageListenerBuilder::new("testQueue")
            .handler(handler_fn(|_, _| Ok(())))
            .build();
        assert!(matches!(missing_transport, Err(AppError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_batch_size() {
        let result = MessageListenerBuilder::new("testQueue")
            .batch_size(11)
            .transport(Arc::new(InMemoryTransport::new()))
            .handler(handler_fn(|_, _| Ok(())))
            .build();
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InvalidBatchSize(11)))
        ));
    }
}
