// Queue Descriptor - options plus the handlers bound to them

use crate::domain::error::Result;
use crate::domain::{AckMode, PollMode, QueueOptions};
use crate::port::{ErrorHandler, HandlerInterceptor, MessageHandler};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Queue descriptor
///
/// Immutable once built; shared read-only by every poller and message task.
/// Two descriptors are equal when their addresses are equal.
#[derive(Clone)]
pub struct Queue {
    options: QueueOptions,
    handler: Arc<dyn MessageHandler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
}

impl Queue {
    pub fn new(
        options: QueueOptions,
        handler: Arc<dyn MessageHandler>,
        error_handler: Option<Arc<dyn ErrorHandler>>,
        interceptors: Vec<Arc<dyn HandlerInterceptor>>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            handler,
            error_handler,
            interceptors,
        })
    }

    pub fn address(&self) -> &str {
        &self.options.address
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    pub fn visibility_timeout_secs(&self) -> u32 {
        self.options.visibility_timeout_secs
    }

    pub fn poll_mode(&self) -> PollMode {
        self.options.poll_mode
    }

    pub fn ack_mode(&self) -> AckMode {
        self.options.ack_mode
    }

    pub fn is_auto_acknowledge(&self) -> bool {
        self.options.ack_mode == AckMode::Auto
    }

    pub fn concurrency(&self) -> usize {
        self.options.concurrency
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }

    pub fn error_handler(&self) -> Option<&Arc<dyn ErrorHandler>> {
        self.error_handler.as_ref()
    }

    pub fn interceptors(&self) -> &[Arc<dyn HandlerInterceptor>] {
        &self.interceptors
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("options", &self.options)
            .field("error_handler", &self.error_handler.is_some())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        self.options.address == other.options.address
    }
}

impl Eq for Queue {}

impl Hash for Queue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.options.address.hash(state);
    }
}
