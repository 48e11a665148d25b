//! Example handlers wired by the daemon

use async_trait::async_trait;
use queue_listener_core::domain::{Message, MessageContext};
use queue_listener_core::port::{ErrorHandler, HandlerError, MessageHandler};
use tracing::{error, info};

/// Logs every message and succeeds
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: &Message, ctx: &mut MessageContext) -> Result<(), HandlerError> {
        info!(
            queue = %ctx.queue,
            message_id = %message.id,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or(""),
            body_len = message.body.len(),
            attributes = message.attributes.len(),
            "Message received"
        );
        Ok(())
    }
}

/// Logs handler failures
pub struct LoggingErrorHandler;

#[async_trait]
impl ErrorHandler for LoggingErrorHandler {
    async fn on_error(&self, message: &Message, error: &HandlerError) {
        error!(message_id = %message.id, error = %error, "Message handling failed");
    }
}
