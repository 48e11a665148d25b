// Attribute Routing Handler - dispatch by message type attribute

use crate::domain::{Message, MessageContext};
use crate::port::{HandlerError, MessageHandler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Attribute consulted when none is configured
pub const MESSAGE_TYPE_ATTRIBUTE: &str = "messageType";

/// Routes each message to the handler registered for its type attribute
///
/// Messages without a mapping go to the default handler when one is set and
/// fail otherwise.
pub struct AttributeRoutingHandler {
    attribute: String,
    routes: HashMap<String, Arc<dyn MessageHandler>>,
    default_handler: Option<Arc<dyn MessageHandler>>,
}

impl Default for AttributeRoutingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeRoutingHandler {
    pub fn new() -> Self {
        Self::with_attribute(MESSAGE_TYPE_ATTRIBUTE)
    }

    pub fn with_attribute(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            routes: HashMap::new(),
            default_handler: None,
        }
    }

    /// Register `handler` for messages whose attribute equals `message_type`
    pub fn route(mut self, message_type: impl Into<String>, handler: impl MessageHandler + 'static) -> Self {
        self.routes.insert(message_type.into(), Arc::new(handler));
        self
    }

    pub fn default_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    fn resolve(&self, message: &Message) -> Result<&Arc<dyn MessageHandler>, HandlerError> {
        let message_type = message.attribute(&self.attribute);
        message_type
            .and_then(|t| self.routes.get(t))
            .or(self.default_handler.as_ref())
            .ok_or_else(|| {
                HandlerError::Failed(match message_type {
                    Some(t) => format!(
                        "No handler registered for {} '{}' (message {})",
                        self.attribute, t, message.id
                    ),
                    None => format!(
                        "Message {} has no '{}' attribute and no default handler is set",
                        message.id, self.attribute
                    ),
                })
            })
    }
}

#[async_trait]
impl MessageHandler for AttributeRoutingHandler {
    async fn handle(&self, message: &Message, ctx: &mut MessageContext) -> Result<(), HandlerError> {
        let handler = self.resolve(message)?;
        debug!(
            message_id = %message.id,
            message_type = message.attribute(&self.attribute).unwrap_or("<default>"),
            "Routing message"
        );
        handler.handle(message, ctx).await
    }
}
