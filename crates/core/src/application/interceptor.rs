// Correlation Id Interceptor

use crate::domain::{Message, MessageContext};
use crate::port::{HandlerError, HandlerInterceptor};
use async_trait::async_trait;

pub const CORRELATION_ID_ATTRIBUTE: &str = "correlationId";

/// Copies a correlation id attribute into the task context
///
/// Falls back to the message id when the attribute is absent. The value is
/// also stored under the attribute name so handlers can read it with
/// [`MessageContext::get`].
#[derive(Debug, Clone)]
pub struct CorrelationIdInterceptor {
    attribute: String,
}

impl Default for CorrelationIdInterceptor {
    fn default() -> Self {
        Self::new(CORRELATION_ID_ATTRIBUTE)
    }
}

impl CorrelationIdInterceptor {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

#[async_trait]
impl HandlerInterceptor for CorrelationIdInterceptor {
    async fn before_handle(
        &self,
        message: &Message,
        ctx: &mut MessageContext,
    ) -> Result<(), HandlerError> {
        let correlation_id = message
            .attribute(&self.attribute)
            .unwrap_or(&message.id)
            .to_string();
        ctx.insert(self.attribute.clone(), correlation_id.clone());
        ctx.correlation_id = Some(correlation_id);
        Ok(())
    }
}
