// SQS transport implementation
// reason: aws-sdk-sqs for receive/delete, aws-config for credential and region discovery
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, Message as SqsMessage};
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

use queue_listener_core::domain::{DeleteEntry, Message};
use queue_listener_core::port::{
    DeleteFailure, DeleteOutcome, QueueTransport, ReceiveRequest, TransportError,
};

const DEFAULT_REGION: &str = "us-east-1";

/// AWS SQS transport
///
/// Queue addresses are queue URLs.
#[derive(Clone)]
pub struct SqsTransport {
    client: Client,
}

impl SqsTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain
    ///
    /// Region order: `region`, then the environment/profile, then us-east-1.
    pub async fn from_env(region: Option<String>) -> Self {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);

        let shared_config = aws_config::defaults(BehaviorVersion::v2025_08_07())
            .region(region_provider)
            .load()
            .await;

        Self::new(Client::new(&shared_config))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<Message>, TransportError> {
        let mut call = self
            .client
            .receive_message()
            .queue_url(&request.address)
            .max_number_of_messages(to_i32(request.max_messages))
            .wait_time_seconds(to_i32(request.wait_seconds))
            .visibility_timeout(to_i32(request.visibility_seconds));
        for name in &request.attribute_names {
            call = call.message_attribute_names(name);
        }

        let output = call
            .send()
            .await
            .map_err(|e| map_sdk_error("ReceiveMessage", e))?;

        let messages: Vec<Message> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(to_message)
            .collect();
        debug!(queue = %request.address, count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete_batch(
        &self,
        address: &str,
        entries: &[DeleteEntry],
    ) -> Result<DeleteOutcome, TransportError> {
        let request_entries = entries
            .iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&entry.id)
                    .receipt_handle(&entry.receipt_handle)
                    .build()
                    .map_err(|e| TransportError::Unexpected(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(address)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteMessageBatch", e))?;

        Ok(DeleteOutcome {
            deleted: output
                .successful()
                .iter()
                .map(|entry| entry.id().to_string())
                .collect(),
            failed: output
                .failed()
                .iter()
                .map(|entry| DeleteFailure {
                    id: entry.id().to_string(),
                    code: entry.code().to_string(),
                    message: entry.message().map(str::to_string),
                    sender_fault: entry.sender_fault(),
                })
                .collect(),
        })
    }
}

fn to_i32<T: TryInto<i32>>(value: T) -> i32 {
    value.try_into().unwrap_or(i32::MAX)
}

/// Convert an SQS message; messages without id or receipt handle are dropped
fn to_message(message: SqsMessage) -> Option<Message> {
    let (Some(id), Some(receipt_handle)) = (message.message_id, message.receipt_handle) else {
        warn!("Dropping SQS message without id or receipt handle");
        return None;
    };

    let attributes: HashMap<String, String> = message
        .message_attributes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.string_value.map(|v| (name, v)))
        .collect();

    Some(Message {
        id,
        receipt_handle,
        body: message.body.unwrap_or_default(),
        attributes,
    })
}

/// Requests that never left the client are unexpected; everything else
/// (dispatch, timeout, HTTP or service errors) is a transient service failure.
fn map_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> TransportError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ConstructionFailure(_) => TransportError::Unexpected(format!(
            "{operation} request could not be built: {message}"
        )),
        _ => TransportError::service(operation, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
    use aws_sdk_sqs::types::MessageAttributeValue;

    fn string_attribute(value: &str) -> MessageAttributeValue {
        MessageAttributeValue::builder()
            .data_type("String")
            .string_value(value)
            .build()
            .unwrap()
    }

    #[test]
    fn test_to_message_copies_string_attributes() {
        let sqs = SqsMessage::builder()
            .message_id("testId")
            .receipt_handle("rh-1")
            .body("{\"a\":1}")
            .message_attributes("messageType", string_attribute("order"))
            .message_attributes(
                "blob",
                MessageAttributeValue::builder()
                    .data_type("Binary")
                    .build()
                    .unwrap(),
            )
            .build();

        let message = to_message(sqs).unwrap();
        assert_eq!(message.id, "testId");
        assert_eq!(message.receipt_handle, "rh-1");
        assert_eq!(message.body, "{\"a\":1}");
        assert_eq!(message.attribute("messageType"), Some("order"));
        assert_eq!(message.attribute("blob"), None);
    }

    #[test]
    fn test_to_message_requires_id_and_receipt_handle() {
        let no_handle = SqsMessage::builder().message_id("testId").build();
        assert!(to_message(no_handle).is_none());

        let no_id = SqsMessage::builder().receipt_handle("rh").build();
        assert!(to_message(no_id).is_none());
    }

    #[test]
    fn test_to_message_defaults_body() {
        let sqs = SqsMessage::builder()
            .message_id("testId")
            .receipt_handle("rh")
            .build();
        assert_eq!(to_message(sqs).unwrap().body, "");
    }

    #[test]
    fn test_sdk_error_mapping() {
        let construction: SdkError<ReceiveMessageError, ()> =
            SdkError::construction_failure("missing queue url");
        let mapped = map_sdk_error("ReceiveMessage", construction);
        assert!(matches!(mapped, TransportError::Unexpected(_)));
        assert!(!mapped.is_transient());

        let timeout: SdkError<ReceiveMessageError, ()> = SdkError::timeout_error("timed out");
        let mapped = map_sdk_error("ReceiveMessage", timeout);
        assert!(mapped.is_transient());
        assert!(mapped.to_string().starts_with("ReceiveMessage failed"));
    }

    #[test]
    fn test_to_i32_saturates() {
        assert_eq!(to_i32(10usize), 10);
        assert_eq!(to_i32(u32::MAX), i32::MAX);
    }
}
