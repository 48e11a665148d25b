// Message Domain Model

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Message ID assigned by the queue service
pub type MessageId = String;

/// Opaque token required to delete a received message
pub type ReceiptHandle = String;

/// A message received from a queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    /// Message attributes (string values only), used for routing
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Entry identifying this message in a batch delete request
    pub fn delete_entry(&self) -> DeleteEntry {
        DeleteEntry {
            id: self.id.clone(),
            receipt_handle: self.receipt_handle.clone(),
        }
    }
}

/// (id, receipt handle) pair of a batch delete request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteEntry {
    pub id: MessageId,
    pub receipt_handle: ReceiptHandle,
}

/// Per-task diagnostic context
///
/// Created fresh for every message task and dropped when the task ends, so
/// nothing set by an interceptor can leak into the next message handled on
/// the same worker.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub queue: String,
    pub correlation_id: Option<String>,
    pub started_at: DateTime<Utc>,
    values: HashMap<String, String>,
}

impl MessageContext {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            correlation_id: None,
            started_at: Utc::now(),
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
