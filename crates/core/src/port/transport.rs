// Queue Transport Port
// Abstraction over the remote queue service (receive + batch delete)

use crate::domain::{DeleteEntry, Message, QueueOptions};
use async_trait::async_trait;
use thiserror::Error;

/// Attribute selector asking the service for every message attribute
pub const ALL_ATTRIBUTES: &str = "All";

/// Receive request shaped from a queue descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub address: String,
    pub max_messages: usize,
    pub wait_seconds: u32,
    pub visibility_seconds: u32,
    pub attribute_names: Vec<String>,
}

impl ReceiveRequest {
    pub fn for_queue(queue: &QueueOptions) -> Self {
        Self {
            address: queue.address.clone(),
            max_messages: queue.batch_size,
            wait_seconds: queue.poll_mode.wait_seconds(),
            visibility_seconds: queue.visibility_timeout_secs,
            attribute_names: vec![ALL_ATTRIBUTES.to_string()],
        }
    }
}

/// Per-entry failure reported by a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}

/// Outcome of a batch delete the service accepted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
}

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The call was interrupted or cancelled before completing
    #[error("Transport call interrupted")]
    Interrupted,

    /// Client or service failure (network, throttling, outage)
    #[error("{operation} failed: {message}")]
    Service { operation: String, message: String },

    #[error("Unexpected transport error: {0}")]
    Unexpected(String),
}

impl TransportError {
    pub fn service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        TransportError::Service {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, TransportError::Interrupted)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Service { .. })
    }
}

/// Queue Transport trait
///
/// Implementations:
/// - SqsTransport (infra-sqs): AWS SQS via aws-sdk-sqs
/// - InMemoryTransport (mocks): scripted queue for tests
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receive up to `request.max_messages` messages
    ///
    /// # Errors
    /// - TransportError::Interrupted if the call was cancelled
    /// - TransportError::Service on client/service failures
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<Message>, TransportError>;

    /// Delete a batch of messages by (id, receipt handle)
    async fn delete_batch(
        &self,
        address: &str,
        entries: &[DeleteEntry],
    ) -> Result<DeleteOutcome, TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Scripted in-memory queue
    ///
    /// Receive order of precedence: scripted failures, then the repeating
    /// batch (if set), then pending messages. An empty receive sleeps for
    /// `empty_receive_delay` to stand in for a long poll.
    pub struct InMemoryTransport {
        pending: Mutex<VecDeque<Message>>,
        repeating: Mutex<Option<Vec<Message>>>,
        failures: Mutex<VecDeque<TransportError>>,
        fail_all_receives: Mutex<Option<TransportError>>,
        delete_error: Mutex<Option<TransportError>>,
        receive_log: Mutex<Vec<(Instant, ReceiveRequest)>>,
        delete_log: Mutex<Vec<(String, Vec<DeleteEntry>)>>,
        receive_delay: Duration,
        empty_receive_delay: Duration,
    }

    impl Default for InMemoryTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryTransport {
        pub fn new() -> Self {
            Self {
                pending: Mutex::new(VecDeque::new()),
                repeating: Mutex::new(None),
                failures: Mutex::new(VecDeque::new()),
                fail_all_receives: Mutex::new(None),
                delete_error: Mutex::new(None),
                receive_log: Mutex::new(Vec::new()),
                delete_log: Mutex::new(Vec::new()),
                receive_delay: Duration::ZERO,
                empty_receive_delay: Duration::from_millis(10),
            }
        }

        /// Delay applied to every successful receive
        pub fn with_receive_delay(mut self, delay: Duration) -> Self {
            self.receive_delay = delay;
            self
        }

        pub fn with_empty_receive_delay(mut self, delay: Duration) -> Self {
            self.empty_receive_delay = delay;
            self
        }

        pub fn push(&self, message: Message) {
            self.pending.lock().push_back(message);
        }

        pub fn push_all(&self, messages: impl IntoIterator<Item = Message>) {
            self.pending.lock().extend(messages);
        }

        /// Return the same batch from every receive
        pub fn repeat_batch(&self, messages: Vec<Message>) {
            *self.repeating.lock() = Some(messages);
        }

        /// Fail the next receive with `error`
        pub fn fail_next_receive(&self, error: TransportError) {
            self.failures.lock().push_back(error);
        }

        /// Fail every receive with `error`
        pub fn fail_all_receives(&self, error: TransportError) {
            *self.fail_all_receives.lock() = Some(error);
        }

        pub fn fail_deletes(&self, error: TransportError) {
            *self.delete_error.lock() = Some(error);
        }

        pub fn pending_count(&self) -> usize {
            self.pending.lock().len()
        }

        pub fn receive_count(&self) -> usize {
            self.receive_log.lock().len()
        }

        pub fn receive_requests(&self) -> Vec<ReceiveRequest> {
            self.receive_log
                .lock()
                .iter()
                .map(|(_, request)| request.clone())
                .collect()
        }

        pub fn receive_instants(&self) -> Vec<Instant> {
            self.receive_log.lock().iter().map(|(at, _)| *at).collect()
        }

        pub fn delete_requests(&self) -> Vec<Vec<DeleteEntry>> {
            self.delete_log
                .lock()
                .iter()
                .map(|(_, entries)| entries.clone())
                .collect()
        }

        pub fn deleted_ids(&self) -> Vec<String> {
            self.delete_log
                .lock()
                .iter()
                .flat_map(|(_, entries)| entries.iter().map(|e| e.id.clone()))
                .collect()
        }

        /// Poll until `predicate` holds or `timeout` elapses
        pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
        where
            F: Fn(&Self) -> bool,
        {
            let deadline = Instant::now() + timeout;
            loop {
                if predicate(self) {
                    return true;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }

    #[async_trait]
    impl QueueTransport for InMemoryTransport {
        async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<Message>, TransportError> {
            self.receive_log
                .lock()
                .push((Instant::now(), request.clone()));

            if let Some(error) = self.failures.lock().pop_front() {
                return Err(error);
            }
            if let Some(error) = self.fail_all_receives.lock().clone() {
                return Err(error);
            }

            let repeating = self.repeating.lock().clone();
            let batch: Vec<Message> = match repeating {
                Some(batch) => batch,
                None => {
                    let mut pending = self.pending.lock();
                    let take = request.max_messages.min(pending.len());
                    pending.drain(..take).collect()
                }
            };

            if batch.is_empty() {
                tokio::time::sleep(self.empty_receive_delay).await;
            } else if !self.receive_delay.is_zero() {
                tokio::time::sleep(self.receive_delay).await;
            }
            Ok(batch)
        }

        async fn delete_batch(
            &self,
            address: &str,
            entries: &[DeleteEntry],
        ) -> Result<DeleteOutcome, TransportError> {
            self.delete_log
                .lock()
                .push((address.to_string(), entries.to_vec()));

            if let Some(error) = self.delete_error.lock().clone() {
                return Err(error);
            }
            Ok(DeleteOutcome {
                deleted: entries.iter().map(|e| e.id.clone()).collect(),
                failed: Vec::new(),
            })
        }
    }
}
