// Batch Consumer - receive, dispatch, await completion, acknowledge

use crate::application::poller::{CancelToken, PollerId, PollerRegistry};
use crate::application::task::{CompletionLatch, MessageTask, SuccessSet};
use crate::application::worker::constants::RECEIVE_ERROR_PAUSE;
use crate::application::worker::{execute_guarded_async, PanicGuardResult};
use crate::application::Queue;
use crate::domain::{DeleteEntry, Message};
use crate::port::{QueueTransport, ReceiveRequest, TaskExecutor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Summary of one receive/dispatch/acknowledge cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub received: usize,
    pub succeeded: usize,
    pub acknowledged: usize,
}

/// Per-queue batch consumer, shared by every poller of the queue
pub struct BatchConsumer {
    queue: Arc<Queue>,
    transport: Arc<dyn QueueTransport>,
    executor: Arc<dyn TaskExecutor>,
    receive_error_pause: Duration,
}

impl BatchConsumer {
    pub fn new(
        queue: Arc<Queue>,
        transport: Arc<dyn QueueTransport>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            queue,
            transport,
            executor,
            receive_error_pause: RECEIVE_ERROR_PAUSE,
        }
    }

    /// Override the pause applied after a transient receive failure
    pub fn with_receive_error_pause(mut self, pause: Duration) -> Self {
        self.receive_error_pause = pause;
        self
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Poller loop: repeat cycles while `id` is active in `registry`
    ///
    /// A panicking cycle is logged and counted as an empty batch; it never
    /// ends the loop.
    pub async fn run(&self, id: PollerId, registry: Arc<PollerRegistry>, mut cancel: CancelToken) {
        info!(queue = %self.queue.address(), poller_id = %id, "Poller started");
        while registry.is_active(&id) {
            match execute_guarded_async(self.poll_once(&mut cancel)).await {
                PanicGuardResult::Success(outcome) => {
                    if outcome.received > 0 {
                        debug!(
                            queue = %self.queue.address(),
                            poller_id = %id,
                            received = outcome.received,
                            succeeded = outcome.succeeded,
                            acknowledged = outcome.acknowledged,
                            "Batch completed"
                        );
                    }
                }
                PanicGuardResult::Panicked(msg) => {
                    error!(
                        queue = %self.queue.address(),
                        poller_id = %id,
                        panic_msg = %msg,
                        "Poll cycle failed unexpectedly; continuing"
                    );
                }
            }
        }
        info!(queue = %self.queue.address(), poller_id = %id, "Poller stopped");
    }

    /// One full cycle: receive, dispatch, wait, acknowledge
    pub async fn poll_once(&self, cancel: &mut CancelToken) -> BatchOutcome {
        let messages = self.receive(cancel).await;
        let received = messages.len();
        if received == 0 {
            return BatchOutcome::default();
        }

        let latch = Arc::new(CompletionLatch::new(received));
        let successes: SuccessSet = Arc::new(Mutex::new(Vec::with_capacity(received)));

        for message in messages {
            let message_id = message.id.clone();
            let task = MessageTask::new(
                Arc::clone(&self.queue),
                message,
                Arc::clone(&latch),
                Arc::clone(&successes),
            );
            // A rejected task is dropped, which counts the latch down.
            if let Err(e) = self.executor.submit(task.into_future()) {
                error!(
                    queue = %self.queue.address(),
                    message_id = %message_id,
                    error = %e,
                    "Failed to submit message task"
                );
            }
        }

        // No timeout: a stuck handler stalls only this poller.
        latch.wait().await;

        let succeeded: Vec<Message> = std::mem::take(&mut *successes.lock());
        let mut outcome = BatchOutcome {
            received,
            succeeded: succeeded.len(),
            acknowledged: 0,
        };

        if self.queue.is_auto_acknowledge() && !succeeded.is_empty() {
            outcome.acknowledged = self.acknowledge(&succeeded).await;
        }
        outcome
    }

    async fn receive(&self, cancel: &mut CancelToken) -> Vec<Message> {
        let request = ReceiveRequest::for_queue(self.queue.options());
        match self.transport.receive(&request).await {
            Ok(messages) => messages,
            Err(e) if e.is_interrupted() => {
                debug!(queue = %self.queue.address(), "Receive interrupted");
                Vec::new()
            }
            Err(e) if e.is_transient() => {
                error!(
                    queue = %self.queue.address(),
                    error = %e,
                    pause_secs = self.receive_error_pause.as_secs(),
                    "Receive failed; pausing poller"
                );
                tokio::select! {
                    _ = sleep(self.receive_error_pause) => {},
                    _ = cancel.cancelled() => {
                        debug!(queue = %self.queue.address(), "Poller cancelled during receive pause");
                    }
                }
                Vec::new()
            }
            Err(e) => {
                error!(
                    queue = %self.queue.address(),
                    error = %e,
                    "Unexpected receive error; treating as empty batch"
                );
                Vec::new()
            }
        }
    }

    /// Delete exactly the given messages; returns how many the service confirmed
    async fn acknowledge(&self, messages: &[Message]) -> usize {
        let entries: Vec<DeleteEntry> = messages.iter().map(Message::delete_entry).collect();
        match self
            .transport
            .delete_batch(self.queue.address(), &entries)
            .await
        {
            Ok(outcome) => {
                for failure in &outcome.failed {
                    warn!(
                        queue = %self.queue.address(),
                        message_id = %failure.id,
                        code = %failure.code,
                        reason = failure.message.as_deref().unwrap_or(""),
                        sender_fault = failure.sender_fault,
                        "Message could not be deleted"
                    );
                }
                entries.len() - outcome.failed.len().min(entries.len())
            }
            Err(e) => {
                error!(
                    queue = %self.queue.address(),
                    count = entries.len(),
                    error = %e,
                    "Batch delete failed"
                );
                0
            }
        }
    }
}
