// Message Task - unit of work run on the worker pool

use crate::application::worker::{execute_guarded_async, PanicGuardResult};
use crate::application::Queue;
use crate::domain::{Message, MessageContext};
use crate::port::{HandlerError, TaskFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, field, info_span, warn, Instrument, Span};

/// Countdown of pending task completions for one batch
pub struct CompletionLatch {
    remaining: AtomicUsize,
    notify: Notify,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Decrement by one; saturates at zero
    pub fn count_down(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }

    /// Wait until the count reaches zero
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Counts the latch down exactly once, when dropped
///
/// Lives inside the task future, so the count drops whether the task runs to
/// completion, panics, or is discarded without ever running.
pub struct CompletionGuard {
    latch: Arc<CompletionLatch>,
}

impl CompletionGuard {
    pub fn new(latch: Arc<CompletionLatch>) -> Self {
        Self { latch }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

/// Messages of a batch whose handler and interceptors all succeeded
pub type SuccessSet = Arc<Mutex<Vec<Message>>>;

/// Message task
pub struct MessageTask {
    queue: Arc<Queue>,
    message: Message,
    successes: SuccessSet,
    completion: CompletionGuard,
}

impl MessageTask {
    pub fn new(
        queue: Arc<Queue>,
        message: Message,
        latch: Arc<CompletionLatch>,
        successes: SuccessSet,
    ) -> Self {
        Self {
            queue,
            message,
            successes,
            completion: CompletionGuard::new(latch),
        }
    }

    pub fn into_future(self) -> TaskFuture {
        self.run().boxed()
    }

    /// Run interceptors then the handler; report failures; signal completion
    pub async fn run(self) {
        let MessageTask {
            queue,
            message,
            successes,
            completion,
        } = self;

        let span = info_span!(
            "message_task",
            queue = %queue.address(),
            message_id = %message.id,
            correlation_id = field::Empty,
        );

        async move {
            let mut ctx = MessageContext::new(queue.address());
            let result = match execute_guarded_async(invoke(&queue, &message, &mut ctx)).await {
                PanicGuardResult::Success(result) => result,
                PanicGuardResult::Panicked(msg) => Err(HandlerError::Panicked(msg)),
            };

            match result {
                Ok(()) => {
                    debug!(elapsed_ms = ctx.elapsed_ms(), "Message handled");
                    successes.lock().push(message);
                }
                Err(error) => report_failure(&queue, &message, &error).await,
            }

            drop(ctx);
            drop(completion);
        }
        .instrument(span)
        .await
    }
}

async fn invoke(
    queue: &Queue,
    message: &Message,
    ctx: &mut MessageContext,
) -> Result<(), HandlerError> {
    for interceptor in queue.interceptors() {
        interceptor.before_handle(message, ctx).await?;
    }
    if let Some(correlation_id) = ctx.correlation_id.as_deref() {
        Span::current().record("correlation_id", correlation_id);
    }
    queue.handler().handle(message, ctx).await
}

async fn report_failure(queue: &Queue, message: &Message, error: &HandlerError) {
    match queue.error_handler() {
        Some(error_handler) => {
            let reported = execute_guarded_async(error_handler.on_error(message, error)).await;
            if let PanicGuardResult::Panicked(msg) = reported {
                warn!(
                    queue = %queue.address(),
                    message_id = %message.id,
                    panic_msg = %msg,
                    "Error handler panicked"
                );
            }
        }
        None => {
            error!(
                queue = %queue.address(),
                message_id = %message.id,
                error = %error,
                "Error processing message"
            );
        }
    }
}
