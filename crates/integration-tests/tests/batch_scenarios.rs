//! Batch consumption scenarios
//!
//! Receive, dispatch, acknowledge and transient failure behaviour of a
//! running listener against the in-memory transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use queue_listener_core::application::CorrelationIdInterceptor;
use queue_listener_core::domain::Message;
use queue_listener_core::port::transport::mocks::InMemoryTransport;
use queue_listener_core::port::{
    error_handler_fn, handler_fn, interceptor_fn, HandlerError, TransportError,
};
use queue_listener_core::MessageListener;

const WAIT: Duration = Duration::from_secs(5);

fn two_messages() -> Vec<Message> {
    vec![
        Message::new("testId", "receipt-1", "first"),
        Message::new("testId2", "receipt-2", "second"),
    ]
}

/// Batch of two, both succeed: exactly one delete carrying both ids
#[tokio::test]
async fn test_successful_batch_is_deleted_in_one_request() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(two_messages());

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .concurrency(1)
        .transport(transport.clone())
        .handler(handler_fn(|_, _| Ok(())))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |t| !t.delete_requests().is_empty()).await);
    assert!(listener.shutdown(WAIT).await);

    let deletes = transport.delete_requests();
    assert_eq!(deletes.len(), 1);
    let mut ids: Vec<String> = deletes[0].iter().map(|e| e.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["testId", "testId2"]);
    let handles: Vec<&str> = deletes[0].iter().map(|e| e.receipt_handle.as_str()).collect();
    assert!(handles.contains(&"receipt-1") && handles.contains(&"receipt-2"));
}

/// One failing message: only the other is deleted, error handler called once
#[tokio::test]
async fn test_failed_message_goes_to_error_handler_only() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(two_messages());
    let failures: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = failures.clone();

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .transport(transport.clone())
        .handler(handler_fn(|message, _| {
            if message.id == "testId2" {
                Err(HandlerError::Failed("processingFailure".into()))
            } else {
                Ok(())
            }
        }))
        .error_handler(error_handler_fn(move |message, error| {
            recorded
                .lock()
                .push((message.id.clone(), error.to_string()));
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |t| !t.delete_requests().is_empty()).await);
    assert!(listener.shutdown(WAIT).await);

    assert_eq!(transport.deleted_ids(), vec!["testId".to_string()]);
    assert_eq!(
        *failures.lock(),
        vec![("testId2".to_string(), "processingFailure".to_string())]
    );
}

/// Manual acknowledgement: handled messages are never deleted
#[tokio::test]
async fn test_manual_ack_leaves_messages() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(two_messages());
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .auto_acknowledge(false)
        .transport(transport.clone())
        .handler(handler_fn(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |_| handled.load(Ordering::SeqCst) == 2).await);
    // A few more empty cycles to make sure nothing is deleted late
    let seen = transport.receive_count();
    assert!(transport.wait_until(WAIT, |t| t.receive_count() > seen + 2).await);
    assert!(listener.shutdown(WAIT).await);

    assert!(transport.delete_requests().is_empty());
}

/// Transient receive failure: no handler call, no delete, next receive after 5s
#[tokio::test(start_paused = true)]
async fn test_transient_failure_pauses_poller() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.fail_next_receive(TransportError::service("ReceiveMessage", "testFailure"));
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();

    let listener = MessageListener::builder("testQueue")
        .transport(transport.clone())
        .handler(handler_fn(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(
        transport
            .wait_until(Duration::from_secs(30), |t| t.receive_count() >= 2)
            .await
    );
    assert!(listener.shutdown(WAIT).await);

    let instants = transport.receive_instants();
    assert!(instants[1] - instants[0] >= Duration::from_secs(5));
    assert_eq!(handled.load(Ordering::SeqCst), 0);
    assert!(transport.delete_requests().is_empty());
}

/// Repeated outages never kill the poller
#[tokio::test(start_paused = true)]
async fn test_poller_survives_repeated_failures() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.fail_next_receive(TransportError::service("ReceiveMessage", "outage"));
    transport.fail_next_receive(TransportError::Unexpected("garbled response".into()));
    transport.fail_next_receive(TransportError::Interrupted);
    transport.push(Message::new("after-outage", "rh", ""));

    let listener = MessageListener::builder("testQueue")
        .transport(transport.clone())
        .handler(handler_fn(|_, _| Ok(())))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(
        transport
            .wait_until(Duration::from_secs(60), |t| t.deleted_ids() == vec!["after-outage".to_string()])
            .await
    );
    assert!(listener.is_running());
    assert!(listener.shutdown(WAIT).await);
}

/// Interceptors run in order before the handler; a failing one skips the handler
#[tokio::test]
async fn test_interceptors_and_correlation_id() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(vec![
        Message::new("m-1", "rh-1", "").with_attribute("correlationId", "corr-1"),
        Message::new("m-2", "rh-2", "").with_attribute("reject", "yes"),
    ]);
    let seen: Arc<Mutex<Vec<(String, Option<String>)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let errors = Arc::new(AtomicUsize::new(0));
    let error_count = errors.clone();

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .transport(transport.clone())
        .interceptor(CorrelationIdInterceptor::default())
        .interceptor(interceptor_fn(|message, _| {
            if message.attribute("reject").is_some() {
                Err("rejected by interceptor".into())
            } else {
                Ok(())
            }
        }))
        .handler(handler_fn(move |message, ctx| {
            recorded
                .lock()
                .push((message.id.clone(), ctx.correlation_id.clone()));
            Ok(())
        }))
        .error_handler(error_handler_fn(move |_, _| {
            error_count.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |t| !t.delete_requests().is_empty()).await);
    assert!(listener.shutdown(WAIT).await);

    assert_eq!(
        *seen.lock(),
        vec![("m-1".to_string(), Some("corr-1".to_string()))]
    );
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(transport.deleted_ids(), vec!["m-1".to_string()]);
}

/// A panicking handler is a failed message, not a dead worker
#[tokio::test]
async fn test_handler_panic_is_contained() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(two_messages());
    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = errors.clone();

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .transport(transport.clone())
        .handler(handler_fn(|message, _| {
            if message.id == "testId2" {
                panic!("handler bug");
            }
            Ok(())
        }))
        .error_handler(error_handler_fn(move |message, error| {
            recorded.lock().push(format!("{}: {}", message.id, error));
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |t| !t.delete_requests().is_empty()).await);
    assert!(listener.shutdown(WAIT).await);

    assert_eq!(transport.deleted_ids(), vec!["testId".to_string()]);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("testId2: Handler panicked"));
}
