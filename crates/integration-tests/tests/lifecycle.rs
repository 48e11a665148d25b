//! Listener lifecycle: subscribe/destroy, scaling, draining, registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use queue_listener_core::application::worker::{WorkerPool, WorkerPoolConfig};
use queue_listener_core::domain::Message;
use queue_listener_core::port::transport::mocks::InMemoryTransport;
use queue_listener_core::port::{async_handler_fn, handler_fn, RuntimeExecutor, TaskExecutor};
use queue_listener_core::{AppError, ListenerRegistry, MessageListener};

const WAIT: Duration = Duration::from_secs(5);

fn noop_listener(transport: Arc<InMemoryTransport>, concurrency: usize) -> MessageListener {
    MessageListener::builder("testQueue")
        .concurrency(concurrency)
        .transport(transport)
        .handler(handler_fn(|_, _| Ok(())))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_starts_once() {
    let transport = Arc::new(InMemoryTransport::new());
    let listener = Arc::new(noop_listener(transport, 2));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let listener = listener.clone();
        handles.push(tokio::spawn(async move { listener.subscribe() }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(listener.is_running());
    assert_eq!(listener.active_pollers(), 2);
    assert!(listener.shutdown(WAIT).await);
}

#[tokio::test]
async fn test_scale_up_then_down() {
    let transport = Arc::new(InMemoryTransport::new());
    let listener = noop_listener(transport.clone(), 2);
    listener.subscribe().unwrap();
    assert_eq!(listener.active_pollers(), 2);

    listener.set_concurrency(5).unwrap();
    assert_eq!(listener.active_pollers(), 5);

    listener.set_concurrency(2).unwrap();
    assert_eq!(listener.active_pollers(), 2);

    // Cancelled pollers exit after their current cycle
    assert!(transport.wait_until(WAIT, |_| listener.running_pollers() == 2).await);
    assert!(listener.is_running());

    // Remaining pollers keep polling
    let seen = transport.receive_count();
    assert!(transport.wait_until(WAIT, |t| t.receive_count() >= seen + 4).await);

    assert!(listener.shutdown(WAIT).await);
    assert_eq!(listener.active_pollers(), 0);
}

#[tokio::test]
async fn test_stop_mid_batch_drains_and_stops_receiving() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_all(vec![
        Message::new("slow-1", "rh-1", ""),
        Message::new("slow-2", "rh-2", ""),
    ]);
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let (started_c, finished_c) = (started.clone(), finished.clone());

    let listener = MessageListener::builder("testQueue")
        .batch_size(2)
        .transport(transport.clone())
        .handler(async_handler_fn(move |_| {
            let started = started_c.clone();
            let finished = finished_c.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();

    assert!(transport.wait_until(WAIT, |_| started.load(Ordering::SeqCst) == 2).await);
    listener.destroy();
    assert!(!listener.is_running());

    assert!(listener.await_termination(WAIT).await);
    assert_eq!(finished.load(Ordering::SeqCst), 2);
    // The in-flight batch still completes its acknowledgement
    assert_eq!(transport.delete_requests().len(), 1);

    let receives = transport.receive_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.receive_count(), receives);
}

#[tokio::test]
async fn test_await_termination_times_out_on_stuck_handler() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push(Message::new("stuck", "rh", ""));
    let listener = MessageListener::builder("testQueue")
        .transport(transport.clone())
        .handler(async_handler_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }))
        .build()
        .unwrap();
    listener.subscribe().unwrap();
    assert!(transport.wait_until(WAIT, |t| t.receive_count() >= 1).await);

    assert!(!listener.shutdown(Duration::from_millis(100)).await);
    assert!(transport.delete_requests().is_empty());
}

#[tokio::test]
async fn test_destroyed_listener_cannot_restart() {
    let listener = noop_listener(Arc::new(InMemoryTransport::new()), 1);
    listener.subscribe().unwrap();
    assert!(listener.shutdown(WAIT).await);

    assert!(matches!(listener.subscribe(), Err(AppError::Terminated(_))));
    // destroy stays a no-op
    listener.destroy();
    assert!(!listener.is_running());
}

#[tokio::test]
async fn test_external_executor_outlives_listener() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push(Message::new("m-1", "rh", ""));
    let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::for_queue(1, 4)).unwrap());
    let executor: Arc<dyn TaskExecutor> = pool.clone();

    let listener = MessageListener::builder("testQueue")
        .transport(transport.clone())
        .executor(executor)
        .handler(handler_fn(|_, _| Ok(())))
        .build()
        .unwrap();
    listener.subscribe().unwrap();
    assert!(transport.wait_until(WAIT, |t| t.deleted_ids().len() == 1).await);
    assert!(listener.shutdown(WAIT).await);

    // Still accepting work after the listener is gone
    assert!(!pool.is_shutdown());
    let ran = Arc::new(AtomicUsize::new(0));
    let flag = ran.clone();
    pool.submit(Box::pin(async move {
        flag.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();
    assert!(pool.shutdown(WAIT).await);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_runtime_executor_listener() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push(Message::new("m-1", "rh", ""));
    let listener = MessageListener::builder("testQueue")
        .transport(transport.clone())
        .executor(Arc::new(RuntimeExecutor::current().unwrap()))
        .handler(handler_fn(|_, _| Ok(())))
        .build()
        .unwrap();

    listener.subscribe().unwrap();
    assert!(transport.wait_until(WAIT, |t| t.deleted_ids().len() == 1).await);
    assert!(listener.shutdown(WAIT).await);
}

#[tokio::test]
async fn test_registry_controls_all_listeners() {
    let orders = Arc::new(InMemoryTransport::new());
    let refunds = Arc::new(InMemoryTransport::new());
    orders.push(Message::new("o-1", "rh", ""));
    refunds.push(Message::new("r-1", "rh", ""));

    let registry = ListenerRegistry::new();
    registry.register("orders", Arc::new(noop_listener(orders.clone(), 1)));
    registry.register("refunds", Arc::new(noop_listener(refunds.clone(), 2)));

    registry.start_all().unwrap();
    assert!(registry.is_running());
    assert!(orders.wait_until(WAIT, |t| t.deleted_ids().len() == 1).await);
    assert!(refunds.wait_until(WAIT, |t| t.deleted_ids().len() == 1).await);

    registry.stop_all();
    assert!(!registry.is_running());
    assert!(registry.await_termination_all(WAIT).await);
}
