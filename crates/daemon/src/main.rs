//! Queue Listener - Example Daemon
//! Consumes every configured SQS queue until Ctrl+C

mod handlers;
mod settings;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use handlers::{LoggingErrorHandler, LoggingHandler};
use queue_listener_core::application::worker::WorkerPool;
use queue_listener_core::application::CorrelationIdInterceptor;
use queue_listener_core::port::{QueueTransport, TaskExecutor};
use queue_listener_core::{ListenerRegistry, MessageListenerBuilder};
use queue_listener_infra_sqs::SqsTransport;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FORMAT_ENV: &str = "QUEUE_LISTENER_LOG_FORMAT";
const DEFAULT_LOG_FILTER: &str = "queue_listener=info";

fn init_logging() -> Result<()> {
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    init_logging()?;
    info!("Queue Listener v{} starting...", VERSION);

    // 2. Configuration
    let settings = settings::load()?;
    let props = &settings.listener;
    if !props.enabled {
        info!("Listener disabled by configuration; exiting");
        return Ok(());
    }
    if props.queues.is_empty() {
        warn!("No queues configured; exiting");
        return Ok(());
    }

    // 3. Shared dependencies
    let transport: Arc<dyn QueueTransport> =
        Arc::new(SqsTransport::from_env(settings.region.clone()).await);
    let pool = Arc::new(WorkerPool::new(props.worker_pool_config())?);
    let executor: Arc<dyn TaskExecutor> = pool.clone();

    // 4. One listener per queue
    let registry = ListenerRegistry::new();
    for queue in &props.queues {
        let listener = MessageListenerBuilder::from_options(queue.to_options())
            .transport(Arc::clone(&transport))
            .executor(Arc::clone(&executor))
            .handler(LoggingHandler)
            .error_handler(LoggingErrorHandler)
            .interceptor(CorrelationIdInterceptor::default())
            .build()?;
        registry.register(queue.address.clone(), Arc::new(listener));
    }

    registry.start_all()?;
    info!(listeners = registry.len(), "System ready. Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping listeners...");

    // 6. Graceful shutdown: pollers first, then the shared pool
    registry.stop_all();
    let timeout = props.shutdown_timeout();
    let listeners_done = registry.await_termination_all(timeout).await;
    let pool_done = pool.shutdown(timeout).await;
    if !(listeners_done && pool_done) {
        warn!("Shutdown timed out; in-flight messages will be redelivered after their visibility timeout");
    }

    info!("Shutdown complete.");
    Ok(())
}
