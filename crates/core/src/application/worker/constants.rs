// Listener constants (no magic values)
use std::time::Duration;

/// Pause applied to a poller after a transient receive failure (5s)
pub const RECEIVE_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Idle period after which a worker above the core size retires (120s)
pub const DEFAULT_WORKER_KEEP_ALIVE: Duration = Duration::from_secs(120);

/// Workers kept alive regardless of idleness (0 = every worker may retire)
pub const DEFAULT_CORE_WORKERS: usize = 0;

/// Extra worker on top of concurrency x batch size
pub const WORKER_HEADROOM: usize = 1;

/// Default bounded wait when draining pollers and workers on stop (20s)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

/// Name prefix for message-processing workers
pub const WORKER_NAME_PREFIX: &str = "sqs-listener";

/// Name prefix for poller tasks
pub const POLLER_NAME_PREFIX: &str = "sqs-consumer-loop";
