// Queue Listener Core - poll, dispatch, acknowledge
// NO transport dependencies (Hexagonal Architecture)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{ListenerRegistry, MessageListener, MessageListenerBuilder};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
