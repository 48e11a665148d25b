// Handler Ports - user-supplied callables invoked per message

use crate::domain::{Message, MessageContext};
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Error raised by a handler or an interceptor
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Failed(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Failed(message.to_string())
    }
}

/// Message handler capability
///
/// Returning `Ok(())` marks the message as successfully processed; with
/// automatic acknowledgement it is then deleted from the queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message, ctx: &mut MessageContext)
        -> Result<(), HandlerError>;
}

/// Error handler capability, invoked when an interceptor or the handler fails
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_error(&self, message: &Message, error: &HandlerError);
}

/// Interceptor capability, invoked in order before the handler
///
/// A failing interceptor is treated exactly like a failing handler.
#[async_trait]
pub trait HandlerInterceptor: Send + Sync {
    async fn before_handle(
        &self,
        message: &Message,
        ctx: &mut MessageContext,
    ) -> Result<(), HandlerError>;
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Wraps a synchronous closure as a [`MessageHandler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Message, &mut MessageContext) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler(f)
}

/// Wraps an async closure taking an owned message as a [`MessageHandler`]
pub fn async_handler_fn<F, Fut>(f: F) -> AsyncFnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    AsyncFnHandler(f)
}

/// Wraps a closure as an [`ErrorHandler`]
pub fn error_handler_fn<F>(f: F) -> FnErrorHandler<F>
where
    F: Fn(&Message, &HandlerError) + Send + Sync,
{
    FnErrorHandler(f)
}

/// Wraps a closure as a [`HandlerInterceptor`]
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&Message, &mut MessageContext) -> Result<(), HandlerError> + Send + Sync,
{
    FnInterceptor(f)
}

pub struct FnHandler<F>(F);

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Message, &mut MessageContext) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(
        &self,
        message: &Message,
        ctx: &mut MessageContext,
    ) -> Result<(), HandlerError> {
        (self.0)(message, ctx)
    }
}

pub struct AsyncFnHandler<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for AsyncFnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(
        &self,
        message: &Message,
        _ctx: &mut MessageContext,
    ) -> Result<(), HandlerError> {
        (self.0)(message.clone()).await
    }
}

pub struct FnErrorHandler<F>(F);

#[async_trait]
impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(&Message, &HandlerError) + Send + Sync,
{
    async fn on_error(&self, message: &Message, error: &HandlerError) {
        (self.0)(message, error)
    }
}

pub struct FnInterceptor<F>(F);

#[async_trait]
impl<F> HandlerInterceptor for FnInterceptor<F>
where
    F: Fn(&Message, &mut MessageContext) -> Result<(), HandlerError> + Send + Sync,
{
    async fn before_handle(
        &self,
        message: &Message,
        ctx: &mut MessageContext,
    ) -> Result<(), HandlerError> {
        (self.0)(message, ctx)
    }
}
