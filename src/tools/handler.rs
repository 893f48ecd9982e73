use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::ToolInvocation;

/// A tool's execution handler. Consumers implement this for each tool.
///
/// `Ok` content goes back to the model as the tool result. `Err` content
/// goes back too, flagged as an error; it never aborts the dispatcher.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, invocation: &ToolInvocation) -> Result<String, String>;
}

#[async_trait]
impl<H: ToolHandler + ?Sized> ToolHandler for Arc<H> {
    async fn call(&self, invocation: &ToolInvocation) -> Result<String, String> {
        (**self).call(invocation).await
    }
}

/// Adapter that turns an async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a handler. The closure receives an owned
/// copy of the invocation.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ToolInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, String>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, String>> + Send,
{
    async fn call(&self, invocation: &ToolInvocation) -> Result<String, String> {
        (self.f)(invocation.clone()).await
    }
}
