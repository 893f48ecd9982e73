use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::types::ToolResult;

/// Where a finished tool call's result goes.
#[async_trait]
pub trait ResultCallback: Send + Sync {
    async fn deliver(&self, result: ToolResult);
}

#[async_trait]
impl ResultCallback for mpsc::Sender<ToolResult> {
    async fn deliver(&self, result: ToolResult) {
        let call_id = result.call_id.clone();
        if self.send(result).await.is_err() {
            warn!(call_id = %call_id, "result receiver dropped, discarding tool result");
        }
    }
}

#[async_trait]
impl ResultCallback for mpsc::UnboundedSender<ToolResult> {
    async fn deliver(&self, result: ToolResult) {
        let call_id = result.call_id.clone();
        if self.send(result).is_err() {
            warn!(call_id = %call_id, "result receiver dropped, discarding tool result");
        }
    }
}

/// Discards results. For callers that only want the returned value.
pub struct NoCallback;

#[async_trait]
impl ResultCallback for NoCallback {
    async fn deliver(&self, _result: ToolResult) {}
}

/// Adapter that turns an async closure into a [`ResultCallback`].
pub struct FnCallback<F> {
    f: F,
}

pub fn callback_fn<F, Fut>(f: F) -> FnCallback<F>
where
    F: Fn(ToolResult) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    FnCallback { f }
}

#[async_trait]
impl<F, Fut> ResultCallback for FnCallback<F>
where
    F: Fn(ToolResult) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn deliver(&self, result: ToolResult) {
        (self.f)(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn channel_callback_forwards() {
        let (tx, mut rx) = mpsc::channel::<ToolResult>(4);
        tx.deliver(ToolResult::success("c1", "echo", "hi")).await;
        let got = rx.recv().await.unwrap();
        assert_eq!(got.content, "hi");
    }

    #[tokio::test]
    async fn closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel::<ToolResult>();
        drop(rx);
        tx.deliver(ToolResult::success("c1", "echo", "hi")).await;
    }

    #[tokio::test]
    async fn closure_callback_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let cb = callback_fn(move |_result| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        cb.deliver(ToolResult::error("c1", "echo", "x")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
