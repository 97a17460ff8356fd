//! The handler contract and its resolution factory.
//!
//! Per-item handler resolution is "resolve, use, release" rather than full
//! dependency injection. A [`HandlerFactory`] resolves an `Arc<dyn
//! Handler<P>>` per work cycle; the processor drops it after the call.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::QueueResult;

/// The result of processing one item. Any `Err` is treated as a handler
/// failure: the item is logged and left locked.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Processes a single payload claimed from a queue.
#[async_trait]
pub trait Handler<P>: Send + Sync {
    /// Handle one payload. `cancel` fires if the owning subscription is
    /// stopped while this call is in flight; the item stays locked
    /// regardless of how this returns.
    async fn handle(&self, payload: &P, cancel: &CancellationToken) -> HandlerResult;
}

/// Resolves a [`Handler`] instance for each work cycle.
///
/// Implementations backed by a DI container would resolve a scoped instance
/// here; this crate doesn't require one, since a plain closure works via the
/// blanket impl below.
pub trait HandlerFactory<P>: Send + Sync {
    /// Resolve a handler instance, failing with
    /// [`crate::error::QueueError::HandlerNotRegistered`] if none is
    /// available for `P`.
    fn resolve(&self) -> QueueResult<Arc<dyn Handler<P>>>;
}

impl<P, F> HandlerFactory<P> for F
where
    F: Fn() -> QueueResult<Arc<dyn Handler<P>>> + Send + Sync,
{
    fn resolve(&self) -> QueueResult<Arc<dyn Handler<P>>> {
        self()
    }
}

/// A [`HandlerFactory`] that always resolves the same handler instance.
///
/// Convenient for handlers with no per-invocation state to scope.
pub struct SingletonHandlerFactory<P> {
    handler: Arc<dyn Handler<P>>,
}

impl<P> SingletonHandlerFactory<P> {
    /// Wrap `handler` so it's resolved unchanged on every work cycle.
    pub fn new(handler: Arc<dyn Handler<P>>) -> Self {
        Self { handler }
    }
}

impl<P: Send + Sync> HandlerFactory<P> for SingletonHandlerFactory<P> {
    fn resolve(&self) -> QueueResult<Arc<dyn Handler<P>>> {
        Ok(self.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    struct Widget {
        sku: String,
    }

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Handler<Widget> for CountingHandler {
        async fn handle(&self, payload: &Widget, _cancel: &CancellationToken) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if payload.sku == "Fail" {
                return Err("boom".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn singleton_factory_resolves_the_same_handler() {
        let handler = Arc::new(CountingHandler { calls: AtomicUsize::new(0) });
        let factory = SingletonHandlerFactory::new(handler.clone() as Arc<dyn Handler<Widget>>);

        let resolved = factory.resolve().unwrap();
        resolved
            .handle(&Widget { sku: "OK1".to_string() }, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failure_is_surfaced_as_err() {
        let handler = Arc::new(CountingHandler { calls: AtomicUsize::new(0) });
        let factory = SingletonHandlerFactory::new(handler as Arc<dyn Handler<Widget>>);

        let resolved = factory.resolve().unwrap();
        let result = resolved
            .handle(&Widget { sku: "Fail".to_string() }, &CancellationToken::new())
            .await;

        assert!(result.is_err());
    }
}
