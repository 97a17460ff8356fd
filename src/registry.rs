//! `HandlerRegistry`: explicit, type-keyed handler registration.
//!
//! A small type-keyed map (`TypeId -> Arc<dyn Handler<P>>`, type-erased
//! behind `Arc<dyn Any>`) guarded by `parking_lot::RwLock`, reads never
//! block writers out for long, and registration happens once at startup
//! while resolution happens on every queue work cycle.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use mongofleet_queue::{Handler, HandlerFactory, QueueError, QueueResult};
use parking_lot::RwLock;

/// A process-wide map from payload type to the handler that processes it.
///
/// One registry can back any number of [`mongofleet_queue::Subscription`]s;
/// pair it with [`RegistryHandlerFactory`] to use it as a
/// [`HandlerFactory`].
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl HandlerRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as the handler for payload type `P`. Replaces any
    /// previously registered handler for the same `P`.
    pub fn register<P>(&self, handler: Arc<dyn Handler<P>>)
    where
        P: 'static,
    {
        self.handlers
            .write()
            .insert(TypeId::of::<P>(), Box::new(handler));
    }

    /// Resolve the handler registered for `P`.
    ///
    /// Fails with [`QueueError::HandlerNotRegistered`] if none was
    /// registered.
    pub fn resolve<P>(&self) -> QueueResult<Arc<dyn Handler<P>>>
    where
        P: 'static,
    {
        let handlers = self.handlers.read();
        let boxed = handlers.get(&TypeId::of::<P>()).ok_or_else(|| {
            QueueError::HandlerNotRegistered(type_name::<P>().to_string())
        })?;

        let handler = boxed
            .downcast_ref::<Arc<dyn Handler<P>>>()
            .expect("registry entry keyed by TypeId::of::<P>() always downcasts to Arc<dyn Handler<P>>")
            .clone();
        Ok(handler)
    }

    /// True if a handler is registered for `P`.
    pub fn is_registered<P: 'static>(&self) -> bool {
        self.handlers.read().contains_key(&TypeId::of::<P>())
    }
}

/// Adapts a shared [`HandlerRegistry`] into a [`HandlerFactory`] for one
/// payload type `P`, for use when constructing a
/// [`mongofleet_queue::SubscriptionConfig`].
pub struct RegistryHandlerFactory<P> {
    registry: Arc<HandlerRegistry>,
    _marker: std::marker::PhantomData<fn() -> P>,
}

impl<P> RegistryHandlerFactory<P> {
    /// Build a factory resolving `P`'s handler from `registry` on every
    /// work cycle.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<P> HandlerFactory<P> for RegistryHandlerFactory<P>
where
    P: Send + Sync + 'static,
{
    fn resolve(&self) -> QueueResult<Arc<dyn Handler<P>>> {
        self.registry.resolve::<P>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Widget {
        sku: String,
    }

    struct WidgetHandler;

    #[async_trait]
    impl Handler<Widget> for WidgetHandler {
        async fn handle(
            &self,
            _payload: &Widget,
            _cancel: &CancellationToken,
        ) -> mongofleet_queue::HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn unregistered_type_fails_to_resolve() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve::<Widget>().unwrap_err();
        assert!(matches!(err, QueueError::HandlerNotRegistered(_)));
        assert!(!registry.is_registered::<Widget>());
    }

    #[test]
    fn registered_handler_resolves() {
        let registry = HandlerRegistry::new();
        registry.register::<Widget>(Arc::new(WidgetHandler));

        assert!(registry.is_registered::<Widget>());
        assert!(registry.resolve::<Widget>().is_ok());
    }

    #[tokio::test]
    async fn registry_handler_factory_delegates_to_the_registry() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register::<Widget>(Arc::new(WidgetHandler));

        let factory = RegistryHandlerFactory::<Widget>::new(registry);
        let handler = factory.resolve().unwrap();
        handler
            .handle(&Widget { sku: "w-1".to_string() }, &CancellationToken::new())
            .await
            .unwrap();
    }
}
