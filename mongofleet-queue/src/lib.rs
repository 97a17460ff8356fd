//! # mongofleet-queue
//!
//! A persistent work queue, one collection per payload type, that delivers
//! each enqueued item to exactly one consumer.
//!
//! A [`Publisher`] inserts items; a [`Subscription`] runs a change-stream
//! watcher and a polling processor as a cooperating task pair, claiming
//! items with an atomic `find_one_and_update` into a
//! claim-then-close-or-abandon item state machine rather than a perpetually
//! renewed lease. Delivery is at-most-once per item for a successful
//! handler call; a handler that fails leaves its item locked for an
//! operator to reconcile (see the `processor_loop`/`process_cycle` doc
//! comments in `subscription.rs`).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use mongofleet_driver::{MongoClient, SystemTimeSource};
//! use mongofleet_queue::{
//!     Handler, HandlerResult, Publisher, QueueDefinition, QueueError, QueueResult,
//!     SingletonHandlerFactory, Subscription, SubscriptionConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
//! struct OrderPlaced {
//!     order_id: String,
//! }
//!
//! struct OrderHandler;
//!
//! #[async_trait]
//! impl Handler<OrderPlaced> for OrderHandler {
//!     async fn handle(&self, payload: &OrderPlaced, _cancel: &CancellationToken) -> HandlerResult {
//!         println!("processing {}", payload.order_id);
//!         Ok(())
//!     }
//! }
//!
//! # async fn run(client: MongoClient) -> Result<(), Box<dyn std::error::Error>> {
//! let queue = QueueDefinition::<OrderPlaced>::new("_Queue.orders");
//! let publisher = Publisher::new(client.clone(), Arc::new(SystemTimeSource));
//! publisher.publish(&queue, OrderPlaced { order_id: "o-1".to_string() }).await?;
//!
//! let factory = Arc::new(SingletonHandlerFactory::new(Arc::new(OrderHandler) as Arc<dyn Handler<OrderPlaced>>));
//! let config = SubscriptionConfig::new(queue.collection_name(), factory, Arc::new(SystemTimeSource));
//! let subscription = Subscription::new(client, config);
//! subscription.start().await?;
//! // ... later ...
//! subscription.stop(&CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod definition;
pub mod error;
pub mod handler;
pub mod index;
pub mod item;
pub mod prioritizer;
pub mod publisher;
pub mod subscription;

pub use definition::QueueDefinition;
pub use error::{QueueError, QueueResult};
pub use handler::{Handler, HandlerFactory, HandlerResult, SingletonHandlerFactory};
pub use item::{QueueItem, QueueItemId};
pub use prioritizer::{CreatedOrderPrioritizer, Prioritizer};
pub use publisher::Publisher;
pub use subscription::{Subscription, SubscriptionConfig, SubscriptionState};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::definition::QueueDefinition;
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::handler::{Handler, HandlerFactory, HandlerResult, SingletonHandlerFactory};
    pub use crate::item::QueueItem;
    pub use crate::prioritizer::{CreatedOrderPrioritizer, Prioritizer};
    pub use crate::publisher::Publisher;
    pub use crate::subscription::{Subscription, SubscriptionConfig, SubscriptionState};
}
