//! `Publisher`: inserts payload-bearing items into a queue collection.
//!
//! A bare insert, not transactional with anything else in this crate; a
//! caller that needs cross-publish atomicity wraps its own transaction
//! around one or more `publish` calls by passing a session through
//! `mongofleet_driver::MongoClient::start_session`.

use std::sync::Arc;

use mongofleet_driver::{MongoClient, TimeSource};
use serde::Serialize;
use tracing::debug;

use crate::definition::QueueDefinition;
use crate::error::QueueResult;
use crate::item::{QueueItem, QueueItemId};

/// Publishes items onto per-payload-type queue collections.
#[derive(Clone)]
pub struct Publisher {
    client: MongoClient,
    time_source: Arc<dyn TimeSource>,
}

impl Publisher {
    /// Build a publisher over `client`'s database, stamping `created_utc`
    /// through `time_source` rather than reading the wall clock directly.
    pub fn new(client: MongoClient, time_source: Arc<dyn TimeSource>) -> Self {
        Self { client, time_source }
    }

    /// Insert a new item carrying `payload` into `queue`'s collection.
    ///
    /// No deduplication is performed; publishing the same logical payload
    /// twice creates two items. Fails with
    /// [`crate::error::QueueError::InvalidArgument`] if `queue`'s collection
    /// name is empty. `QueueDefinition<P>` is itself generic over `P`, so a
    /// payload/queue type mismatch is caught at compile time; there is no
    /// runtime check to perform.
    pub async fn publish<P>(
        &self,
        queue: &QueueDefinition<P>,
        payload: P,
    ) -> QueueResult<QueueItemId>
    where
        P: Serialize + Send + Sync,
    {
        if queue.collection_name().trim().is_empty() {
            return Err(crate::error::QueueError::invalid_argument(
                "queue collection_name must not be empty",
            ));
        }

        let collection = self.client.collection::<QueueItem<P>>(queue.collection_name());
        let item = QueueItem::new(payload, queue.payload_type_name(), self.time_source.now());

        collection
            .insert_one(&item, None)
            .await
            .map_err(mongofleet_driver::MongoError::from)?;

        debug!(
            queue = %queue.collection_name(),
            item_id = %item.id,
            "published queue item"
        );
        Ok(QueueItemId { id: item.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::QueueDefinition;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Widget {
        sku: String,
    }

    #[test]
    fn queue_definition_carries_collection_and_type_name() {
        let queue = QueueDefinition::<Widget>::new("_Queue.ABCDEF.Widget");
        assert_eq!(queue.collection_name(), "_Queue.ABCDEF.Widget");
        assert!(queue.payload_type_name().contains("Widget"));
    }
}
