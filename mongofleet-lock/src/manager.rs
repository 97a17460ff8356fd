//! `LockManager`: acquires and (by re-acquisition) renews named leases.
//!
//! Acquisition is a single atomic upsert-with-`$setOnInsert`, racing any
//! other holder; a duplicate-key error on that upsert just means the race
//! was lost, not a failure. Built on top of that primitive are an injectable
//! [`TimeSource`], a configurable holder id, and a looping `acquire` that
//! retries `try_acquire` until the lease is free.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use bson::doc;
use chrono::Duration;
use mongodb::Collection;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions};
use mongofleet_driver::{Document, MongoClient, TimeSource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::document::LockDocument;
use crate::error::{LockError, LockResult};
use crate::handle::LockHandle;

/// Default lease duration for an ordinary named lock.
pub const DEFAULT_LEASE: Duration = Duration::minutes(5);

/// Default delay between `acquire` retries.
pub const DEFAULT_RETRY_DELAY: StdDuration = StdDuration::from_millis(500);

/// Acquires, and by re-acquisition renews, leases on named locks stored in a
/// single collection.
///
/// One `LockManager` can mediate any number of distinct lock names; the
/// collection, holder id, and time source are fixed at construction.
#[derive(Clone)]
pub struct LockManager {
    collection: Collection<Document>,
    holder_id: String,
    time_source: Arc<dyn TimeSource>,
}

impl LockManager {
    /// Build a manager over `collection_name`, using `client`'s database.
    pub fn new(
        client: &MongoClient,
        collection_name: &str,
        holder_id: impl Into<String>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            collection: client.collection_doc(collection_name),
            holder_id: holder_id.into(),
            time_source,
        }
    }

    /// The identifier this manager presents as `holder` on every acquisition.
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Attempt to acquire `name` once, with `lease` as the hold duration.
    ///
    /// Returns `Ok(Some(handle))` on success, `Ok(None)` if the lock is held
    /// and unexpired (a normal outcome, not an error). A duplicate-key error
    /// from the upsert race is folded into `Ok(None)` as well.
    pub async fn try_acquire(&self, name: &str, lease: Duration) -> LockResult<Option<LockHandle>> {
        self.try_acquire_cancellable(name, lease, &CancellationToken::new())
            .await
    }

    /// As [`try_acquire`](Self::try_acquire), but observes `cancel` before
    /// the database call; fails with [`LockError::Cancelled`] if it has
    /// already fired.
    pub async fn try_acquire_cancellable(
        &self,
        name: &str,
        lease: Duration,
        cancel: &CancellationToken,
    ) -> LockResult<Option<LockHandle>> {
        if name.trim().is_empty() {
            return Err(LockError::InvalidName);
        }
        if cancel.is_cancelled() {
            return Err(LockError::Cancelled);
        }

        let now = self.time_source.now();
        let lease_until = now + lease;

        let filter = doc! {
            "_id": name,
            "leaseUntilUtc": { "$lte": bson::DateTime::from_chrono(now) },
        };
        let update = doc! {
            "$setOnInsert": { "_id": name },
            "$set": {
                "holder": &self.holder_id,
                "leaseUntilUtc": bson::DateTime::from_chrono(lease_until),
            },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection
            .find_one_and_update(filter, update, options)
            .await;

        let post_image = match result {
            Ok(doc) => doc,
            Err(err) => {
                let mongo_err = mongofleet_driver::MongoError::from(err);
                if mongo_err.is_duplicate_key() {
                    trace!(lock = %name, "lost the upsert race, not acquired");
                    return Ok(None);
                }
                return Err(LockError::Driver(mongo_err));
            }
        };

        let Some(post_image) = post_image else {
            return Ok(None);
        };

        let acquired: LockDocument = bson::from_document(post_image)
            .map_err(|e| LockError::Driver(mongofleet_driver::MongoError::from(e)))?;

        if acquired.holder != self.holder_id {
            return Ok(None);
        }

        debug!(lock = %name, holder = %self.holder_id, "lock acquired");
        Ok(Some(LockHandle::new(
            name.to_string(),
            self.holder_id.clone(),
            lease_until,
            self.collection.clone(),
            self.time_source.clone(),
        )))
    }

    /// Loop calling [`try_acquire`](Self::try_acquire) until it succeeds,
    /// sleeping `retry_delay` between attempts. Fails with
    /// [`LockError::Cancelled`] once `cancel` fires.
    pub async fn acquire(
        &self,
        name: &str,
        lease: Duration,
        retry_delay: StdDuration,
        cancel: &CancellationToken,
    ) -> LockResult<LockHandle> {
        loop {
            if let Some(handle) = self.try_acquire_cancellable(name, lease, cancel).await? {
                return Ok(handle);
            }

            tokio::select! {
                _ = tokio::time::sleep(retry_delay) => {}
                _ = cancel.cancelled() => return Err(LockError::Cancelled),
            }
        }
    }
}

/// A fresh per-process holder id, used when configuration supplies none.
pub fn random_holder_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongofleet_driver::FixedTimeSource;

    #[test]
    fn default_lease_is_five_minutes() {
        assert_eq!(DEFAULT_LEASE, Duration::minutes(5));
    }

    #[test]
    fn default_retry_delay_is_500ms() {
        assert_eq!(DEFAULT_RETRY_DELAY, StdDuration::from_millis(500));
    }

    #[tokio::test]
    async fn try_acquire_rejects_empty_name() {
        let time: Arc<dyn TimeSource> = Arc::new(FixedTimeSource::now());
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .expect("client construction does not dial out");
        let collection = client.database("mongofleet_test").collection("_locks");
        let manager = LockManager {
            collection,
            holder_id: "proc-1".to_string(),
            time_source: time,
        };

        let err = manager
            .try_acquire("   ", Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::InvalidName));
    }

    #[tokio::test]
    async fn try_acquire_respects_cancellation() {
        let time: Arc<dyn TimeSource> = Arc::new(FixedTimeSource::now());
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .expect("client construction does not dial out");
        let collection = client.database("mongofleet_test").collection("_locks");
        let manager = LockManager {
            collection,
            holder_id: "proc-1".to_string(),
            time_source: time,
        };

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = manager
            .try_acquire_cancellable("migrations", Duration::minutes(1), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn random_holder_ids_are_unique() {
        assert_ne!(random_holder_id(), random_holder_id());
    }
}
