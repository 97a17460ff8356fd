//! `LockHandle`: the scoped ownership token returned by a successful
//! acquisition.
//!
//! Its `Drop` impl deletes the row it owns on scope exit. It also carries an
//! `is_valid`/`ensure_valid` contract checked against an injectable
//! [`TimeSource`], and an async `release` that deletes through the `mongodb`
//! async driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::Collection;
use mongofleet_driver::{Document, TimeSource};
use tracing::warn;

use crate::error::{LockError, LockResult};

/// A held lease on a named lock.
///
/// Dropping a handle without calling [`release`](LockHandle::release) spawns
/// a best-effort detached release so the row doesn't linger until its lease
/// naturally expires; any error during that release is logged and swallowed,
/// matching the "exceptions during release are swallowed" contract.
pub struct LockHandle {
    name: String,
    holder: String,
    valid_until_utc: DateTime<Utc>,
    released: Arc<AtomicBool>,
    collection: Collection<Document>,
    time_source: Arc<dyn TimeSource>,
}

impl LockHandle {
    pub(crate) fn new(
        name: String,
        holder: String,
        valid_until_utc: DateTime<Utc>,
        collection: Collection<Document>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            name,
            holder,
            valid_until_utc,
            released: Arc::new(AtomicBool::new(false)),
            collection,
            time_source,
        }
    }

    /// The lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The holder id that acquired this handle.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// The lease expiry observed at acquisition time. Not renewed.
    pub fn valid_until_utc(&self) -> DateTime<Utc> {
        self.valid_until_utc
    }

    /// True iff the handle has not been released and the lease observed at
    /// acquisition has not yet passed, according to the same [`TimeSource`]
    /// used to acquire it.
    pub fn is_valid(&self) -> bool {
        !self.released.load(Ordering::SeqCst) && self.time_source.now() < self.valid_until_utc
    }

    /// Returns `self` if [`is_valid`](Self::is_valid), otherwise
    /// `Err(LockError::Expired)`.
    pub fn ensure_valid(&self) -> LockResult<&Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(LockError::Expired(self.name.clone()))
        }
    }

    /// Release the lock. Deletes exactly the row where `_id == name AND
    /// holder == self_id`, never another holder's lock. Idempotent: a
    /// second call is a no-op.
    pub async fn release(&self) -> LockResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let filter = doc! { "_id": &self.name, "holder": &self.holder };
        match self.collection.delete_one(filter, None).await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(lock = %self.name, error = %err, "failed to release lock, lease will expire naturally");
                Ok(())
            }
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let filter = doc! { "_id": self.name.clone(), "holder": self.holder.clone() };
        let collection = self.collection.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            if let Err(err) = collection.delete_one(filter, None).await {
                warn!(lock = %name, error = %err, "failed to release lock on drop, lease will expire naturally");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongofleet_driver::FixedTimeSource;

    // The mongodb driver resolves topology lazily: constructing a `Client`
    // and a `Collection` from it performs no I/O until the first command is
    // issued, so `LockHandle`'s non-network logic (validity against the
    // injected time source) can be exercised without a running server.
    async fn test_collection() -> Collection<Document> {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .expect("client construction does not dial out");
        client.database("mongofleet_test").collection("_locks")
    }

    #[tokio::test]
    async fn valid_until_is_observed_via_time_source() {
        let fixed = FixedTimeSource::now();
        let time: Arc<dyn TimeSource> = Arc::new(fixed.clone());
        let valid_until = time.now() + chrono::Duration::minutes(5);

        let handle = LockHandle::new(
            "migrations".to_string(),
            "proc-1".to_string(),
            valid_until,
            test_collection().await,
            time.clone(),
        );

        assert!(handle.is_valid());
        assert!(handle.ensure_valid().is_ok());

        // `fixed` shares its underlying clock with the `Arc<dyn TimeSource>`
        // handed to the handle, since `FixedTimeSource::clone` clones the Arc.
        fixed.advance(chrono::Duration::minutes(6));

        assert!(!handle.is_valid());
        assert!(handle.ensure_valid().is_err());
    }
}
