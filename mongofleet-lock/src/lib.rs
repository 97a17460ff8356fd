//! # mongofleet-lock
//!
//! A lease-based distributed lock backed by a dedicated MongoDB collection.
//!
//! A single atomic upsert races all acquirers against `leaseUntilUtc`,
//! duplicate-key errors from the race are folded into "not acquired," and a
//! held lease is released on `Drop`. The async `mongodb` driver backs it, an
//! explicit `holder`/`leaseUntilUtc` document shape records ownership, and a
//! `LockHandle`'s validity is checked against an injectable
//! [`TimeSource`](mongofleet_driver::TimeSource) rather than the OS clock, so
//! lease-expiry behavior is deterministic in tests.
//!
//! No implicit renewal exists: a held lease is never refreshed in place.
//! "Renewing" a lock is re-acquiring it, which is indistinguishable from a
//! different holder acquiring it after expiry, this is intentional and
//! keeps the acquisition algorithm to a single `find_one_and_update`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use chrono::Duration as ChronoDuration;
//! use mongofleet_driver::{MongoClient, SystemTimeSource};
//! use mongofleet_lock::LockManager;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(client: MongoClient) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = LockManager::new(&client, "_locks", "proc-1", Arc::new(SystemTimeSource));
//!
//! if let Some(handle) = manager.try_acquire("nightly-report", ChronoDuration::minutes(5)).await? {
//!     // ... do work while handle.is_valid() ...
//!     handle.release().await?;
//! }
//!
//! let handle = manager
//!     .acquire("nightly-report", ChronoDuration::minutes(5), Duration::from_millis(500), &CancellationToken::new())
//!     .await?;
//! handle.ensure_valid()?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod handle;
pub mod manager;

pub use document::LockDocument;
pub use error::{LockError, LockResult};
pub use handle::LockHandle;
pub use manager::{DEFAULT_LEASE, DEFAULT_RETRY_DELAY, LockManager, random_holder_id};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::document::LockDocument;
    pub use crate::error::{LockError, LockResult};
    pub use crate::handle::LockHandle;
    pub use crate::manager::{DEFAULT_LEASE, DEFAULT_RETRY_DELAY, LockManager, random_holder_id};
}
