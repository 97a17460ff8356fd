//! # mongofleet-migrate
//!
//! A migration runner that applies an ordered sequence of idempotent
//! schema/data migrations exactly once across a fleet of processes,
//! serialized by a [`mongofleet_lock::LockManager`] lock.
//!
//! This is not a schema-diffing or SQL-generation engine: a migration here
//! is a unit of arbitrary async code (implement [`Migration`]) applied
//! against a [`mongofleet_driver::MongoClient`], optionally inside a
//! transaction. Ordering is by lexicographic comparison of migration ids,
//! decided once at [`MigrationSet`] construction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use mongodb::ClientSession;
//! use mongofleet_driver::{MongoClient, SystemTimeSource};
//! use mongofleet_lock::LockManager;
//! use mongofleet_migrate::{Migration, MigrationOptions, MigrationRunner, MigrationSet, MigrateResult};
//! use tokio_util::sync::CancellationToken;
//!
//! struct CreateIndexes;
//!
//! #[async_trait]
//! impl Migration for CreateIndexes {
//!     fn id(&self) -> &str { "001_create_indexes" }
//!
//!     async fn apply(
//!         &self,
//!         client: &MongoClient,
//!         _session: Option<&mut ClientSession>,
//!         _cancel: &CancellationToken,
//!     ) -> MigrateResult<()> {
//!         client.create_index("widgets", mongofleet_driver::doc! { "sku": 1 }, true).await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn run(client: MongoClient, locks: LockManager) -> Result<(), Box<dyn std::error::Error>> {
//! let migrations = MigrationSet::new(vec![Arc::new(CreateIndexes)])?;
//! let runner = MigrationRunner::new(
//!     client,
//!     locks,
//!     migrations,
//!     MigrationOptions::default(),
//!     Arc::new(SystemTimeSource),
//! );
//! runner.run(&CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod history;
pub mod migration;

pub use engine::{
    DEFAULT_HISTORY_COLLECTION, DEFAULT_MIGRATIONS_LOCK_NAME, DEFAULT_MIGRATION_LOCK_LEASE,
    MigrationOptions, MigrationRunSummary, MigrationRunner,
};
pub use error::{MigrateError, MigrateResult};
pub use history::{HistoryStore, MigrationHistoryItem};
pub use migration::{Migration, MigrationSet};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::engine::{MigrationOptions, MigrationRunSummary, MigrationRunner};
    pub use crate::error::{MigrateError, MigrateResult};
    pub use crate::history::MigrationHistoryItem;
    pub use crate::migration::{Migration, MigrationSet};
}
