//! The `Migration` trait and an ordered, deduplicated `MigrationSet`.
//!
//! A migration here is arbitrary code against the database helper, applied
//! through an `async fn apply` callback, not a declarative schema diff.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::ClientSession;
use mongofleet_driver::MongoClient;
use tokio_util::sync::CancellationToken;

use crate::error::MigrateResult;

/// A single idempotent unit of schema or data change.
///
/// Implementors must ensure `apply` can run to completion more than once
/// without corrupting state if a crash happens between a successful apply
/// and its history write. The runner only guarantees that a migration
/// whose id is already recorded will not be re-applied, not that `apply`
/// itself is transactional with the history write when no database
/// transaction is available.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique identifier; migrations are ordered by lexicographic
    /// (ordinal) comparison of this string.
    fn id(&self) -> &str;

    /// Optional human-readable description, recorded in history.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Apply the migration. `session` is `Some` only when
    /// `use_transactions_for_migrations_if_available` is set and the
    /// deployment supports transactions.
    async fn apply(
        &self,
        client: &MongoClient,
        session: Option<&mut ClientSession>,
        cancel: &CancellationToken,
    ) -> MigrateResult<()>;
}

/// An ordered, duplicate-free collection of migrations.
///
/// Built once at construction time; migrations are sorted by
/// [`Migration::id`] using ordinal string comparison, giving a total order.
pub struct MigrationSet {
    migrations: Vec<Arc<dyn Migration>>,
}

impl MigrationSet {
    /// Sort `migrations` by id and build a set.
    ///
    /// Fails with [`crate::error::MigrateError::DuplicateId`] if two
    /// migrations share an id, rather than letting the database's own
    /// uniqueness constraint surface a confusing duplicate-key error deep
    /// in a run.
    pub fn new(migrations: Vec<Arc<dyn Migration>>) -> MigrateResult<Self> {
        let mut sorted = migrations;
        sorted.sort_by(|a, b| a.id().cmp(b.id()));

        for pair in sorted.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(crate::error::MigrateError::DuplicateId(
                    pair[0].id().to_string(),
                ));
            }
        }

        Ok(Self { migrations: sorted })
    }

    /// Migrations in sorted (execution) order.
    pub fn sorted(&self) -> &[Arc<dyn Migration>] {
        &self.migrations
    }

    /// True if the set has no migrations.
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Number of registered migrations.
    pub fn len(&self) -> usize {
        self.migrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: String,
        order: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Migration for Dummy {
        fn id(&self) -> &str {
            &self.id
        }

        async fn apply(
            &self,
            _client: &MongoClient,
            _session: Option<&mut ClientSession>,
            _cancel: &CancellationToken,
        ) -> MigrateResult<()> {
            self.order.lock().unwrap().push(self.id.clone());
            Ok(())
        }
    }

    #[test]
    fn sorts_by_id_lexicographically() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let migrations: Vec<Arc<dyn Migration>> = vec![
            Arc::new(Dummy { id: "003_Third".to_string(), order: order.clone() }),
            Arc::new(Dummy { id: "001_First".to_string(), order: order.clone() }),
            Arc::new(Dummy { id: "002_Second".to_string(), order: order.clone() }),
        ];

        let set = MigrationSet::new(migrations).unwrap();
        let ids: Vec<&str> = set.sorted().iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["001_First", "002_Second", "003_Third"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let migrations: Vec<Arc<dyn Migration>> = vec![
            Arc::new(Dummy { id: "001".to_string(), order: order.clone() }),
            Arc::new(Dummy { id: "001".to_string(), order: order.clone() }),
        ];

        let err = MigrationSet::new(migrations).unwrap_err();
        assert!(matches!(err, crate::error::MigrateError::DuplicateId(_)));
    }

    #[test]
    fn empty_set_is_empty() {
        let set = MigrationSet::new(Vec::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
