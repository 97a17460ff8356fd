//! Error types for the migration runner.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that can occur while registering or running migrations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Two migrations in the same [`crate::migration::MigrationSet`] share an
    /// id. Ordering and the history collection's primary key both require
    /// uniqueness, so this is rejected at construction time instead of being
    /// left to corrupt a later run.
    #[error("duplicate migration id: '{0}'")]
    DuplicateId(String),

    /// The run's lock was found invalid before or after applying a
    /// migration. A run that lost its lock mid-flight must not record
    /// history, since another process may already be applying the same
    /// pending migrations.
    #[error("lock '{0}' expired during migration run")]
    LockExpired(String),

    /// A migration's `apply` call failed. The run stops; migrations already
    /// recorded in this run remain applied.
    #[error("migration '{id}' failed: {source}")]
    ApplyFailed {
        /// The migration that failed.
        id: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The caller's cancellation token fired.
    #[error("migration run cancelled")]
    Cancelled,

    /// The lock manager reported an error unrelated to contention.
    #[error("lock error: {0}")]
    Lock(#[from] mongofleet_lock::LockError),

    /// The underlying driver call failed.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongofleet_driver::MongoError),
}

impl MigrateError {
    /// Wrap a migration's `apply` failure, tagging it with the migration id.
    pub fn apply_failed(
        id: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ApplyFailed {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// True if this is the "lock expired mid-run" variant.
    pub fn is_lock_expired(&self) -> bool {
        matches!(self, Self::LockExpired(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_display_includes_id() {
        let err = MigrateError::DuplicateId("003_add_index".to_string());
        assert!(err.to_string().contains("003_add_index"));
    }

    #[test]
    fn lock_expired_is_recognized() {
        let err = MigrateError::LockExpired("ChaosMongoMigrations".to_string());
        assert!(err.is_lock_expired());
        assert!(!MigrateError::Cancelled.is_lock_expired());
    }
}
