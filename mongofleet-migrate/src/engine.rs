//! `MigrationRunner`: runs pending migrations exactly once across a fleet.
//!
//! A run is gated by a single named [`mongofleet_lock::LockManager`] lock;
//! migrations execute in id order, and each is optionally wrapped in a
//! `mongodb` session/transaction.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mongofleet_driver::{MongoClient, TimeSource};
use mongofleet_lock::LockManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, MigrateResult};
use crate::history::{HistoryStore, MigrationHistoryItem};
use crate::migration::MigrationSet;

/// Default name of the lock serializing migration runs across a fleet.
pub const DEFAULT_MIGRATIONS_LOCK_NAME: &str = "ChaosMongoMigrations";

/// Default collection used to record applied migrations.
pub const DEFAULT_HISTORY_COLLECTION: &str = "_migrations";

/// Default lease held by the process currently running migrations.
pub const DEFAULT_MIGRATION_LOCK_LEASE: Duration = Duration::minutes(10);

/// Outcome of a single [`MigrationRunner::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRunSummary {
    /// Ids of migrations applied during this run, in execution order.
    pub applied_ids: Vec<String>,
    /// Total wall-clock time spent inside `apply` calls, summed across the
    /// run, in milliseconds.
    pub total_duration_ms: i64,
}

impl MigrationRunSummary {
    /// A run that did no work: the lock was held by another process, or
    /// there was nothing pending.
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Count of migrations applied during the run.
    pub fn applied_count(&self) -> usize {
        self.applied_ids.len()
    }
}

/// Configuration for a [`MigrationRunner`].
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Name of the lock used to serialize migration runs.
    pub migrations_lock_name: String,
    /// Collection recording applied migrations.
    pub migration_history_collection_name: String,
    /// Lease held for the duration of a run.
    pub migration_lock_lease_time: Duration,
    /// Whether to wrap each migration in a transaction when the deployment
    /// supports one.
    pub use_transactions_for_migrations_if_available: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            migrations_lock_name: DEFAULT_MIGRATIONS_LOCK_NAME.to_string(),
            migration_history_collection_name: DEFAULT_HISTORY_COLLECTION.to_string(),
            migration_lock_lease_time: DEFAULT_MIGRATION_LOCK_LEASE,
            use_transactions_for_migrations_if_available: true,
        }
    }
}

/// Applies an ordered set of migrations under a single named lock,
/// recording each one in a history collection exactly once.
pub struct MigrationRunner {
    client: MongoClient,
    lock_manager: LockManager,
    history: HistoryStore,
    migrations: MigrationSet,
    options: MigrationOptions,
    time_source: Arc<dyn TimeSource>,
}

impl MigrationRunner {
    /// Build a runner over `migrations`, using `lock_manager` to serialize
    /// runs and `client`'s database for the history collection.
    /// `applied_utc` is stamped through `time_source` rather than reading
    /// the wall clock directly.
    pub fn new(
        client: MongoClient,
        lock_manager: LockManager,
        migrations: MigrationSet,
        options: MigrationOptions,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let history = HistoryStore::new(&client, &options.migration_history_collection_name);
        Self {
            client,
            lock_manager,
            history,
            migrations,
            options,
            time_source,
        }
    }

    /// Run every pending migration in id order.
    ///
    /// If the migration lock cannot be acquired, another process is already
    /// migrating: this is logged and treated as success, not an error. If
    /// the set has no pending migrations, returns immediately.
    pub async fn run(&self, cancel: &CancellationToken) -> MigrateResult<MigrationRunSummary> {
        let lock = match self
            .lock_manager
            .try_acquire(
                &self.options.migrations_lock_name,
                self.options.migration_lock_lease_time,
            )
            .await?
        {
            Some(lock) => lock,
            None => {
                info!(
                    lock = %self.options.migrations_lock_name,
                    "migration lock held by another process, skipping run"
                );
                return Ok(MigrationRunSummary::skipped());
            }
        };

        let applied = self.history.applied_ids().await?;
        let pending: Vec<_> = self
            .migrations
            .sorted()
            .iter()
            .filter(|m| !applied.contains(m.id()))
            .cloned()
            .collect();

        if pending.is_empty() {
            debug!("no pending migrations");
            let _ = lock.release().await;
            return Ok(MigrationRunSummary::skipped());
        }

        info!(count = pending.len(), "applying pending migrations");

        let mut summary = MigrationRunSummary::default();

        for migration in pending {
            if cancel.is_cancelled() {
                let _ = lock.release().await;
                return Err(MigrateError::Cancelled);
            }

            if lock.ensure_valid().is_err() {
                let _ = lock.release().await;
                return Err(MigrateError::LockExpired(lock.name().to_string()));
            }

            let mut session = self.try_start_session().await;

            let started = std::time::Instant::now();
            let apply_result = migration
                .apply(&self.client, session.as_mut(), cancel)
                .await;
            let duration_ms = started.elapsed().as_millis() as i64;

            if let Err(err) = apply_result {
                if let Some(mut session) = session {
                    let _ = session.abort_transaction().await;
                }
                let _ = lock.release().await;
                return Err(err);
            }

            if lock.ensure_valid().is_err() {
                if let Some(mut session) = session {
                    let _ = session.abort_transaction().await;
                }
                let _ = lock.release().await;
                return Err(MigrateError::LockExpired(lock.name().to_string()));
            }

            let item = MigrationHistoryItem {
                id: migration.id().to_string(),
                applied_utc: bson::DateTime::from_chrono(self.time_source.now()),
                duration_ms,
                description: migration.description().map(|d| d.to_string()),
            };

            let record_result = match session.as_mut() {
                Some(session) => self.history.record(&item, Some(session)).await,
                None => self.history.record(&item, None).await,
            };

            if let Err(err) = record_result {
                if let Some(mut session) = session {
                    let _ = session.abort_transaction().await;
                }
                let _ = lock.release().await;
                return Err(err);
            }

            if let Some(mut session) = session {
                if let Err(err) = session.commit_transaction().await {
                    let _ = lock.release().await;
                    return Err(MigrateError::Driver(mongofleet_driver::MongoError::from(err)));
                }
            }

            info!(id = %migration.id(), duration_ms, "migration applied");
            summary.applied_ids.push(migration.id().to_string());
            summary.total_duration_ms += duration_ms;
        }

        let _ = lock.release().await;
        Ok(summary)
    }

    /// Start a session/transaction when enabled and supported. A failed
    /// transaction start is downgraded to "no session," never fatal,
    /// equivalent to the option being disabled.
    async fn try_start_session(&self) -> Option<mongodb::ClientSession> {
        if !self.options.use_transactions_for_migrations_if_available {
            return None;
        }

        match self.client.start_session().await {
            Ok(mut session) => match session.start_transaction(None).await {
                Ok(()) => Some(session),
                Err(err) => {
                    warn!(error = %err, "transactions unsupported, continuing without a session");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "could not start session, continuing without one");
                None
            }
        }
    }
}

/// How long to wait between `run` retries when driving migrations on a
/// cadence (used by the hosted-service lifecycle, not by `run` itself).
pub const RETRY_DELAY: StdDuration = StdDuration::from_millis(500);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_have_expected_values() {
        let options = MigrationOptions::default();
        assert_eq!(options.migrations_lock_name, "ChaosMongoMigrations");
        assert_eq!(options.migration_history_collection_name, "_migrations");
        assert_eq!(options.migration_lock_lease_time, Duration::minutes(10));
        assert!(options.use_transactions_for_migrations_if_available);
    }

    #[test]
    fn skipped_summary_has_no_applied_ids() {
        let summary = MigrationRunSummary::skipped();
        assert_eq!(summary.applied_count(), 0);
        assert_eq!(summary.total_duration_ms, 0);
    }
}
