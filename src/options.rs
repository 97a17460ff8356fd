//! `MongoFleetOptions`: the configuration surface for connecting and
//! tuning a [`crate::MongoFleet`], built through a fluent builder in the
//! same style as `MongoConfigBuilder`/`MigrationOptions`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use mongodb::options::ClientOptions;
use mongofleet_lock::random_holder_id;
use mongofleet_migrate::engine::{
    DEFAULT_HISTORY_COLLECTION, DEFAULT_MIGRATIONS_LOCK_NAME, DEFAULT_MIGRATION_LOCK_LEASE,
};

use crate::error::{ConfigError, ConfigResult};

/// Default name of the lock collection.
pub const DEFAULT_LOCK_COLLECTION: &str = "_locks";

/// A hook that mutates driver-level client options before the connection is
/// established.
pub type ClientSettingsHook = Arc<dyn Fn(&mut ClientOptions) + Send + Sync>;

/// Validated configuration for a `mongofleet`-backed application.
///
/// Built via [`MongoFleetOptionsBuilder`]; construct one with
/// [`MongoFleetOptions::builder`].
#[derive(Clone)]
pub struct MongoFleetOptions {
    /// Connection URL, including an optional database name.
    pub url: String,
    /// Overrides the database named in `url`, if any.
    pub default_database: Option<String>,
    /// Type-to-collection-name map, keyed by `std::any::type_name::<T>()`.
    pub collection_type_map: HashMap<String, String>,
    /// When true, an unmapped type falls back to its short Rust type name.
    pub use_default_collection_names: bool,
    /// Lock holder identifier. Defaults to a fresh random id per process.
    pub holder_id: String,
    /// Name of the lock collection.
    pub lock_collection_name: String,
    /// Name of the migration history collection.
    pub migration_history_collection_name: String,
    /// Name of the lock serializing migration runs across a fleet.
    pub migrations_lock_name: String,
    /// Lease held for the duration of a migration run.
    pub migration_lock_lease_time: Duration,
    /// Whether the hosted lifecycle runs migrations at startup.
    pub apply_migrations_on_startup: bool,
    /// Whether the hosted lifecycle runs configurators at startup.
    pub run_configurators_on_startup: bool,
    /// Whether a single migration is wrapped in a transaction when the
    /// deployment supports one.
    pub use_transactions_for_migrations_if_available: bool,
    /// Optional hook to mutate driver `ClientOptions` before connecting.
    pub configure_client_settings: Option<ClientSettingsHook>,
}

impl std::fmt::Debug for MongoFleetOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoFleetOptions")
            .field("url", &self.url)
            .field("default_database", &self.default_database)
            .field("collection_type_map", &self.collection_type_map)
            .field(
                "use_default_collection_names",
                &self.use_default_collection_names,
            )
            .field("holder_id", &self.holder_id)
            .field("lock_collection_name", &self.lock_collection_name)
            .field(
                "migration_history_collection_name",
                &self.migration_history_collection_name,
            )
            .field("migrations_lock_name", &self.migrations_lock_name)
            .field("migration_lock_lease_time", &self.migration_lock_lease_time)
            .field(
                "apply_migrations_on_startup",
                &self.apply_migrations_on_startup,
            )
            .field(
                "run_configurators_on_startup",
                &self.run_configurators_on_startup,
            )
            .field(
                "use_transactions_for_migrations_if_available",
                &self.use_transactions_for_migrations_if_available,
            )
            .field(
                "configure_client_settings",
                &self.configure_client_settings.is_some(),
            )
            .finish()
    }
}

impl MongoFleetOptions {
    /// Start building options for connection `url`.
    pub fn builder(url: impl Into<String>) -> MongoFleetOptionsBuilder {
        MongoFleetOptionsBuilder::new(url)
    }
}

/// Fluent builder for [`MongoFleetOptions`].
#[derive(Debug, Default)]
pub struct MongoFleetOptionsBuilder {
    url: Option<String>,
    default_database: Option<String>,
    collection_type_map: HashMap<String, String>,
    use_default_collection_names: bool,
    holder_id: Option<String>,
    lock_collection_name: Option<String>,
    migration_history_collection_name: Option<String>,
    migrations_lock_name: Option<String>,
    migration_lock_lease_time: Option<Duration>,
    apply_migrations_on_startup: bool,
    run_configurators_on_startup: bool,
    use_transactions_for_migrations_if_available: Option<bool>,
    configure_client_settings: Option<ClientSettingsHook>,
}

impl MongoFleetOptionsBuilder {
    /// Start a builder for connection `url`. `use_default_collection_names`
    /// and `use_transactions_for_migrations_if_available` default to `true`;
    /// `build()` resolves the remaining defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            use_default_collection_names: true,
            ..Default::default()
        }
    }

    /// Override the database named in the connection URL.
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    /// Map `T` to an explicit collection name, overriding the default-name
    /// fallback.
    pub fn map_collection<T: 'static>(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_type_map
            .insert(std::any::type_name::<T>().to_string(), collection_name.into());
        self
    }

    /// Whether an unmapped type falls back to its short Rust type name.
    /// Default `true`.
    pub fn use_default_collection_names(mut self, enabled: bool) -> Self {
        self.use_default_collection_names = enabled;
        self
    }

    /// Set an explicit lock holder identifier. Defaults to a fresh random
    /// id, chosen once when `build()` is called.
    pub fn holder_id(mut self, holder_id: impl Into<String>) -> Self {
        self.holder_id = Some(holder_id.into());
        self
    }

    /// Override the lock collection name. Default `_locks`.
    pub fn lock_collection_name(mut self, name: impl Into<String>) -> Self {
        self.lock_collection_name = Some(name.into());
        self
    }

    /// Override the migration history collection name. Default
    /// `_migrations`.
    pub fn migration_history_collection_name(mut self, name: impl Into<String>) -> Self {
        self.migration_history_collection_name = Some(name.into());
        self
    }

    /// Override the name of the lock serializing migration runs. Default
    /// `ChaosMongoMigrations`.
    pub fn migrations_lock_name(mut self, name: impl Into<String>) -> Self {
        self.migrations_lock_name = Some(name.into());
        self
    }

    /// Override the migration lock's lease duration. Default 10 minutes.
    pub fn migration_lock_lease_time(mut self, lease: Duration) -> Self {
        self.migration_lock_lease_time = Some(lease);
        self
    }

    /// Whether the hosted lifecycle runs migrations at startup. Default
    /// `false`.
    pub fn apply_migrations_on_startup(mut self, enabled: bool) -> Self {
        self.apply_migrations_on_startup = enabled;
        self
    }

    /// Whether the hosted lifecycle runs configurators at startup. Default
    /// `false`.
    pub fn run_configurators_on_startup(mut self, enabled: bool) -> Self {
        self.run_configurators_on_startup = enabled;
        self
    }

    /// Whether a single migration is wrapped in a transaction when the
    /// deployment supports one. Default `true`.
    pub fn use_transactions_for_migrations_if_available(mut self, enabled: bool) -> Self {
        self.use_transactions_for_migrations_if_available = Some(enabled);
        self
    }

    /// Supply a hook that mutates driver `ClientOptions` before connecting.
    pub fn configure_client_settings(
        mut self,
        hook: impl Fn(&mut ClientOptions) + Send + Sync + 'static,
    ) -> Self {
        self.configure_client_settings = Some(Arc::new(hook));
        self
    }

    /// Validate and build [`MongoFleetOptions`].
    ///
    /// Fails with [`ConfigError::Invalid`] if `url` is unset/empty, or any
    /// `collection_type_map` value is empty or whitespace-only.
    pub fn build(self) -> ConfigResult<MongoFleetOptions> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::invalid("url must be set"))?;

        for (type_name, collection_name) in &self.collection_type_map {
            if collection_name.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "collection_type_map entry for '{type_name}' must not be empty"
                )));
            }
        }

        Ok(MongoFleetOptions {
            url,
            default_database: self.default_database,
            collection_type_map: self.collection_type_map,
            use_default_collection_names: self.use_default_collection_names,
            holder_id: self.holder_id.unwrap_or_else(random_holder_id),
            lock_collection_name: self
                .lock_collection_name
                .unwrap_or_else(|| DEFAULT_LOCK_COLLECTION.to_string()),
            migration_history_collection_name: self
                .migration_history_collection_name
                .unwrap_or_else(|| DEFAULT_HISTORY_COLLECTION.to_string()),
            migrations_lock_name: self
                .migrations_lock_name
                .unwrap_or_else(|| DEFAULT_MIGRATIONS_LOCK_NAME.to_string()),
            migration_lock_lease_time: self
                .migration_lock_lease_time
                .unwrap_or(DEFAULT_MIGRATION_LOCK_LEASE),
            apply_migrations_on_startup: self.apply_migrations_on_startup,
            run_configurators_on_startup: self.run_configurators_on_startup,
            use_transactions_for_migrations_if_available: self
                .use_transactions_for_migrations_if_available
                .unwrap_or(true),
            configure_client_settings: self.configure_client_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_url() {
        let err = MongoFleetOptionsBuilder::default().build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn build_fails_on_whitespace_url() {
        let err = MongoFleetOptions::builder("   ").build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn defaults_have_expected_values() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017")
            .build()
            .unwrap();

        assert_eq!(options.lock_collection_name, "_locks");
        assert_eq!(options.migration_history_collection_name, "_migrations");
        assert_eq!(options.migrations_lock_name, "ChaosMongoMigrations");
        assert_eq!(options.migration_lock_lease_time, Duration::minutes(10));
        assert!(options.use_default_collection_names);
        assert!(!options.apply_migrations_on_startup);
        assert!(!options.run_configurators_on_startup);
        assert!(options.use_transactions_for_migrations_if_available);
        assert!(!options.holder_id.is_empty());
    }

    #[test]
    fn rejects_empty_collection_type_map_entry() {
        struct Widget;
        let err = MongoFleetOptions::builder("mongodb://localhost:27017")
            .map_collection::<Widget>("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn distinct_builds_get_distinct_random_holder_ids() {
        let a = MongoFleetOptions::builder("mongodb://localhost:27017")
            .build()
            .unwrap();
        let b = MongoFleetOptions::builder("mongodb://localhost:27017")
            .build()
            .unwrap();
        assert_ne!(a.holder_id, b.holder_id);
    }

    #[test]
    fn explicit_holder_id_is_kept() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017")
            .holder_id("proc-1")
            .build()
            .unwrap();
        assert_eq!(options.holder_id, "proc-1");
    }
}
