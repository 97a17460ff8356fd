//! # mongofleet
//!
//! Three coordinated primitives layered on a MongoDB replica set: a
//! lease-based distributed lock ([`mongofleet_lock`]), a migration runner
//! that applies an ordered sequence of idempotent migrations exactly once
//! across a fleet of processes ([`mongofleet_migrate`]), and a durable work
//! queue delivering each item to exactly one consumer
//! ([`mongofleet_queue`]).
//!
//! This crate is the facade the subsystem crates are built to be driven
//! through: [`MongoFleetOptions`] is the configuration surface,
//! [`MongoFleet`] connects and wires a [`mongofleet_lock::LockManager`]
//! and [`CollectionNameResolver`] from it, [`HandlerRegistry`] is an
//! explicit-registration handler lookup (no reflection-based discovery),
//! and [`MongoFleetLifecycle`] is the hosted-service lifecycle glue a host
//! (actix, axum, a bare `tokio::main`) drives through
//! `starting`/`started`/`stopping`. None of this plumbing is part of the
//! three coordination primitives themselves; it exists only to make them
//! usable without hand-wiring the subsystem crates together at every call
//! site.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use mongofleet::{MongoFleet, MongoFleetOptions};
//! use mongofleet_lock::DEFAULT_LEASE;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let options = MongoFleetOptions::builder("mongodb://localhost:27017/myapp").build()?;
//! let fleet = MongoFleet::connect(options).await?;
//!
//! if let Some(handle) = fleet.locks().try_acquire("nightly-report", DEFAULT_LEASE).await? {
//!     // ... do work while handle.is_valid() ...
//!     handle.release().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod collection_names;
pub mod error;
pub mod hosted;
pub mod options;
pub mod registry;

pub use collection_names::{CollectionNameResolver, default_queue_collection_name};
pub use error::{ConfigError, ConfigResult, FleetError, FleetResult};
pub use hosted::{Configurator, ManagedSubscription, MongoFleetLifecycle};
pub use options::{MongoFleetOptions, MongoFleetOptionsBuilder};
pub use registry::{HandlerRegistry, RegistryHandlerFactory};

// Re-export the subsystem crates so a downstream crate need only depend on
// `mongofleet` for the whole surface (client, locks, migrations, queues).
pub use mongofleet_driver as driver;
pub use mongofleet_lock as lock;
pub use mongofleet_migrate as migrate;
pub use mongofleet_queue as queue;

use std::sync::Arc;

use mongofleet_driver::{MongoClient, MongoConfig, TimeSource};
use mongofleet_lock::LockManager;
use mongofleet_migrate::{MigrationOptions, MigrationRunner, MigrationSet};
use mongofleet_queue::QueueDefinition;

/// A connected `mongofleet` application: a [`MongoClient`], the
/// [`LockManager`] every named lock in the process shares, and the
/// collection-name resolver built from [`MongoFleetOptions`].
///
/// Built once per process via [`MongoFleet::connect`]; cheap to clone (every
/// field is itself `Clone` and shares its underlying connection pool/state).
#[derive(Clone)]
pub struct MongoFleet {
    client: MongoClient,
    options: Arc<MongoFleetOptions>,
    lock_manager: LockManager,
    collection_names: CollectionNameResolver,
    handlers: Arc<HandlerRegistry>,
    time_source: Arc<dyn TimeSource>,
}

impl MongoFleet {
    /// Connect to the database named in `options.url` (or overridden by
    /// `options.default_database`), applying `options.configure_client_settings`
    /// to the derived `ClientOptions` if one was supplied.
    ///
    /// Fails with [`FleetError::InvalidUrl`] if the URL has no path segment
    /// naming a database and `default_database` wasn't set; with
    /// [`FleetError::Driver`] if the connection itself fails.
    pub async fn connect(options: MongoFleetOptions) -> FleetResult<Self> {
        let database = resolve_database_name(&options)?;
        let config = MongoConfig::from_uri(options.url.clone(), database);

        let client = match &options.configure_client_settings {
            Some(hook) => {
                let hook = hook.clone();
                MongoClient::with_options_hook(config, move |opts| hook(opts)).await?
            }
            None => MongoClient::new(config).await?,
        };

        let time_source: Arc<dyn TimeSource> = Arc::new(mongofleet_driver::SystemTimeSource);

        let lock_manager = LockManager::new(
            &client,
            &options.lock_collection_name,
            options.holder_id.clone(),
            time_source.clone(),
        );

        let collection_names = CollectionNameResolver::new(
            options.collection_type_map.clone(),
            options.use_default_collection_names,
        );

        Ok(Self {
            client,
            options: Arc::new(options),
            lock_manager,
            collection_names,
            handlers: Arc::new(HandlerRegistry::new()),
            time_source,
        })
    }

    /// The underlying MongoDB client.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    /// The validated options this instance was connected with.
    pub fn options(&self) -> &MongoFleetOptions {
        &self.options
    }

    /// The shared lock manager, pre-bound to `options.lock_collection_name`
    /// and `options.holder_id`.
    pub fn locks(&self) -> &LockManager {
        &self.lock_manager
    }

    /// The type-to-collection-name resolver built from
    /// `options.collection_type_map`/`options.use_default_collection_names`.
    pub fn collection_names(&self) -> &CollectionNameResolver {
        &self.collection_names
    }

    /// The process-wide handler registry backing
    /// [`RegistryHandlerFactory`]-based subscriptions.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// The time source every subsystem built through this instance is
    /// stamped with, rather than each reading the wall clock independently.
    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time_source
    }

    /// Build a [`mongofleet_queue::Publisher`] over this instance's client,
    /// stamping `created_utc` through `time_source()`.
    pub fn publisher(&self) -> mongofleet_queue::Publisher {
        mongofleet_queue::Publisher::new(self.client.clone(), self.time_source.clone())
    }

    /// Build a [`QueueDefinition`] for payload `P`, resolving its collection
    /// name from `options.collection_type_map` if mapped, otherwise from
    /// [`default_queue_collection_name`], never from
    /// `use_default_collection_names`' short-name fallback, since that
    /// policy is for named entity collections, not generated queue names.
    pub fn queue<P: 'static>(&self) -> QueueDefinition<P> {
        let collection_name = self
            .options
            .collection_type_map
            .get(std::any::type_name::<P>())
            .cloned()
            .unwrap_or_else(default_queue_collection_name::<P>);
        QueueDefinition::new(collection_name)
    }

    /// Build a [`MigrationRunner`] over `migrations`, using this instance's
    /// lock manager and `options`' migration settings.
    pub fn migration_runner(&self, migrations: MigrationSet) -> MigrationRunner {
        let runner_options = MigrationOptions {
            migrations_lock_name: self.options.migrations_lock_name.clone(),
            migration_history_collection_name: self
                .options
                .migration_history_collection_name
                .clone(),
            migration_lock_lease_time: self.options.migration_lock_lease_time,
            use_transactions_for_migrations_if_available: self
                .options
                .use_transactions_for_migrations_if_available,
        };
        MigrationRunner::new(
            self.client.clone(),
            self.lock_manager.clone(),
            migrations,
            runner_options,
            self.time_source.clone(),
        )
    }

    /// Build a [`MongoFleetLifecycle`] aggregator over this instance's
    /// options. The caller attaches a migration runner, configurators, and
    /// subscriptions before driving it through a host's
    /// starting/started/stopping hooks.
    pub fn lifecycle(&self) -> MongoFleetLifecycle {
        MongoFleetLifecycle::new((*self.options).clone())
    }
}

/// Extract the database name `options` should connect to: an explicit
/// `default_database` wins; otherwise the database path segment of
/// `options.url`.
///
/// A `mongodb://` URI's authority may list several comma-separated hosts
/// (`mongodb://a,b,c/db?replicaSet=rs0`), which a generic URL authority
/// parser rejects as an invalid host, so the database segment is located
/// by hand instead: scheme-strip, then the first `/` that starts the path
/// (skipping the `//` after the scheme), up to any `?` query string. This
/// mirrors what the `mongodb` driver's own URI parser does internally for
/// `ClientOptions::parse`, which `resolve_database_name` does not otherwise
/// duplicate.
fn resolve_database_name(options: &MongoFleetOptions) -> FleetResult<String> {
    if let Some(db) = &options.default_database {
        if !db.trim().is_empty() {
            return Ok(db.clone());
        }
    }

    let without_scheme = options
        .url
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| FleetError::InvalidUrl(format!("{} has no scheme", options.url)))?;

    let database = without_scheme
        .find('/')
        .map(|idx| &without_scheme[idx + 1..])
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("");

    if database.is_empty() {
        return Err(FleetError::InvalidUrl(format!(
            "{} has no database path segment and no default_database was set",
            options.url
        )));
    }

    Ok(database.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_database_name_prefers_default_database() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017/fromurl")
            .default_database("fromoption")
            .build()
            .unwrap();
        assert_eq!(resolve_database_name(&options).unwrap(), "fromoption");
    }

    #[test]
    fn resolve_database_name_falls_back_to_url_path() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017/fromurl")
            .build()
            .unwrap();
        assert_eq!(resolve_database_name(&options).unwrap(), "fromurl");
    }

    #[test]
    fn resolve_database_name_fails_without_either() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017")
            .build()
            .unwrap();
        let err = resolve_database_name(&options).unwrap_err();
        assert!(matches!(err, FleetError::InvalidUrl(_)));
    }

    #[test]
    fn queue_uses_mapped_collection_name_when_present() {
        struct Widget;
        let options = MongoFleetOptions::builder("mongodb://localhost:27017/app")
            .map_collection::<Widget>("widgets_queue")
            .build()
            .unwrap();

        let collection_names =
            CollectionNameResolver::new(options.collection_type_map.clone(), true);
        assert_eq!(collection_names.resolve::<Widget>().unwrap(), "widgets_queue");
    }
}
