//! `MongoFleetLifecycle`: the hosted-service lifecycle aggregator.
//!
//! At `starting` it may run the migration runner and any registered
//! configurators; at `started`/`stopping` it starts/stops every
//! auto-start subscription handed to it. Framework-specific glue (an
//! actix/axum `IntoHostedService`-style adapter) is left to the downstream
//! application, this crate only owns the ordering and the `tokio`-task
//! bookkeeping, the async equivalent of a `JoinSet`-managed background
//! service host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mongofleet_driver::MongoClient;
use mongofleet_migrate::MigrationRunner;
use mongofleet_queue::{QueueError, QueueResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::options::MongoFleetOptions;

/// How long `on_stopping` waits for subscriptions to stop before giving up
/// and returning anyway (subscriptions keep running and will observe
/// cancellation later; see `mongofleet_queue::Subscription::stop`).
const STOP_WAIT_BUDGET: Duration = Duration::from_secs(30);

/// A one-shot piece of startup configuration run before migrations, such as
/// ensuring indexes that aren't owned by a specific migration.
///
/// Peripheral plumbing: a `Configurator` is arbitrary code, not a declarative
/// DSL.
#[async_trait]
pub trait Configurator: Send + Sync {
    /// Run this configurator against `client`.
    async fn configure(&self, client: &MongoClient) -> QueueResult<()>;
}

/// Object-safe handle to one subscribed queue, erasing its payload type so
/// a [`MongoFleetLifecycle`] can hold subscriptions over distinct payloads
/// in a single `Vec`.
#[async_trait]
pub trait ManagedSubscription: Send + Sync {
    /// Ensure the runnable-item index and start the watcher/processor
    /// tasks.
    async fn start(&self) -> QueueResult<()>;

    /// Stop the watcher/processor tasks, bounded by `wait_budget`.
    async fn stop(&self, wait_budget: &CancellationToken) -> QueueResult<()>;
}

#[async_trait]
impl<P> ManagedSubscription for mongofleet_queue::Subscription<P>
where
    P: serde::de::DeserializeOwned + serde::Serialize + Unpin + Send + Sync + 'static,
{
    async fn start(&self) -> QueueResult<()> {
        mongofleet_queue::Subscription::start(self).await
    }

    async fn stop(&self, wait_budget: &CancellationToken) -> QueueResult<()> {
        mongofleet_queue::Subscription::stop(self, wait_budget).await
    }
}

/// Aggregates the migration runner, startup configurators, and every
/// auto-start subscription behind a single `starting`/`started`/`stopping`
/// lifecycle, the shape a hosted-service host (actix, axum, a bare
/// `tokio::main`) drives.
pub struct MongoFleetLifecycle {
    options: MongoFleetOptions,
    migration_runner: Option<Arc<MigrationRunner>>,
    configurators: Vec<Arc<dyn Configurator>>,
    subscriptions: Vec<Arc<dyn ManagedSubscription>>,
}

impl MongoFleetLifecycle {
    /// Build an aggregator with no migration runner, configurators, or
    /// subscriptions yet attached.
    pub fn new(options: MongoFleetOptions) -> Self {
        Self {
            options,
            migration_runner: None,
            configurators: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Attach the migration runner [`on_starting`](Self::on_starting) runs
    /// when `apply_migrations_on_startup` is set.
    pub fn with_migration_runner(mut self, runner: Arc<MigrationRunner>) -> Self {
        self.migration_runner = Some(runner);
        self
    }

    /// Register a configurator [`on_starting`](Self::on_starting) runs when
    /// `run_configurators_on_startup` is set. Configurators run in
    /// registration order.
    pub fn with_configurator(mut self, configurator: Arc<dyn Configurator>) -> Self {
        self.configurators.push(configurator);
        self
    }

    /// Register a subscription to be started in
    /// [`on_started`](Self::on_started) and stopped in
    /// [`on_stopping`](Self::on_stopping).
    pub fn with_subscription(mut self, subscription: Arc<dyn ManagedSubscription>) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Run at host startup, before [`on_started`](Self::on_started): applies
    /// pending migrations (if `apply_migrations_on_startup`) and runs
    /// configurators in order (if `run_configurators_on_startup`).
    pub async fn on_starting(&self, client: &MongoClient) -> QueueResult<()> {
        if self.options.apply_migrations_on_startup {
            if let Some(runner) = &self.migration_runner {
                info!("running pending migrations at startup");
                let summary = runner
                    .run(&CancellationToken::new())
                    .await
                    .map_err(|e| QueueError::configuration(e.to_string()))?;
                info!(applied = summary.applied_count(), "migrations at startup complete");
            }
        }

        if self.options.run_configurators_on_startup {
            for configurator in &self.configurators {
                configurator.configure(client).await?;
            }
        }

        Ok(())
    }

    /// Run once the host has finished starting: starts every registered
    /// subscription. A failure to start one subscription is logged and does
    /// not prevent the others from starting; the first error encountered is
    /// returned after every subscription has had a chance to start.
    pub async fn on_started(&self) -> QueueResult<()> {
        let mut first_error = None;
        for subscription in &self.subscriptions {
            if let Err(err) = subscription.start().await {
                error!(error = %err, "failed to start subscription");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run while the host is shutting down: stops every registered
    /// subscription, each bounded by [`STOP_WAIT_BUDGET`].
    pub async fn on_stopping(&self) -> QueueResult<()> {
        for subscription in &self.subscriptions {
            let wait_budget = CancellationToken::new();
            let guard = wait_budget.clone();
            tokio::spawn(async move {
                tokio::time::sleep(STOP_WAIT_BUDGET).await;
                guard.cancel();
            });

            if let Err(err) = subscription.stop(&wait_budget).await {
                error!(error = %err, "failed to stop subscription cleanly");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_wait_budget_is_thirty_seconds() {
        assert_eq!(STOP_WAIT_BUDGET, Duration::from_secs(30));
    }

    #[test]
    fn lifecycle_starts_with_no_subscriptions_or_configurators() {
        let options = MongoFleetOptions::builder("mongodb://localhost:27017")
            .build()
            .unwrap();
        let lifecycle = MongoFleetLifecycle::new(options);
        assert!(lifecycle.subscriptions.is_empty());
        assert!(lifecycle.configurators.is_empty());
        assert!(lifecycle.migration_runner.is_none());
    }
}
