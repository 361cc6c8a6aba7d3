//! Per-observer subscription task.
//!
//! `LiveViewSynchronizer::subscribe` spawns one task per observer. The task
//! owns the store feed and the cached snapshot; the observer only sees
//! `ViewUpdate`s through its `Subscription`.

use crate::{LiveSnapshot, ObserverRole, SyncState, ViewUpdate};
use award_store::{
    CategoryFilter, ChangeFeed, Collection, DataStore, FeedMessage, StoreChange, StoreError,
    SubscriptionStatus,
};
use award_types::{CategoryId, Tally};
use award_utils::BackoffPolicy;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

const COLLECTIONS: [Collection; 2] = [Collection::Categories, Collection::Votes];

pub struct LiveViewSynchronizer {
    store: Arc<dyn DataStore>,
    reconnect: BackoffPolicy,
}

impl LiveViewSynchronizer {
    /// `reconnect` drives both the per-call timeout and the delay between
    /// resubscription attempts.
    pub fn new(store: Arc<dyn DataStore>, reconnect: BackoffPolicy) -> Self {
        Self { store, reconnect }
    }

    /// Start following the store for one observer. Must be called from
    /// within a tokio runtime.
    pub fn subscribe(&self, role: ObserverRole) -> Subscription {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            store: Arc::clone(&self.store),
            policy: self.reconnect.clone(),
            updates: updates_tx,
            snapshot: LiveSnapshot::default(),
            failures: 0,
        };
        let span = tracing::info_span!("live_view", role = ?role);
        let task = tokio::spawn(worker.run(shutdown_rx).instrument(span));

        Subscription {
            updates: updates_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running observer. Dropping it aborts the task.
pub struct Subscription {
    updates: mpsc::UnboundedReceiver<ViewUpdate>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Next update, or `None` once the observer reached a terminal state.
    pub async fn next(&mut self) -> Option<ViewUpdate> {
        self.updates.recv().await
    }

    /// Stop the observer and wait for its task to release the store feed.
    /// Nothing is delivered after this returns, including pending backoff
    /// timers.
    pub async fn unsubscribe(mut self) {
        self.updates.close();
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("live view task panicked during unsubscribe");
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Worker {
    store: Arc<dyn DataStore>,
    policy: BackoffPolicy,
    updates: mpsc::UnboundedSender<ViewUpdate>,
    snapshot: LiveSnapshot,
    /// Consecutive failed connection attempts.
    failures: u32,
}

impl Worker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.transition(SyncState::Connecting);

        loop {
            let reason = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                reason = self.follow() => reason,
            };

            self.failures += 1;
            if !self.policy.allows_another(self.failures) {
                warn!(attempts = self.failures, %reason, "giving up on live view");
                self.transition(SyncState::Disconnected);
                return;
            }

            let delay = self.policy.delay_for(self.failures);
            warn!(
                attempt = self.failures,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "live view lost, reconnecting"
            );
            self.transition(SyncState::Reconnecting {
                attempt: self.failures,
            });

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("live view closed");
        self.transition(SyncState::Closed);
    }

    /// Subscribe, pull, then apply changes until the feed fails. Returns the
    /// reason the session ended.
    async fn follow(&mut self) -> String {
        let mut feed = match self.open_feed().await {
            Ok(feed) => feed,
            Err(reason) => return reason,
        };

        if let Err(e) = self.pull().await {
            return format!("snapshot pull failed: {e}");
        }
        self.failures = 0;

        loop {
            match feed.next().await {
                Some(FeedMessage::Change(change)) => self.apply(change).await,
                Some(FeedMessage::Status(SubscriptionStatus::Subscribed)) => {}
                Some(FeedMessage::Status(status)) => return format!("feed reported {status:?}"),
                None => return "feed ended".to_string(),
            }
        }
    }

    async fn open_feed(&self) -> Result<ChangeFeed, String> {
        let mut feed = self
            .timed("subscribe", self.store.subscribe(&COLLECTIONS))
            .await
            .map_err(|e| format!("subscribe failed: {e}"))?;

        match tokio::time::timeout(self.policy.call_timeout(), feed.next()).await {
            Ok(Some(FeedMessage::Status(SubscriptionStatus::Subscribed))) => Ok(feed),
            Ok(Some(other)) => Err(format!("unexpected first feed message: {other:?}")),
            Ok(None) => Err("feed ended before subscribing".to_string()),
            Err(_) => Err("timed out waiting for subscription".to_string()),
        }
    }

    /// Replace the cached snapshot with an authoritative read.
    async fn pull(&mut self) -> Result<(), StoreError> {
        let categories = self
            .timed("list_categories", self.store.list_categories(CategoryFilter::All))
            .await?;

        let mut parts = Vec::with_capacity(categories.len());
        for category in categories {
            let tally = self.fetch_tally(category.id).await.unwrap_or_else(|e| {
                warn!(category = %category.id, error = %e, "tally unavailable, showing zero");
                Tally::zeroed()
            });
            parts.push((category, tally));
        }

        self.snapshot = LiveSnapshot::from_parts(parts);
        info!(categories = self.snapshot.len(), "live view subscribed");
        self.transition(SyncState::Subscribed);
        self.emit(ViewUpdate::Snapshot(self.snapshot.clone()));
        self.check_consistency();
        Ok(())
    }

    async fn apply(&mut self, change: StoreChange) {
        match change {
            StoreChange::Category(event) => {
                // The event only says which row changed. A late event can
                // carry an outdated record, so merge the current row instead.
                let category_id = event.new.id;
                let current = match self
                    .timed("get_category", self.store.get_category(category_id))
                    .await
                {
                    Ok(current) => current,
                    Err(e) => {
                        warn!(category = %category_id, error = %e, "category re-read failed, keeping cached record");
                        return;
                    }
                };
                if current != event.new {
                    debug!(category = %category_id, "category event was stale");
                }

                let merged = self.snapshot.merge_category(current).clone();
                debug!(
                    category = %merged.category.id,
                    unlocked = merged.category.is_unlocked,
                    "category merged"
                );
                self.emit(ViewUpdate::CategoryMerged(merged));
                self.check_consistency();
            }
            StoreChange::Vote(event) => {
                // Recount from the store; notifications may arrive out of order.
                let category_id = event.new.category_id;
                match self.fetch_tally(category_id).await {
                    Ok(tally) => {
                        if self.snapshot.set_tally(category_id, tally) {
                            self.emit(ViewUpdate::TallyRecomputed { category_id, tally });
                        } else {
                            debug!(category = %category_id, "vote for uncached category");
                        }
                    }
                    Err(e) => {
                        warn!(category = %category_id, error = %e, "tally recompute failed, keeping previous");
                    }
                }
            }
        }
    }

    async fn fetch_tally(&self, category_id: CategoryId) -> Result<Tally, StoreError> {
        let votes = self
            .timed("votes_for", self.store.votes_for(category_id))
            .await?;
        Ok(Tally::from_votes(&votes))
    }

    fn check_consistency(&self) {
        let unlocked = self.snapshot.unlocked_ids();
        if unlocked.len() > 1 {
            warn!(?unlocked, "multiple categories unlocked");
            self.emit(ViewUpdate::Anomaly(unlocked));
        }
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let after = self.policy.call_timeout();
        tokio::time::timeout(after, call)
            .await
            .unwrap_or(Err(StoreError::Timeout { operation, after }))
    }

    fn transition(&self, state: SyncState) {
        debug!(?state, "live view state");
        self.emit(ViewUpdate::State(state));
    }

    fn emit(&self, update: ViewUpdate) {
        // The observer may already be gone.
        let _ = self.updates.send(update);
    }
}
