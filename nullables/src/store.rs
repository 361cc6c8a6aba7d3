//! In-memory Data Store for testing.
//!
//! Enforces the same schema constraints as the production store:
//! - one vote per `(category, identity)`
//! - at most one unlocked category
//! - votes reference an existing category
//! - a vote's option must be offered by its category
//!
//! Every call yields to the scheduler once before touching state, so
//! concurrent callers interleave the way they would against a remote store.

use async_trait::async_trait;
use award_store::{
    CategoryFilter, CategoryStore, ChangeEvent, ChangeFeed, ChangeSource, Collection,
    FeedMessage, FeedSender, StoreChange, StoreError, SubscriptionStatus, VoteStore,
    SINGLE_UNLOCKED_CONSTRAINT, VOTE_IDENTITY_CONSTRAINT,
};
use award_types::{Category, CategoryId, Identity, Vote};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct StoreState {
    categories: BTreeMap<CategoryId, Category>,
    votes: Vec<Vote>,
    /// Unlocked ids after every committed category write.
    unlocked_history: Vec<Vec<CategoryId>>,
    calls: HashMap<&'static str, u32>,
    vote_fetches: HashMap<CategoryId, u32>,
}

impl StoreState {
    fn unlocked_ids(&self) -> Vec<CategoryId> {
        self.categories
            .values()
            .filter(|c| c.is_unlocked)
            .map(|c| c.id)
            .collect()
    }

    fn record_unlocked(&mut self) {
        let ids = self.unlocked_ids();
        self.unlocked_history.push(ids);
    }
}

#[derive(Default)]
struct Faults {
    any: u32,
    by_operation: HashMap<&'static str, u32>,
    latency: Option<Duration>,
}

impl Faults {
    fn take(&mut self, operation: &'static str) -> bool {
        if let Some(left) = self.by_operation.get_mut(operation) {
            if *left > 0 {
                *left -= 1;
                return true;
            }
        }
        if self.any > 0 && operation != "subscribe" {
            self.any -= 1;
            return true;
        }
        false
    }
}

struct Feed {
    collections: Vec<Collection>,
    tx: FeedSender,
}

/// In-memory store with change notifications and fault injection.
pub struct NullStore {
    state: Mutex<StoreState>,
    feeds: Mutex<Vec<Feed>>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            feeds: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let store = Self::new();
        for category in categories {
            store.seed_category(category);
        }
        store
    }

    /// Insert a category at setup time. No change event is emitted.
    pub fn seed_category(&self, category: Category) {
        let mut state = lock(&self.state);
        state.categories.insert(category.id, category);
        state.record_unlocked();
    }

    /// Make the next `n` data calls (any operation except `subscribe`) fail
    /// with a transient error.
    pub fn fail_next(&self, n: u32) {
        lock(&self.faults).any = n;
    }

    /// Make the next `n` calls of one operation fail with a transient error.
    pub fn fail_operation(&self, operation: &'static str, n: u32) {
        lock(&self.faults).by_operation.insert(operation, n);
    }

    /// Delay every call by `latency` before it runs.
    pub fn set_latency(&self, latency: Option<Duration>) {
        lock(&self.faults).latency = latency;
    }

    /// Flip a category's flag with no constraint check, as an out-of-band
    /// writer would.
    pub fn force_unlocked(&self, id: CategoryId, unlocked: bool) {
        let change = {
            let mut state = lock(&self.state);
            let Some(category) = state.categories.get_mut(&id) else {
                return;
            };
            let old = category.clone();
            category.is_unlocked = unlocked;
            let new = category.clone();
            state.record_unlocked();
            ChangeEvent::updated(old, new)
        };
        self.publish(StoreChange::Category(change));
    }

    /// Send `status` to every open feed, then close them.
    pub fn disconnect_feeds(&self, status: SubscriptionStatus) {
        let feeds = std::mem::take(&mut *lock(&self.feeds));
        for feed in feeds {
            feed.tx.send(FeedMessage::Status(status.clone()));
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        lock(&self.state).categories.values().cloned().collect()
    }

    pub fn votes(&self) -> Vec<Vote> {
        lock(&self.state).votes.clone()
    }

    pub fn unlocked_history(&self) -> Vec<Vec<CategoryId>> {
        lock(&self.state).unlocked_history.clone()
    }

    /// Largest number of simultaneously unlocked categories ever committed.
    pub fn max_unlocked_observed(&self) -> usize {
        lock(&self.state)
            .unlocked_history
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    pub fn calls(&self, operation: &str) -> u32 {
        lock(&self.state).calls.get(operation).copied().unwrap_or(0)
    }

    pub fn vote_fetches(&self, category: CategoryId) -> u32 {
        lock(&self.state)
            .vote_fetches
            .get(&category)
            .copied()
            .unwrap_or(0)
    }

    /// Feeds whose subscriber is still listening.
    pub fn live_feeds(&self) -> usize {
        lock(&self.feeds)
            .iter()
            .filter(|f| !f.tx.is_closed())
            .count()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), StoreError> {
        *lock(&self.state).calls.entry(operation).or_insert(0) += 1;
        tokio::task::yield_now().await;

        let latency = lock(&self.faults).latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if lock(&self.faults).take(operation) {
            return Err(StoreError::Transient(format!("injected failure in {operation}")));
        }
        Ok(())
    }

    fn publish(&self, change: StoreChange) {
        let collection = change.collection();
        let mut feeds = lock(&self.feeds);
        feeds.retain(|f| !f.tx.is_closed());
        for feed in feeds.iter().filter(|f| f.collections.contains(&collection)) {
            feed.tx.send(FeedMessage::Change(change.clone()));
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryStore for NullStore {
    async fn list_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, StoreError> {
        self.enter("list_categories").await?;
        Ok(lock(&self.state)
            .categories
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError> {
        self.enter("get_category").await?;
        lock(&self.state)
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("category {id}")))
    }

    async fn update_unlocked(
        &self,
        filter: CategoryFilter,
        unlocked: bool,
    ) -> Result<Vec<Category>, StoreError> {
        self.enter("update_unlocked").await?;

        let (rows, changes) = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            let targets: Vec<CategoryId> = state
                .categories
                .values()
                .filter(|c| filter.matches(c))
                .map(|c| c.id)
                .collect();
            if let (CategoryFilter::Id(id), true) = (filter, targets.is_empty()) {
                return Err(StoreError::NotFound(format!("category {id}")));
            }
            if unlocked {
                let after = state
                    .categories
                    .values()
                    .filter(|c| c.is_unlocked || targets.contains(&c.id))
                    .count();
                if after > 1 {
                    return Err(StoreError::UniqueViolation {
                        constraint: SINGLE_UNLOCKED_CONSTRAINT.to_string(),
                    });
                }
            }

            let mut rows = Vec::with_capacity(targets.len());
            let mut changes = Vec::new();
            for id in targets {
                if let Some(category) = state.categories.get_mut(&id) {
                    if category.is_unlocked != unlocked {
                        let old = category.clone();
                        category.is_unlocked = unlocked;
                        changes.push(ChangeEvent::updated(old, category.clone()));
                    }
                    rows.push(category.clone());
                }
            }
            state.record_unlocked();
            (rows, changes)
        };

        for change in changes {
            self.publish(StoreChange::Category(change));
        }
        Ok(rows)
    }
}

#[async_trait]
impl VoteStore for NullStore {
    async fn insert_vote(&self, vote: &Vote) -> Result<Vote, StoreError> {
        self.enter("insert_vote").await?;

        {
            let mut state = lock(&self.state);
            let category = state.categories.get(&vote.category_id).ok_or_else(|| {
                StoreError::ReferentialViolation(format!("category {}", vote.category_id))
            })?;
            if !category.accepts(vote.option) {
                return Err(StoreError::DomainViolation(format!(
                    "option {} not offered",
                    vote.option
                )));
            }
            let taken = state
                .votes
                .iter()
                .any(|v| v.category_id == vote.category_id && v.identity == vote.identity);
            if taken {
                return Err(StoreError::UniqueViolation {
                    constraint: VOTE_IDENTITY_CONSTRAINT.to_string(),
                });
            }
            state.votes.push(vote.clone());
        }

        self.publish(StoreChange::Vote(ChangeEvent::inserted(vote.clone())));
        Ok(vote.clone())
    }

    async fn votes_for(&self, category: CategoryId) -> Result<Vec<Vote>, StoreError> {
        self.enter("votes_for").await?;
        let mut state = lock(&self.state);
        *state.vote_fetches.entry(category).or_insert(0) += 1;
        Ok(state
            .votes
            .iter()
            .filter(|v| v.category_id == category)
            .cloned()
            .collect())
    }

    async fn find_vote(
        &self,
        category: CategoryId,
        identity: &Identity,
    ) -> Result<Option<Vote>, StoreError> {
        self.enter("find_vote").await?;
        Ok(lock(&self.state)
            .votes
            .iter()
            .find(|v| v.category_id == category && &v.identity == identity)
            .cloned())
    }
}

#[async_trait]
impl ChangeSource for NullStore {
    async fn subscribe(&self, collections: &[Collection]) -> Result<ChangeFeed, StoreError> {
        self.enter("subscribe").await?;
        let (tx, feed) = ChangeFeed::channel();
        tx.send(FeedMessage::Status(SubscriptionStatus::Subscribed));
        lock(&self.feeds).push(Feed {
            collections: collections.to_vec(),
            tx,
        });
        Ok(feed)
    }
}
