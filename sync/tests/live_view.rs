use async_trait::async_trait;
use award_nullables::{category, category_id, NullStore};
use award_store::{
    CategoryFilter, CategoryStore, ChangeEvent, ChangeFeed, ChangeSource, Collection,
    FeedMessage, FeedSender, StoreChange, StoreError, SubscriptionStatus, VoteStore,
};
use award_sync::{
    LiveSnapshot, LiveViewSynchronizer, ObserverRole, Subscription, SyncState, ViewUpdate,
};
use award_types::{Category, CategoryId, Identity, Tally, Vote, VoteOption};
use award_utils::BackoffPolicy;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn policy() -> BackoffPolicy {
    BackoffPolicy {
        base_delay_ms: 1_000,
        max_delay_ms: 8_000,
        max_attempts: 3,
        call_timeout_ms: 5_000,
    }
}

fn unlocked(id: u64) -> Category {
    let mut c = category(id);
    c.is_unlocked = true;
    c
}

fn vote(category: u64, option: VoteOption, device: &str) -> Vote {
    Vote::new(category_id(category), option, Identity::new(device).unwrap())
}

async fn next(sub: &mut Subscription) -> ViewUpdate {
    tokio::time::timeout(Duration::from_secs(600), sub.next())
        .await
        .expect("update before timeout")
        .expect("subscription still open")
}

async fn expect_state(sub: &mut Subscription, state: SyncState) {
    assert_eq!(next(sub).await, ViewUpdate::State(state));
}

async fn expect_snapshot(sub: &mut Subscription) -> LiveSnapshot {
    expect_state(sub, SyncState::Subscribed).await;
    match next(sub).await {
        ViewUpdate::Snapshot(snapshot) => snapshot,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

async fn connected(store: &Arc<NullStore>) -> (Subscription, LiveSnapshot) {
    let sync = LiveViewSynchronizer::new(store.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Participant);
    expect_state(&mut sub, SyncState::Connecting).await;
    let snapshot = expect_snapshot(&mut sub).await;
    (sub, snapshot)
}

#[tokio::test(start_paused = true)]
async fn initial_pull_reflects_store() {
    let store = Arc::new(NullStore::with_categories([unlocked(1), category(2)]));
    store.insert_vote(&vote(1, VoteOption::B, "dev-1")).await.unwrap();

    let (_sub, snapshot) = connected(&store).await;

    assert_eq!(snapshot.len(), 2);
    let active = snapshot.active().unwrap();
    assert_eq!(active.category.id, category_id(1));
    assert_eq!(active.tally.b, 1);
    assert_eq!(active.tally.total, 1);
}

#[tokio::test(start_paused = true)]
async fn category_change_merges_and_keeps_tally() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    store.insert_vote(&vote(1, VoteOption::A, "dev-1")).await.unwrap();
    let (mut sub, _) = connected(&store).await;

    store
        .update_unlocked(CategoryFilter::Id(category_id(1)), false)
        .await
        .unwrap();

    match next(&mut sub).await {
        ViewUpdate::CategoryMerged(cached) => {
            assert!(!cached.category.is_unlocked);
            assert_eq!(cached.tally.total, 1);
        }
        other => panic!("expected merge, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn vote_recounts_only_its_category() {
    let store = Arc::new(NullStore::with_categories([category(1), unlocked(2)]));
    let (mut sub, _) = connected(&store).await;
    assert_eq!(store.vote_fetches(category_id(1)), 1);
    assert_eq!(store.vote_fetches(category_id(2)), 1);

    store.insert_vote(&vote(2, VoteOption::D, "dev-1")).await.unwrap();

    match next(&mut sub).await {
        ViewUpdate::TallyRecomputed { category_id: id, tally } => {
            assert_eq!(id, category_id(2));
            assert_eq!(tally.d, 1);
        }
        other => panic!("expected recount, got {other:?}"),
    }
    assert_eq!(store.vote_fetches(category_id(1)), 1);
    assert_eq!(store.vote_fetches(category_id(2)), 2);
    assert_eq!(store.calls("list_categories"), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_pulls_changes_missed_while_down() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    let (mut sub, snapshot) = connected(&store).await;
    assert_eq!(snapshot.active().unwrap().tally.total, 0);

    store.disconnect_feeds(SubscriptionStatus::Error("connection reset".into()));
    store.insert_vote(&vote(1, VoteOption::C, "dev-1")).await.unwrap();

    expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;
    let snapshot = expect_snapshot(&mut sub).await;
    assert_eq!(snapshot.active().unwrap().tally.c, 1);
    assert_eq!(store.calls("list_categories"), 2);
    assert_eq!(store.live_feeds(), 1);
}

#[tokio::test(start_paused = true)]
async fn closed_and_timed_out_feeds_reconnect() {
    let store = Arc::new(NullStore::with_categories([category(1)]));
    let (mut sub, _) = connected(&store).await;

    for status in [SubscriptionStatus::Closed, SubscriptionStatus::TimedOut] {
        store.disconnect_feeds(status);
        // A successful pull resets the attempt counter.
        expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;
        expect_snapshot(&mut sub).await;
    }
    assert_eq!(store.calls("subscribe"), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_subscribe_is_retried() {
    let store = Arc::new(NullStore::with_categories([category(1)]));
    store.fail_operation("subscribe", 1);

    let sync = LiveViewSynchronizer::new(store.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Admin);
    expect_state(&mut sub, SyncState::Connecting).await;
    expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;
    let snapshot = expect_snapshot(&mut sub).await;
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_pull_is_retried() {
    let store = Arc::new(NullStore::with_categories([category(1)]));
    store.fail_operation("list_categories", 1);

    let sync = LiveViewSynchronizer::new(store.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Participant);
    expect_state(&mut sub, SyncState::Connecting).await;
    expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;
    expect_snapshot(&mut sub).await;
    assert_eq!(store.live_feeds(), 1);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let store = Arc::new(NullStore::with_categories([category(1)]));
    store.fail_operation("subscribe", 100);

    let sync = LiveViewSynchronizer::new(store.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Participant);
    expect_state(&mut sub, SyncState::Connecting).await;
    expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;
    expect_state(&mut sub, SyncState::Reconnecting { attempt: 2 }).await;
    expect_state(&mut sub, SyncState::Disconnected).await;

    assert!(sub.next().await.is_none());
    assert_eq!(store.calls("subscribe"), 3);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_cancels_pending_backoff() {
    let store = Arc::new(NullStore::with_categories([category(1)]));
    store.fail_operation("subscribe", 100);

    let sync = LiveViewSynchronizer::new(store.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Participant);
    expect_state(&mut sub, SyncState::Connecting).await;
    expect_state(&mut sub, SyncState::Reconnecting { attempt: 1 }).await;

    sub.unsubscribe().await;
    tokio::time::advance(Duration::from_secs(60)).await;

    assert_eq!(store.calls("subscribe"), 1);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_releases_the_feed() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    let (sub, _) = connected(&store).await;
    assert_eq!(store.live_feeds(), 1);

    sub.unsubscribe().await;

    assert_eq!(store.live_feeds(), 0);
    store.insert_vote(&vote(1, VoteOption::A, "dev-1")).await.unwrap();
    assert_eq!(store.vote_fetches(category_id(1)), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_subscription_stops_the_task() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    let (sub, _) = connected(&store).await;

    drop(sub);
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }

    assert_eq!(store.live_feeds(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_unlocked_category_is_reported() {
    let store = Arc::new(NullStore::with_categories([category(1), category(2)]));
    let (mut sub, _) = connected(&store).await;

    store.force_unlocked(category_id(1), true);
    assert!(matches!(next(&mut sub).await, ViewUpdate::CategoryMerged(_)));

    store.force_unlocked(category_id(2), true);
    assert!(matches!(next(&mut sub).await, ViewUpdate::CategoryMerged(_)));
    assert_eq!(
        next(&mut sub).await,
        ViewUpdate::Anomaly(vec![category_id(1), category_id(2)])
    );
}

#[tokio::test(start_paused = true)]
async fn failed_recount_keeps_previous_tally() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    let (mut sub, _) = connected(&store).await;

    store.fail_operation("votes_for", 1);
    store.insert_vote(&vote(1, VoteOption::A, "dev-1")).await.unwrap();
    store.insert_vote(&vote(1, VoteOption::B, "dev-2")).await.unwrap();

    // The first recount failed silently; the second sees both votes.
    match next(&mut sub).await {
        ViewUpdate::TallyRecomputed { tally, .. } => {
            assert_eq!(tally.total, 2);
        }
        other => panic!("expected recount, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn observers_are_independent() {
    let store = Arc::new(NullStore::with_categories([unlocked(1)]));
    let sync = LiveViewSynchronizer::new(store.clone(), policy());

    let mut participant = sync.subscribe(ObserverRole::Participant);
    let mut admin = sync.subscribe(ObserverRole::Admin);
    for sub in [&mut participant, &mut admin] {
        expect_state(sub, SyncState::Connecting).await;
        expect_snapshot(sub).await;
    }
    assert_eq!(store.live_feeds(), 2);

    participant.unsubscribe().await;
    store.insert_vote(&vote(1, VoteOption::A, "dev-1")).await.unwrap();

    assert!(matches!(
        next(&mut admin).await,
        ViewUpdate::TallyRecomputed { .. }
    ));
    assert_eq!(store.live_feeds(), 1);
}

/// Reads go to a `NullStore`; the change feed is driven by the test, so
/// notifications can be delivered in any order.
struct ScriptedFeed {
    store: Arc<NullStore>,
    sender: Mutex<Option<FeedSender>>,
}

impl ScriptedFeed {
    fn new(store: Arc<NullStore>) -> Self {
        Self {
            store,
            sender: Mutex::new(None),
        }
    }

    fn push(&self, change: StoreChange) {
        let sender = self.sender.lock().unwrap();
        assert!(sender
            .as_ref()
            .expect("subscribed")
            .send(FeedMessage::Change(change)));
    }
}

#[async_trait]
impl CategoryStore for ScriptedFeed {
    async fn list_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, StoreError> {
        self.store.list_categories(filter).await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError> {
        self.store.get_category(id).await
    }

    async fn update_unlocked(
        &self,
        filter: CategoryFilter,
        unlocked: bool,
    ) -> Result<Vec<Category>, StoreError> {
        self.store.update_unlocked(filter, unlocked).await
    }
}

#[async_trait]
impl VoteStore for ScriptedFeed {
    async fn insert_vote(&self, vote: &Vote) -> Result<Vote, StoreError> {
        self.store.insert_vote(vote).await
    }

    async fn votes_for(&self, category: CategoryId) -> Result<Vec<Vote>, StoreError> {
        self.store.votes_for(category).await
    }

    async fn find_vote(
        &self,
        category: CategoryId,
        identity: &Identity,
    ) -> Result<Option<Vote>, StoreError> {
        self.store.find_vote(category, identity).await
    }
}

#[async_trait]
impl ChangeSource for ScriptedFeed {
    async fn subscribe(&self, _collections: &[Collection]) -> Result<ChangeFeed, StoreError> {
        let (tx, feed) = ChangeFeed::channel();
        tx.send(FeedMessage::Status(SubscriptionStatus::Subscribed));
        *self.sender.lock().unwrap() = Some(tx);
        Ok(feed)
    }
}

#[tokio::test(start_paused = true)]
async fn reordered_category_events_settle_on_store_state() {
    // Category 1 was unlocked and then locked again; the store holds the
    // locked row but the two notifications arrive newest first.
    let store = Arc::new(NullStore::with_categories([category(1), category(2)]));
    let feed = Arc::new(ScriptedFeed::new(store.clone()));
    let sync = LiveViewSynchronizer::new(feed.clone(), policy());
    let mut sub = sync.subscribe(ObserverRole::Participant);
    expect_state(&mut sub, SyncState::Connecting).await;
    expect_snapshot(&mut sub).await;

    feed.push(StoreChange::Category(ChangeEvent::updated(
        unlocked(1),
        category(1),
    )));
    feed.push(StoreChange::Category(ChangeEvent::updated(
        category(1),
        unlocked(1),
    )));

    for _ in 0..2 {
        match next(&mut sub).await {
            ViewUpdate::CategoryMerged(cached) => {
                assert_eq!(cached.category.id, category_id(1));
                assert!(!cached.category.is_unlocked);
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    // A late unlock must not pair with a real one into a false anomaly.
    store.force_unlocked(category_id(2), true);
    feed.push(StoreChange::Category(ChangeEvent::updated(
        category(2),
        unlocked(2),
    )));
    feed.push(StoreChange::Category(ChangeEvent::updated(
        category(1),
        unlocked(1),
    )));
    for _ in 0..2 {
        assert!(matches!(next(&mut sub).await, ViewUpdate::CategoryMerged(_)));
    }

    feed.push(StoreChange::Category(ChangeEvent::updated(
        unlocked(2),
        unlocked(2),
    )));
    match next(&mut sub).await {
        ViewUpdate::CategoryMerged(cached) => assert!(cached.category.is_unlocked),
        other => panic!("expected merge, got {other:?}"),
    }
    assert_eq!(store.calls("get_category"), 5);
}

#[tokio::test(start_paused = true)]
async fn tally_outage_still_delivers_snapshot() {
    let store = Arc::new(NullStore::with_categories([unlocked(1), category(2)]));
    store.insert_vote(&vote(1, VoteOption::A, "dev-1")).await.unwrap();
    store.fail_operation("votes_for", 1_000);

    let (_sub, snapshot) = connected(&store).await;

    assert_eq!(snapshot.len(), 2);
    let active = snapshot.active().unwrap();
    assert_eq!(active.category.id, category_id(1));
    assert_eq!(active.tally, Tally::zeroed());
    assert_eq!(store.calls("subscribe"), 1);
}
