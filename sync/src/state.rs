//! Observer states and the updates delivered to an observer.

use crate::{CachedCategory, LiveSnapshot};
use award_types::{CategoryId, Tally};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ObserverRole {
    Participant,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Connecting,
    Subscribed,
    /// Waiting to resubscribe. `attempt` counts consecutive failures.
    Reconnecting { attempt: u32 },
    /// Gave up after the reconnect ceiling; needs a fresh subscription.
    Disconnected,
    Closed,
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ViewUpdate {
    State(SyncState),
    /// Authoritative snapshot pulled after (re)subscribing.
    Snapshot(LiveSnapshot),
    /// A category change merged into the cached entity.
    CategoryMerged(CachedCategory),
    /// Tally recounted after a new vote.
    TallyRecomputed { category_id: CategoryId, tally: Tally },
    /// More than one category is unlocked in the cached view.
    Anomaly(Vec<CategoryId>),
}
