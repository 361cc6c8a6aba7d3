//! Vote submission against the store.
//!
//! `submit_vote` runs four checks in order: local voted-set, option key,
//! category exists and is unlocked, then the insert itself. The category read
//! and the insert are separate store calls, so a category may lock between
//! them; the store's `(category, identity)` constraint remains the arbiter
//! for duplicates.

use crate::{VotingError, VotingMetrics};
use award_store::{retrying, DataStore, StoreError};
use award_types::{CategoryId, Identity, Tally, Vote, VoteOption};
use award_utils::BackoffPolicy;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub struct VoteGateway {
    store: Arc<dyn DataStore>,
    retry: BackoffPolicy,
    metrics: Arc<VotingMetrics>,
    /// `(category, identity)` pairs known to have voted. Optimistic only.
    voted: Mutex<HashSet<(CategoryId, Identity)>>,
}

impl VoteGateway {
    pub fn new(store: Arc<dyn DataStore>, retry: BackoffPolicy, metrics: Arc<VotingMetrics>) -> Self {
        Self {
            store,
            retry,
            metrics,
            voted: Mutex::new(HashSet::new()),
        }
    }

    pub async fn submit_vote(
        &self,
        category_id: CategoryId,
        option: &str,
        identity: &Identity,
    ) -> Result<Vote, VotingError> {
        if self.locally_voted(category_id, identity) {
            debug!(category = %category_id, identity = %identity, "duplicate vote caught locally");
            self.metrics.votes_duplicate.inc();
            return Err(VotingError::DuplicateVote {
                category: category_id,
                identity: identity.clone(),
            });
        }

        let result = self.submit_checked(category_id, option, identity).await;
        match &result {
            Ok(vote) => {
                self.mark_voted(category_id, identity);
                self.metrics.votes_accepted.inc();
                info!(
                    category = %category_id,
                    identity = %identity,
                    option = %vote.option,
                    vote = %vote.id,
                    submitted_at = %vote.submitted_at,
                    "vote recorded"
                );
            }
            Err(err @ VotingError::DuplicateVote { .. }) => {
                self.mark_voted(category_id, identity);
                self.metrics.votes_duplicate.inc();
                info!(category = %category_id, identity = %identity, error = %err, "duplicate vote rejected by store");
            }
            Err(err) => {
                if !err.is_retryable() {
                    self.metrics.votes_rejected.inc();
                }
                warn!(category = %category_id, identity = %identity, option, error = %err, "vote rejected");
            }
        }
        result
    }

    async fn submit_checked(
        &self,
        category_id: CategoryId,
        raw_option: &str,
        identity: &Identity,
    ) -> Result<Vote, VotingError> {
        let option: VoteOption = raw_option
            .parse()
            .map_err(|_| VotingError::InvalidOption(raw_option.to_string()))?;

        let category = retrying(&self.retry, "get_category", || {
            self.store.get_category(category_id)
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => VotingError::CategoryNotFound(category_id),
            other => other.into(),
        })?;
        if !category.is_unlocked {
            return Err(VotingError::CategoryLocked(category_id));
        }

        let vote = Vote::new(category_id, option, identity.clone());
        retrying(&self.retry, "insert_vote", || self.store.insert_vote(&vote))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => VotingError::DuplicateVote {
                    category: category_id,
                    identity: identity.clone(),
                },
                StoreError::ReferentialViolation(_) => VotingError::InvalidCategory(category_id),
                StoreError::DomainViolation(_) => VotingError::InvalidOption(raw_option.to_string()),
                other => other.into(),
            })
    }

    /// Whether `identity` has voted in `category_id`. A local hit skips the
    /// store; a store hit is remembered locally.
    pub async fn has_voted(
        &self,
        category_id: CategoryId,
        identity: &Identity,
    ) -> Result<bool, VotingError> {
        if self.locally_voted(category_id, identity) {
            return Ok(true);
        }
        let found = retrying(&self.retry, "find_vote", || {
            self.store.find_vote(category_id, identity)
        })
        .await
        .map_err(|e| {
            warn!(category = %category_id, identity = %identity, error = %e, "vote lookup failed");
            VotingError::from(e)
        })?;

        if found.is_some() {
            self.mark_voted(category_id, identity);
        }
        Ok(found.is_some())
    }

    /// Per-option counts for a category. Returns a zeroed tally when the
    /// votes cannot be fetched.
    pub async fn tally(&self, category_id: CategoryId) -> Tally {
        fetch_tally(self.store.as_ref(), &self.retry, category_id)
            .await
            .unwrap_or_else(|e| {
                warn!(category = %category_id, error = %e, "tally unavailable, showing zero");
                Tally::zeroed()
            })
    }

    pub fn locally_voted(&self, category_id: CategoryId, identity: &Identity) -> bool {
        self.voted_set().contains(&(category_id, identity.clone()))
    }

    fn mark_voted(&self, category_id: CategoryId, identity: &Identity) {
        self.voted_set().insert((category_id, identity.clone()));
    }

    fn voted_set(&self) -> MutexGuard<'_, HashSet<(CategoryId, Identity)>> {
        self.voted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Recount a category from its persisted votes.
pub(crate) async fn fetch_tally(
    store: &dyn DataStore,
    retry: &BackoffPolicy,
    category_id: CategoryId,
) -> Result<Tally, StoreError> {
    let votes = retrying(retry, "votes_for", || store.votes_for(category_id)).await?;
    Ok(Tally::from_votes(&votes))
}
