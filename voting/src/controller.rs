//! Admin-side category unlocking.
//!
//! `unlock` is a two-phase update: lock every category, then unlock the
//! target. No completed write ever leaves two categories unlocked, at the
//! cost of a short window in which none is. The store's single-unlocked
//! constraint resolves concurrent unlocks; the loser gets `UnlockConflict`.

use crate::gateway::fetch_tally;
use crate::{VotingError, VotingMetrics};
use award_store::{retrying, CategoryFilter, DataStore, StoreError, SINGLE_UNLOCKED_CONSTRAINT};
use award_types::{Category, CategoryId, Tally};
use award_utils::BackoffPolicy;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct UnlockController {
    store: Arc<dyn DataStore>,
    retry: BackoffPolicy,
    metrics: Arc<VotingMetrics>,
}

impl UnlockController {
    pub fn new(store: Arc<dyn DataStore>, retry: BackoffPolicy, metrics: Arc<VotingMetrics>) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// Make `raw_id` the only unlocked category and return it.
    pub async fn unlock(&self, raw_id: i64) -> Result<Category, VotingError> {
        let id = parse_id(raw_id)?;

        retrying(&self.retry, "get_category", || self.store.get_category(id))
            .await
            .map_err(|e| not_found_as(id, e))?;

        let locked = retrying(&self.retry, "update_unlocked", || {
            self.store.update_unlocked(CategoryFilter::All, false)
        })
        .await
        .map_err(|e| {
            warn!(category = %id, error = %e, "unlock phase one failed");
            VotingError::from(e)
        })?;
        info!(category = %id, locked = locked.len(), "all categories locked");

        let rows = retrying(&self.retry, "update_unlocked", || {
            self.store.update_unlocked(CategoryFilter::Id(id), true)
        })
        .await
        .map_err(|e| {
            if e.violates(SINGLE_UNLOCKED_CONSTRAINT) {
                self.metrics.unlock_conflicts.inc();
                warn!(category = %id, "unlock lost a race to another unlock");
                VotingError::UnlockConflict(id)
            } else {
                error!(category = %id, error = %e, "unlock phase two failed, no category is active");
                not_found_as(id, e)
            }
        })?;

        let category = rows
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(VotingError::CategoryNotFound(id))?;
        self.metrics.unlocks.inc();
        info!(category = %id, title = %category.title, "category unlocked");
        Ok(category)
    }

    /// Lock one category. Locking an already-locked category succeeds.
    pub async fn lock(&self, raw_id: i64) -> Result<Category, VotingError> {
        let id = parse_id(raw_id)?;
        let rows = retrying(&self.retry, "update_unlocked", || {
            self.store.update_unlocked(CategoryFilter::Id(id), false)
        })
        .await
        .map_err(|e| not_found_as(id, e))?;

        let category = rows
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(VotingError::CategoryNotFound(id))?;
        info!(category = %id, "category locked");
        Ok(category)
    }

    /// The single unlocked category, if any.
    ///
    /// More than one unlocked category means something outside this
    /// controller wrote to the store. That is reported as
    /// `MultipleActiveCategories` carrying the first one as a fallback.
    pub async fn active_category(&self) -> Result<Option<Category>, VotingError> {
        let mut unlocked = retrying(&self.retry, "list_categories", || {
            self.store.list_categories(CategoryFilter::Unlocked(true))
        })
        .await?;

        match unlocked.len() {
            0 => Ok(None),
            1 => Ok(unlocked.pop()),
            _ => {
                let ids: Vec<CategoryId> = unlocked.iter().map(|c| c.id).collect();
                self.metrics.consistency_anomalies.inc();
                error!(categories = ?ids, "more than one category is unlocked");
                let fallback = Box::new(unlocked.swap_remove(0));
                Err(VotingError::MultipleActiveCategories { ids, fallback })
            }
        }
    }

    /// Tally for one category. Only a malformed id is an error; votes that
    /// cannot be fetched show as a zeroed tally.
    pub async fn tally(&self, raw_id: i64) -> Result<Tally, VotingError> {
        let id = parse_id(raw_id)?;
        Ok(self.tally_or_zero(id).await)
    }

    /// Every category with its tally, for the results board. A category
    /// whose votes cannot be fetched shows a zeroed tally.
    pub async fn results(&self) -> Result<Vec<(Category, Tally)>, VotingError> {
        let categories = retrying(&self.retry, "list_categories", || {
            self.store.list_categories(CategoryFilter::All)
        })
        .await?;

        let mut results = Vec::with_capacity(categories.len());
        for category in categories {
            let tally = self.tally_or_zero(category.id).await;
            results.push((category, tally));
        }
        Ok(results)
    }

    async fn tally_or_zero(&self, id: CategoryId) -> Tally {
        fetch_tally(self.store.as_ref(), &self.retry, id)
            .await
            .unwrap_or_else(|e| {
                warn!(category = %id, error = %e, "tally unavailable, showing zero");
                Tally::zeroed()
            })
    }
}

fn parse_id(raw_id: i64) -> Result<CategoryId, VotingError> {
    CategoryId::try_from(raw_id).map_err(|_| {
        warn!(raw_id, "rejected malformed category id");
        VotingError::InvalidCategoryId(raw_id.to_string())
    })
}

fn not_found_as(id: CategoryId, err: StoreError) -> VotingError {
    match err {
        StoreError::NotFound(_) => VotingError::CategoryNotFound(id),
        other => other.into(),
    }
}
