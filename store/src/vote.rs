//! Vote storage trait.

use crate::StoreError;
use async_trait::async_trait;
use award_types::{CategoryId, Identity, Vote};

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Persist a vote.
    ///
    /// Constraint failures come back as `UniqueViolation` (identity already
    /// voted in this category), `ReferentialViolation` (unknown category) or
    /// `DomainViolation` (option not offered by the category).
    async fn insert_vote(&self, vote: &Vote) -> Result<Vote, StoreError>;

    /// All votes referencing a category.
    async fn votes_for(&self, category: CategoryId) -> Result<Vec<Vote>, StoreError>;

    /// The vote an identity cast in a category, if any.
    async fn find_vote(
        &self,
        category: CategoryId,
        identity: &Identity,
    ) -> Result<Option<Vote>, StoreError>;
}
