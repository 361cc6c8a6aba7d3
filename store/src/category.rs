//! Category storage trait.

use crate::StoreError;
use async_trait::async_trait;
use award_types::{Category, CategoryId};

/// Row selector for category queries and updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Id(CategoryId),
    Unlocked(bool),
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Id(id) => category.id == *id,
            Self::Unlocked(flag) => category.is_unlocked == *flag,
        }
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fetch every category matching `filter`, ordered by id.
    async fn list_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, StoreError>;

    /// Fetch one category. `NotFound` if the id does not exist.
    async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError>;

    /// Set `is_unlocked` on every matching row and return the rows after the
    /// update.
    ///
    /// Fails with `UniqueViolation` when the write would leave two unlocked
    /// categories, and with `NotFound` when an `Id` filter matches nothing.
    async fn update_unlocked(
        &self,
        filter: CategoryFilter,
        unlocked: bool,
    ) -> Result<Vec<Category>, StoreError>;
}
