//! Locally cached view of categories and their tallies.

use award_types::{Category, CategoryId, Tally};
use serde::Serialize;
use std::collections::BTreeMap;

/// A category together with its most recently computed tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CachedCategory {
    pub category: Category,
    pub tally: Tally,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LiveSnapshot {
    categories: BTreeMap<CategoryId, CachedCategory>,
}

impl LiveSnapshot {
    pub fn from_parts(parts: impl IntoIterator<Item = (Category, Tally)>) -> Self {
        let categories = parts
            .into_iter()
            .map(|(category, tally)| (category.id, CachedCategory { category, tally }))
            .collect();
        Self { categories }
    }

    /// Merge an updated category record into the cache. The cached tally is
    /// kept; a category not seen before starts with a zeroed tally.
    pub fn merge_category(&mut self, update: Category) -> &CachedCategory {
        let entry = self
            .categories
            .entry(update.id)
            .or_insert_with(|| CachedCategory {
                category: update.clone(),
                tally: Tally::zeroed(),
            });
        let cached = &mut entry.category;
        cached.title = update.title;
        cached.nominees = update.nominees;
        cached.is_unlocked = update.is_unlocked;
        entry
    }

    /// Replace one category's tally. Returns `false` for an unknown category.
    pub fn set_tally(&mut self, id: CategoryId, tally: Tally) -> bool {
        match self.categories.get_mut(&id) {
            Some(entry) => {
                entry.tally = tally;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&CachedCategory> {
        self.categories.get(&id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CachedCategory> {
        self.categories.values()
    }

    /// The unlocked category, or the lowest-id one if several are.
    pub fn active(&self) -> Option<&CachedCategory> {
        self.categories.values().find(|c| c.category.is_unlocked)
    }

    pub fn unlocked_ids(&self) -> Vec<CategoryId> {
        self.categories
            .values()
            .filter(|c| c.category.is_unlocked)
            .map(|c| c.category.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
