//! Award categories and their identifiers.

use crate::{TypeError, VoteOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable, positive category identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u64);

impl CategoryId {
    pub fn new(id: u64) -> Result<Self, TypeError> {
        if id == 0 {
            return Err(TypeError::InvalidCategoryId(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for CategoryId {
    type Error = TypeError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        if raw <= 0 {
            return Err(TypeError::InvalidCategoryId(raw.to_string()));
        }
        Self::new(raw as u64)
    }
}

impl FromStr for CategoryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| TypeError::InvalidCategoryId(s.to_string()))?;
        Self::new(raw)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One award category with its four nominees.
///
/// At most one category in the whole store may have `is_unlocked` set. Only
/// the unlock controller mutates that flag; categories are never deleted
/// during an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub nominees: BTreeMap<VoteOption, String>,
    pub is_unlocked: bool,
}

impl Category {
    /// Build a locked category, checking the title and that every option
    /// key appears exactly once.
    pub fn new(
        id: CategoryId,
        title: impl Into<String>,
        nominees: impl IntoIterator<Item = (VoteOption, String)>,
    ) -> Result<Self, TypeError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TypeError::EmptyTitle);
        }

        let mut supplied = 0usize;
        let mut map = BTreeMap::new();
        for (option, name) in nominees {
            supplied += 1;
            map.insert(option, name);
        }
        if supplied != VoteOption::ALL.len() || map.len() != VoteOption::ALL.len() {
            return Err(TypeError::NomineeCount(supplied));
        }

        Ok(Self {
            id,
            title,
            nominees: map,
            is_unlocked: false,
        })
    }

    /// Display name for an option, if the category lists it.
    pub fn nominee(&self, option: VoteOption) -> Option<&str> {
        self.nominees.get(&option).map(String::as_str)
    }

    pub fn accepts(&self, option: VoteOption) -> bool {
        self.nominees.contains_key(&option)
    }
}
