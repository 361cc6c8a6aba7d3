//! Votes and the four option keys a vote may select.

use crate::{CategoryId, Identity, Timestamp, TypeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One of the four nominee slots in a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    A,
    B,
    C,
    D,
}

impl VoteOption {
    pub const ALL: [VoteOption; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl FromStr for VoteOption {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(TypeError::InvalidOption(other.to_string())),
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Globally unique vote identifier (UUID v4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(Uuid);

impl VoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable ballot: one identity's choice in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub category_id: CategoryId,
    pub option: VoteOption,
    pub identity: Identity,
    pub submitted_at: Timestamp,
}

impl Vote {
    /// A fresh vote with a generated id, stamped with the current time.
    pub fn new(category_id: CategoryId, option: VoteOption, identity: Identity) -> Self {
        Self {
            id: VoteId::generate(),
            category_id,
            option,
            identity,
            submitted_at: Timestamp::now(),
        }
    }
}
