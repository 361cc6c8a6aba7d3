use std::time::Duration;
use thiserror::Error;

/// Uniqueness on `(category_id, identity)` across votes.
pub const VOTE_IDENTITY_CONSTRAINT: &str = "votes_category_identity_key";

/// Uniqueness on `is_unlocked = true` across categories.
pub const SINGLE_UNLOCKED_CONSTRAINT: &str = "categories_single_unlocked";

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("uniqueness constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("referential integrity violated: {0}")]
    ReferentialViolation(String),

    #[error("domain constraint violated: {0}")]
    DomainViolation(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last: Box<StoreError>,
    },
}

impl StoreError {
    /// Network-level failures that a retry may fix. Constraint and lookup
    /// failures are answers, not outages.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout { .. })
    }

    pub fn violates(&self, name: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == name)
    }
}
