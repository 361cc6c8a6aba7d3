use award_identity::IdentityError;
use award_store::StoreError;
use award_types::{Category, CategoryId, Identity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("participant identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("invalid vote option {0:?}")]
    InvalidOption(String),

    #[error("invalid category id {0:?}")]
    InvalidCategoryId(String),

    #[error("vote references unknown category {0}")]
    InvalidCategory(CategoryId),

    #[error("category {0} is not open for voting")]
    CategoryLocked(CategoryId),

    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    #[error("{identity} already voted in category {category}")]
    DuplicateVote {
        category: CategoryId,
        identity: Identity,
    },

    #[error("another category was unlocked while unlocking {0}")]
    UnlockConflict(CategoryId),

    /// Store invariant broken by an outside writer. `fallback` is the first
    /// unlocked category the store returned.
    #[error("{} categories are unlocked at once: {ids:?}", .ids.len())]
    MultipleActiveCategories {
        ids: Vec<CategoryId>,
        fallback: Box<Category>,
    },

    #[error("no category is open for voting")]
    NoActiveCategory,

    #[error("{operation} failed after {attempts} attempts: {reason}")]
    Connection {
        operation: &'static str,
        attempts: u32,
        reason: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl VotingError {
    /// Whether the participant or admin can usefully try the same action again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdentityUnavailable(_) | Self::Connection { .. } | Self::UnlockConflict(_)
        )
    }

    /// "Already voted" is a state to show, not a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::DuplicateVote { .. })
    }

    /// Message safe to show on the participant or admin surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::IdentityUnavailable(_) => {
                "We couldn't recognise this device. Please try again."
            }
            Self::InvalidOption(_) => "Please pick one of the four nominees.",
            Self::InvalidCategoryId(_) => "That category number isn't valid.",
            Self::InvalidCategory(_) => "This category no longer exists. Please refresh.",
            Self::CategoryLocked(_) => "Voting for this category is closed. Please wait for the next one.",
            Self::CategoryNotFound(_) => "There is no category with that number.",
            Self::DuplicateVote { .. } => "You've already voted in this category.",
            Self::UnlockConflict(_) => {
                "Another category was opened at the same time. Please try again."
            }
            Self::MultipleActiveCategories { .. } => {
                "More than one category is open. Lock the extra ones to fix this."
            }
            Self::NoActiveCategory => "Voting hasn't opened yet. Please wait.",
            Self::Connection { .. } => "Connection problem. Please check your network and retry.",
            Self::Config(_) => "The voting app is misconfigured.",
            Self::Store(_) => "Something went wrong. Please try again.",
        }
    }
}

impl From<IdentityError> for VotingError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unavailable(reason) => Self::IdentityUnavailable(reason),
        }
    }
}

impl From<StoreError> for VotingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RetriesExhausted {
                operation,
                attempts,
                last,
            } => Self::Connection {
                operation,
                attempts,
                reason: last.to_string(),
            },
            StoreError::Timeout { operation, .. } => Self::Connection {
                operation,
                attempts: 1,
                reason: err.to_string(),
            },
            StoreError::Transient(ref reason) => Self::Connection {
                operation: "store",
                attempts: 1,
                reason: reason.clone(),
            },
            other => Self::Store(other),
        }
    }
}
