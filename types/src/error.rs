//! Validation errors raised while constructing domain types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid category id: {0}")]
    InvalidCategoryId(String),

    #[error("invalid vote option: {0}")]
    InvalidOption(String),

    #[error("category title must not be empty")]
    EmptyTitle,

    #[error("category needs exactly one nominee per option, got {0}")]
    NomineeCount(usize),

    #[error("identity must not be empty")]
    EmptyIdentity,
}
