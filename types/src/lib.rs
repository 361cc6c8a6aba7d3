//! Fundamental types for the award voting core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! category and vote records, option keys, participant identities, derived
//! tallies and timestamps.

pub mod category;
pub mod error;
pub mod identity;
pub mod tally;
pub mod time;
pub mod vote;

pub use category::{Category, CategoryId};
pub use error::TypeError;
pub use identity::Identity;
pub use tally::Tally;
pub use time::Timestamp;
pub use vote::{Vote, VoteId, VoteOption};
