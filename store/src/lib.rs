//! Abstract Data Store collaborator for the voting core.
//!
//! The real store (and its network transport) lives outside this workspace.
//! Every backend implements these traits; the in-memory one used for tests
//! lives in `award-nullables`. The rest of the codebase depends only on the
//! traits and holds the store as `Arc<dyn DataStore>`.

pub mod category;
pub mod change;
pub mod error;
pub mod retry;
pub mod vote;

pub use category::{CategoryFilter, CategoryStore};
pub use change::{
    ChangeEvent, ChangeFeed, ChangeKind, ChangeSource, Collection, FeedMessage, FeedSender,
    StoreChange, SubscriptionStatus,
};
pub use error::{StoreError, SINGLE_UNLOCKED_CONSTRAINT, VOTE_IDENTITY_CONSTRAINT};
pub use retry::retrying;
pub use vote::VoteStore;

/// Everything the voting core needs from the store.
pub trait DataStore: CategoryStore + VoteStore + ChangeSource {}

impl<T: CategoryStore + VoteStore + ChangeSource + ?Sized> DataStore for T {}
