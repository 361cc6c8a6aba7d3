//! Vote coordination core.
//!
//! - [`VoteGateway`] submits votes and enforces one vote per identity per
//!   category, optimistically against a local cache and authoritatively
//!   through the store's uniqueness constraint.
//! - [`UnlockController`] keeps at most one category unlocked and exposes
//!   tallies to the admin.
//! - [`ParticipantSession`] owns one participant's identity, voted-set cache
//!   and active category.
//!
//! Client-side checks are latency optimisations only. The store serialises
//! conflicting writes and is the final arbiter.

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod session;

pub use config::SessionConfig;
pub use controller::UnlockController;
pub use error::VotingError;
pub use gateway::VoteGateway;
pub use metrics::VotingMetrics;
pub use session::ParticipantSession;
