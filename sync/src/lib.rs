//! Live view synchronization for participant and admin screens.
//!
//! Each observer runs its own state machine:
//!
//! ```text
//! Connecting -> Subscribed <-> Reconnecting -> Disconnected
//!                    \______________________-> Closed
//! ```
//!
//! On every entry to `Subscribed` the observer pulls a fresh snapshot and
//! only then applies pushed changes on top. Changes missed while
//! disconnected are never replayed, so the pull is mandatory.

pub mod snapshot;
pub mod state;
pub mod synchronizer;

pub use snapshot::{CachedCategory, LiveSnapshot};
pub use state::{ObserverRole, SyncState, ViewUpdate};
pub use synchronizer::{LiveViewSynchronizer, Subscription};
