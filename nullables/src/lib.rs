//! Nullable infrastructure for deterministic testing.
//!
//! The Data Store and the fingerprint provider are external collaborators
//! abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Enforce the same constraints as the real store
//! - Can be steered programmatically (injected outages, dropped feeds)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod fingerprint;
pub mod fixtures;
pub mod store;

pub use fingerprint::NullFingerprint;
pub use fixtures::{category, category_id};
pub use store::NullStore;
