//! Shared utilities for the award voting workspace.

pub mod backoff;
pub mod logging;

pub use backoff::BackoffPolicy;
pub use logging::{init_logging, LogFormat};
