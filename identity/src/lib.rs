//! Participant identity resolution.
//!
//! Combines, in priority order:
//! - **primary**: a hardware/browser-derived device fingerprint
//! - **secondary**: a hash over browser characteristics
//! - **session token**: random, scoped to this process
//!
//! Only the primary fingerprint becomes the canonical [`Identity`]; the other
//! two are diagnostics. This is a casual-misuse deterrent for a single
//! in-person event, not a security boundary.
//!
//! [`Identity`]: award_types::Identity

pub mod error;
pub mod resolver;

pub use error::IdentityError;
pub use resolver::{IdentityResolver, ResolvedIdentity};

use async_trait::async_trait;

/// Source of device fingerprint signals (browser fingerprinting library,
/// platform device id, ...).
#[async_trait]
pub trait FingerprintProvider: Send + Sync {
    /// Best-effort stable device identifier.
    async fn device_fingerprint(&self) -> Result<String, IdentityError>;

    /// Name/value pairs describing the client (user agent, screen, timezone...).
    async fn characteristics(&self) -> Result<Vec<(String, String)>, IdentityError>;

    /// Human-readable name of this provider.
    fn name(&self) -> &str;
}
