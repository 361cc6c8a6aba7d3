//! Nullable fingerprint provider.

use async_trait::async_trait;
use award_identity::{FingerprintProvider, IdentityError};
use std::sync::atomic::{AtomicU32, Ordering};

/// A fingerprint provider that returns a fixed device id, or always fails.
pub struct NullFingerprint {
    device: Option<String>,
    calls: AtomicU32,
}

impl NullFingerprint {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// A provider whose fingerprinting mechanism is broken.
    pub fn failing() -> Self {
        Self {
            device: None,
            calls: AtomicU32::new(0),
        }
    }

    /// How many times the device fingerprint was requested.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintProvider for NullFingerprint {
    async fn device_fingerprint(&self) -> Result<String, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.device
            .clone()
            .ok_or_else(|| IdentityError::Unavailable("fingerprinting disabled".into()))
    }

    async fn characteristics(&self) -> Result<Vec<(String, String)>, IdentityError> {
        Ok(vec![("user_agent".into(), "null-browser/1.0".into())])
    }

    fn name(&self) -> &str {
        "null-fingerprint"
    }
}
