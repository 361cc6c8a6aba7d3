//! Participant identity: an opaque, best-effort unique string.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical identity a vote is recorded under.
///
/// Produced by the identity resolver from the primary device fingerprint.
/// Duplicate prevention keys on `(category, identity)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a non-empty identifier. Surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identity_rejected() {
        assert_eq!(Identity::new("   "), Err(TypeError::EmptyIdentity));
    }

    #[test]
    fn identity_is_trimmed() {
        assert_eq!(Identity::new(" device-x\n").unwrap().as_str(), "device-x");
    }
}
