//! Caching identity resolver.

use crate::{FingerprintProvider, IdentityError};
use award_types::Identity;
use blake2::{Blake2s256, Digest};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// All signals gathered for this session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Canonical identity; the only signal used for duplicate detection.
    pub primary: Identity,
    /// Hex Blake2s-256 over the sorted client characteristics.
    pub characteristic_hash: Option<String>,
    pub session_token: String,
}

/// Resolves the participant identity once and reuses it for the lifetime of
/// the resolver, so the identity cannot drift mid-vote.
///
/// A failed resolution is not cached, which lets the participant retry.
pub struct IdentityResolver<P> {
    provider: P,
    session_token: String,
    resolved: OnceCell<ResolvedIdentity>,
}

impl<P: FingerprintProvider> IdentityResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            session_token: hex::encode(rand::random::<[u8; 16]>()),
            resolved: OnceCell::new(),
        }
    }

    /// The canonical identity.
    pub async fn resolve_identity(&self) -> Result<Identity, IdentityError> {
        self.resolve().await.map(|r| r.primary.clone())
    }

    /// Every resolved signal, resolving on first call.
    pub async fn resolve(&self) -> Result<&ResolvedIdentity, IdentityError> {
        self.resolved.get_or_try_init(|| self.gather()).await
    }

    /// Signals from an earlier successful resolution, without resolving.
    pub fn cached(&self) -> Option<&ResolvedIdentity> {
        self.resolved.get()
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    async fn gather(&self) -> Result<ResolvedIdentity, IdentityError> {
        let provider = self.provider.name();
        let raw = self.provider.device_fingerprint().await.map_err(|e| {
            warn!(provider, error = %e, "device fingerprint failed");
            e
        })?;
        let primary = Identity::new(&raw).map_err(|_| {
            warn!(provider, "device fingerprint was empty");
            IdentityError::Unavailable(format!("{provider} returned an empty fingerprint"))
        })?;

        let characteristic_hash = match self.provider.characteristics().await {
            Ok(pairs) => Some(characteristic_hash(pairs)),
            Err(e) => {
                warn!(provider, error = %e, "characteristic fingerprint unavailable");
                None
            }
        };

        info!(provider, identity = %primary, "participant identity resolved");
        debug!(
            session_token = %self.session_token,
            characteristic_hash = ?characteristic_hash,
            "supplementary identity signals"
        );

        Ok(ResolvedIdentity {
            primary,
            characteristic_hash,
            session_token: self.session_token.clone(),
        })
    }
}

/// Order-independent digest of `name=value` lines.
fn characteristic_hash(mut pairs: Vec<(String, String)>) -> String {
    pairs.sort();
    let mut hasher = Blake2s256::new();
    for (name, value) in &pairs {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
