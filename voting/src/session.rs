//! Per-participant session state.
//!
//! One [`ParticipantSession`] exists per participant client process. It owns
//! the cached identity, the voted-set cache (inside its gateway) and the
//! cached active category, and is torn down explicitly.

use crate::{VoteGateway, VotingError};
use award_identity::{FingerprintProvider, IdentityResolver};
use award_types::{Category, Identity, Vote};
use tracing::{debug, info};

pub struct ParticipantSession<P> {
    resolver: IdentityResolver<P>,
    gateway: VoteGateway,
    active: Option<Category>,
}

impl<P: FingerprintProvider> ParticipantSession<P> {
    pub fn new(resolver: IdentityResolver<P>, gateway: VoteGateway) -> Self {
        Self {
            resolver,
            gateway,
            active: None,
        }
    }

    /// Replace the cached active category, typically from a live view update.
    pub fn set_active(&mut self, category: Option<Category>) {
        debug!(active = ?category.as_ref().map(|c| c.id), "active category changed");
        self.active = category;
    }

    /// The category currently shown, or `None` for the waiting screen.
    pub fn active(&self) -> Option<&Category> {
        self.active.as_ref()
    }

    pub async fn identity(&self) -> Result<Identity, VotingError> {
        Ok(self.resolver.resolve_identity().await?)
    }

    /// Vote for `option` in the active category.
    ///
    /// Identity is resolved first; if that fails nothing reaches the store.
    /// A `CategoryLocked` answer clears the cached active category, so the
    /// participant falls back to the waiting screen until the live view
    /// reports the next one.
    pub async fn cast(&mut self, option: &str) -> Result<Vote, VotingError> {
        let identity = self.identity().await?;
        let category_id = self
            .active
            .as_ref()
            .map(|c| c.id)
            .ok_or(VotingError::NoActiveCategory)?;

        let result = self.gateway.submit_vote(category_id, option, &identity).await;
        if let Err(VotingError::CategoryLocked(locked)) = &result {
            debug!(category = %locked, "active category closed, clearing");
            self.active = None;
        }
        result
    }

    /// Whether this participant already voted in the active category.
    /// `false` while nothing is active.
    pub async fn has_voted_active(&self) -> Result<bool, VotingError> {
        let Some(category) = self.active.as_ref() else {
            return Ok(false);
        };
        let identity = self.identity().await?;
        self.gateway.has_voted(category.id, &identity).await
    }

    pub fn gateway(&self) -> &VoteGateway {
        &self.gateway
    }

    /// End the session, dropping every cache it owns.
    pub fn teardown(self) {
        info!(
            session_token = %self.resolver.session_token(),
            "participant session closed"
        );
    }
}
