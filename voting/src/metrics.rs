//! Prometheus counters for vote submission and category unlocking.
//!
//! [`VotingMetrics`] owns a dedicated [`Registry`] that an admin surface can
//! encode into the Prometheus text exposition format.

use prometheus::{register_int_counter_with_registry, Encoder, IntCounter, Opts, Registry, TextEncoder};
use tracing::warn;

pub struct VotingMetrics {
    pub registry: Registry,

    /// Votes persisted by the store.
    pub votes_accepted: IntCounter,
    /// Submissions answered with "already voted", optimistic or authoritative.
    pub votes_duplicate: IntCounter,
    /// Submissions rejected for any other business rule.
    pub votes_rejected: IntCounter,
    /// Completed unlock operations.
    pub unlocks: IntCounter,
    /// Unlocks that lost a race against another unlock.
    pub unlock_conflicts: IntCounter,
    /// Reads that found more than one unlocked category.
    pub consistency_anomalies: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("counter names are static and unique")
}

impl VotingMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_accepted = counter(
            &registry,
            "award_votes_accepted_total",
            "Votes persisted by the store",
        );
        let votes_duplicate = counter(
            &registry,
            "award_votes_duplicate_total",
            "Vote submissions rejected as already voted",
        );
        let votes_rejected = counter(
            &registry,
            "award_votes_rejected_total",
            "Vote submissions rejected by other business rules",
        );
        let unlocks = counter(
            &registry,
            "award_unlocks_total",
            "Categories unlocked by the admin",
        );
        let unlock_conflicts = counter(
            &registry,
            "award_unlock_conflicts_total",
            "Unlocks that lost a race to another unlock",
        );
        let consistency_anomalies = counter(
            &registry,
            "award_consistency_anomalies_total",
            "Reads that found more than one unlocked category",
        );

        Self {
            registry,
            votes_accepted,
            votes_duplicate,
            votes_rejected,
            unlocks,
            unlock_conflicts,
            consistency_anomalies,
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for VotingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
