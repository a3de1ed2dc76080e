//! Configuration surface (§6). Names and defaults are semantic, not wire-format.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables shared across the orchestrator, consensus driver, threshold
/// engine, and decrypt coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliquaryConfig {
    /// Per-request deadline.
    pub timeout: Duration,
    /// Maximum number of requests evaluated concurrently.
    pub max_concurrent_decisions: usize,
    /// Maximum number of requests allowed to wait in the back-pressure queue.
    pub max_queue: usize,
    /// Minimum winning-side confidence the orchestrator will accept.
    pub consensus_threshold: f64,
    /// Fraction of a request's timeout reserved for agent evaluation; the
    /// remainder is the consensus budget.
    pub evaluation_budget_fraction: f64,
    /// Bit length of the threshold-crypto prime modulus.
    pub security_level_bits: u32,
    /// Freshness window for secret shares before they are refresh-eligible.
    pub max_share_age: Duration,
    /// How long a pending decryption authorization request lives before
    /// auto-expiring.
    pub decrypt_request_lifetime: Duration,
    /// Whether the emergency-override path is enabled at all.
    pub emergency_override_enabled: bool,
    /// Upper bound on retained completed-decision records (LRU eviction).
    pub completed_decisions_capacity: usize,
    /// How many additional times the orchestrator re-runs evaluation and
    /// consensus for one request after a `ConsensusFailed` outcome,
    /// before giving up and returning the terminal failure (supplemental
    /// to §4.1, grounded in the original workflow's bounded retry loop).
    pub max_consensus_retries: u32,
}

impl Default for ReliquaryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_concurrent_decisions: 10,
            max_queue: 100,
            consensus_threshold: 0.6,
            evaluation_budget_fraction: 0.8,
            security_level_bits: 256,
            max_share_age: Duration::from_secs(3600),
            decrypt_request_lifetime: Duration::from_secs(300),
            emergency_override_enabled: true,
            completed_decisions_capacity: 10_000,
            max_consensus_retries: 2,
        }
    }
}

impl ReliquaryConfig {
    /// Split a request's own timeout into `(evaluation_budget, consensus_budget)`
    /// per the 80/20 default split (§4.1).
    pub fn split_budget(&self, request_timeout: Duration) -> (Duration, Duration) {
        let total_ms = request_timeout.as_millis() as f64;
        let eval_ms = (total_ms * self.evaluation_budget_fraction).round() as u64;
        let eval = Duration::from_millis(eval_ms);
        let consensus = request_timeout.saturating_sub(eval);
        (eval, consensus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = ReliquaryConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert_eq!(cfg.max_concurrent_decisions, 10);
        assert_eq!(cfg.consensus_threshold, 0.6);
        assert_eq!(cfg.evaluation_budget_fraction, 0.8);
    }

    #[test]
    fn split_budget_is_eighty_twenty() {
        let cfg = ReliquaryConfig::default();
        let (eval, consensus) = cfg.split_budget(Duration::from_secs(10));
        assert_eq!(eval, Duration::from_secs(8));
        assert_eq!(consensus, Duration::from_secs(2));
    }
}
