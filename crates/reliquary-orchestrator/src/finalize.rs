//! The weighted-tally finalization algorithm (§4.1).

use reliquary_core::{AgentVerdict, Decision};

/// Tally breakdown plus the finalized decision and confidence.
#[derive(Debug, Clone, Copy)]
pub struct Tally {
    pub allow_count: usize,
    pub deny_count: usize,
    pub allow_weight: f64,
    pub deny_weight: f64,
    pub decision: Decision,
    pub confidence: f64,
}

/// Apply the weighted-majority rule over `verdicts`:
///
/// `ALLOW` iff `allow_count > deny_count` AND `allow_weight > deny_weight`;
/// any tie in either dimension resolves to `DENY` (the safety default).
pub fn tally(verdicts: &[AgentVerdict]) -> Tally {
    let mut allow_count = 0usize;
    let mut deny_count = 0usize;
    let mut allow_weight = 0.0f64;
    let mut deny_weight = 0.0f64;

    for verdict in verdicts {
        match verdict.decision {
            Decision::Allow => {
                allow_count += 1;
                allow_weight += verdict.trust_score;
            }
            Decision::Deny => {
                deny_count += 1;
                deny_weight += verdict.trust_score;
            }
        }
    }

    let decision = if allow_count > deny_count && allow_weight > deny_weight {
        Decision::Allow
    } else {
        Decision::Deny
    };

    let denom = allow_weight + deny_weight;
    let winner_weight = match decision {
        Decision::Allow => allow_weight,
        Decision::Deny => deny_weight,
    };
    let confidence = if denom > 0.0 { winner_weight / denom } else { 0.0 };

    Tally {
        allow_count,
        deny_count,
        allow_weight,
        deny_weight,
        decision,
        confidence,
    }
}
