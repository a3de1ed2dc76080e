//! The per-request phase state machine (§4.1, §5): phase transitions are
//! linear and never regress. [`DecisionStatus`] already carries the
//! state names from the spec table; this module just enforces the legal
//! edges between them so a coding mistake elsewhere can't silently skip
//! or rewind a request's lifecycle.

use reliquary_core::DecisionStatus;

/// Whether `from -> to` is a legal phase transition.
///
/// `PENDING -> EVALUATING -> (CONSENSUS_REACHED | CONSENSUS_FAILED |
/// TIMEOUT) -> (EXECUTED | FAILED)`, with `TIMEOUT` additionally
/// reachable directly from `PENDING` or `EVALUATING` when the overall
/// deadline elapses before consensus is even attempted.
pub fn is_legal_transition(from: DecisionStatus, to: DecisionStatus) -> bool {
    use DecisionStatus::*;
    matches!(
        (from, to),
        (Pending, Evaluating)
            | (Pending, Timeout)
            | (Pending, Failed)
            | (Evaluating, ConsensusReached)
            | (Evaluating, ConsensusFailed)
            | (Evaluating, Timeout)
            | (Evaluating, Failed)
            | (ConsensusReached, Executed)
            | (ConsensusReached, Failed)
            | (ConsensusFailed, Failed)
            | (ConsensusFailed, Executed)
    )
}

/// A request's phase cursor. Exists so the orchestrator has one place to
/// route `debug!`/`warn!` phase-transition logging through and to assert
/// against [`is_legal_transition`] in tests.
pub struct PhaseCursor {
    current: DecisionStatus,
}

impl PhaseCursor {
    pub fn new() -> Self {
        Self {
            current: DecisionStatus::Pending,
        }
    }

    pub fn current(&self) -> DecisionStatus {
        self.current
    }

    /// Advance to `to`. Panics on an illegal transition — a programming
    /// error in the orchestrator, not a runtime condition callers should
    /// handle.
    pub fn advance(&mut self, to: DecisionStatus) {
        assert!(
            is_legal_transition(self.current, to),
            "illegal phase transition {:?} -> {:?}",
            self.current,
            to
        );
        self.current = to;
    }
}

impl Default for PhaseCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DecisionStatus::*;

    #[test]
    fn happy_path_is_legal() {
        let mut cursor = PhaseCursor::new();
        cursor.advance(Evaluating);
        cursor.advance(ConsensusReached);
        cursor.advance(Executed);
        assert_eq!(cursor.current(), Executed);
    }

    #[test]
    fn phases_never_regress() {
        assert!(!is_legal_transition(ConsensusReached, Evaluating));
        assert!(!is_legal_transition(Executed, Pending));
    }

    #[test]
    #[should_panic(expected = "illegal phase transition")]
    fn advancing_illegally_panics() {
        let mut cursor = PhaseCursor::new();
        cursor.advance(Executed);
    }
}
