//! Per-replica consensus state (§3).

use crate::messages::{ConsensusMessage, MessageType};
use crate::signer::Signer;
use reliquary_core::{ReliquaryError, Result};
use std::collections::BTreeMap;

/// Phase a replica occupies for its active `(view, sequence)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusPhase {
    /// Awaiting (or just accepted) the leader's proposal.
    PrePrepare,
    /// Collecting matching `PREPARE` votes.
    Prepare,
    /// Collecting matching `COMMIT` votes.
    Commit,
    /// `2f+1` commits observed; the value is final for this `(view, seq)`.
    Decided,
    /// The phase budget elapsed without reaching `Decided`.
    Timeout,
}

/// One replica's view of an in-flight `(view, sequence)` instance.
///
/// Owned exclusively by the replica it belongs to; mutated only through
/// [`ConsensusState::accept_pre_prepare`], [`ConsensusState::add_prepare`],
/// and [`ConsensusState::add_commit`].
#[derive(Debug, Clone)]
pub struct ConsensusState {
    /// The view this instance is running in.
    pub current_view: u64,
    /// The sequence number being agreed on.
    pub current_sequence: u64,
    /// This replica's current phase.
    pub current_phase: ConsensusPhase,
    /// Id of the leader for `current_view`.
    pub leader_id: String,
    /// Accepted `PRE_PREPARE` digest for `(current_view, current_sequence)`,
    /// once seen. A second, distinct digest for the same pair is
    /// equivocation evidence (§4.2) and is rejected rather than overwriting
    /// this field.
    pub accepted_digest: Option<[u8; 32]>,
    /// `PREPARE` messages received, keyed by sender.
    pub prepare_set: BTreeMap<String, ConsensusMessage>,
    /// `COMMIT` messages received, keyed by sender.
    pub commit_set: BTreeMap<String, ConsensusMessage>,
    /// Highest sequence number this replica has fully decided and
    /// checkpointed.
    pub last_checkpoint: u64,
}

impl ConsensusState {
    /// A fresh instance for `(view, sequence)` with `leader_id` as the
    /// view's deterministic leader.
    pub fn new(view: u64, sequence: u64, leader_id: impl Into<String>) -> Self {
        Self {
            current_view: view,
            current_sequence: sequence,
            current_phase: ConsensusPhase::PrePrepare,
            leader_id: leader_id.into(),
            accepted_digest: None,
            prepare_set: BTreeMap::new(),
            commit_set: BTreeMap::new(),
            last_checkpoint: 0,
        }
    }

    /// Accept the first `PRE_PREPARE` digest seen for this instance.
    /// Returns `false` if a distinct digest was already accepted
    /// (leader equivocation evidence).
    pub fn accept_pre_prepare(&mut self, digest: [u8; 32]) -> bool {
        match self.accepted_digest {
            None => {
                self.accepted_digest = Some(digest);
                self.current_phase = ConsensusPhase::Prepare;
                true
            }
            Some(existing) => existing == digest,
        }
    }

    /// Record a `PREPARE` vote. Returns `true` once the matching set first
    /// reaches `2f+1` (including this replica's own vote).
    pub fn add_prepare(&mut self, msg: ConsensusMessage, quorum: usize) -> bool {
        let Some(digest) = self.accepted_digest else {
            return false;
        };
        if msg.digest != digest {
            return false;
        }
        let was_below = self.prepare_set.len() < quorum;
        self.prepare_set.insert(msg.sender_id.clone(), msg);
        let now_at_or_above = self.prepare_set.len() >= quorum;
        if was_below && now_at_or_above {
            self.current_phase = ConsensusPhase::Commit;
            true
        } else {
            false
        }
    }

    /// Record a `COMMIT` vote. Returns `true` once the matching set first
    /// reaches `2f+1`.
    pub fn add_commit(&mut self, msg: ConsensusMessage, quorum: usize) -> bool {
        let Some(digest) = self.accepted_digest else {
            return false;
        };
        if msg.digest != digest {
            return false;
        }
        let was_below = self.commit_set.len() < quorum;
        self.commit_set.insert(msg.sender_id.clone(), msg);
        let now_at_or_above = self.commit_set.len() >= quorum;
        if was_below && now_at_or_above {
            self.current_phase = ConsensusPhase::Decided;
            true
        } else {
            false
        }
    }

    /// Admit one incoming protocol message (§4.2's `receive` operation).
    /// Verification is mandatory on every message: a bad digest or a
    /// signature that doesn't check out against `signer` is rejected
    /// outright rather than silently dropped, so a caller can tell
    /// equivocation/forgery apart from an ordinary not-yet-prepared vote.
    pub fn receive(&mut self, msg: ConsensusMessage, quorum: usize, signer: &dyn Signer) -> Result<bool> {
        if !msg.digest_is_valid() {
            return Err(ReliquaryError::consensus_failed(format!(
                "invalid digest on {:?} from {}",
                msg.msg_type, msg.sender_id
            )));
        }
        if !signer.verify(&msg.sender_id, &msg.digest, &msg.signature) {
            return Err(ReliquaryError::consensus_failed(format!(
                "signature verification failed for {:?} from {}",
                msg.msg_type, msg.sender_id
            )));
        }
        Ok(match msg.msg_type {
            MessageType::PrePrepare => self.accept_pre_prepare(msg.digest),
            MessageType::Prepare => self.add_prepare(msg, quorum),
            MessageType::Commit => self.add_commit(msg, quorum),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageType;
    use crate::signer::HmacSigner;

    fn prepare_msg(sender: &str, view: u64, seq: u64, payload: Vec<u8>) -> ConsensusMessage {
        ConsensusMessage::new(MessageType::Prepare, view, seq, sender, 0, payload)
    }

    #[test]
    fn second_distinct_pre_prepare_is_rejected() {
        let mut state = ConsensusState::new(0, 1, "leader");
        assert!(state.accept_pre_prepare([1u8; 32]));
        assert!(!state.accept_pre_prepare([2u8; 32]));
        assert_eq!(state.accepted_digest, Some([1u8; 32]));
    }

    #[test]
    fn prepare_quorum_triggers_once() {
        let mut state = ConsensusState::new(0, 1, "leader");
        let digest = [9u8; 32];
        state.accept_pre_prepare(digest);

        let mut msg_for = |id: &str| {
            let mut m = prepare_msg(id, 0, 1, vec![]);
            m.digest = digest;
            m
        };

        assert!(!state.add_prepare(msg_for("a1"), 3));
        assert!(!state.add_prepare(msg_for("a2"), 3));
        assert!(state.add_prepare(msg_for("a3"), 3));
        // Further votes don't re-trigger.
        assert!(!state.add_prepare(msg_for("a4"), 3));
        assert_eq!(state.current_phase, ConsensusPhase::Commit);
    }

    #[test]
    fn non_matching_digest_prepare_is_ignored() {
        let mut state = ConsensusState::new(0, 1, "leader");
        state.accept_pre_prepare([1u8; 32]);
        let mut wrong = prepare_msg("a1", 0, 1, vec![]);
        wrong.digest = [2u8; 32];
        assert!(!state.add_prepare(wrong, 1));
        assert!(state.prepare_set.is_empty());
    }

    #[test]
    fn receive_admits_a_properly_signed_prepare() {
        let signer = HmacSigner::from_agent_ids(["a1"]);
        let mut state = ConsensusState::new(0, 1, "leader");
        state.accept_pre_prepare([9u8; 32]);

        let mut msg = prepare_msg("a1", 0, 1, vec![]);
        msg.digest = [9u8; 32];
        msg.signature = signer.sign("a1", &msg.digest);

        assert!(state.receive(msg, 1, &signer).unwrap());
        assert_eq!(state.current_phase, ConsensusPhase::Commit);
    }

    #[test]
    fn receive_rejects_an_unsigned_prepare() {
        let signer = HmacSigner::from_agent_ids(["a1"]);
        let mut state = ConsensusState::new(0, 1, "leader");
        state.accept_pre_prepare([9u8; 32]);

        let mut msg = prepare_msg("a1", 0, 1, vec![]);
        msg.digest = [9u8; 32];
        // no signature attached

        let err = state.receive(msg, 1, &signer).unwrap_err();
        assert!(matches!(err, ReliquaryError::ConsensusFailed { .. }));
        assert!(state.prepare_set.is_empty());
    }

    #[test]
    fn receive_rejects_a_forged_sender() {
        let signer = HmacSigner::from_agent_ids(["a1", "a2"]);
        let mut state = ConsensusState::new(0, 1, "leader");
        state.accept_pre_prepare([9u8; 32]);

        let mut msg = prepare_msg("a1", 0, 1, vec![]);
        msg.digest = [9u8; 32];
        // signed by a2's key but claiming to be a1
        msg.signature = signer.sign("a2", &msg.digest);

        assert!(state.receive(msg, 1, &signer).is_err());
    }
}
