//! Wire messages exchanged by the BFT consensus driver (§3, §4.2).
//!
//! The spec does not mandate a wire encoding, only that the digest be a pure
//! function of a canonical serialization of the other fields. We use
//! `bincode` over a field-ordered struct, which is deterministic for the
//! types below.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Phase tag carried by a [`ConsensusMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Client (orchestrator) request to the leader.
    Request,
    /// Leader's proposal for `(view, sequence)`.
    PrePrepare,
    /// A replica's acknowledgement of a `PrePrepare`.
    Prepare,
    /// A replica's vote to commit a prepared value.
    Commit,
    /// A replica's vote to abandon the current view.
    ViewChange,
    /// The new leader's evidence-backed resumption of agreement.
    NewView,
    /// Periodic state snapshot marker, for log compaction.
    Checkpoint,
    /// Liveness probe between replicas.
    Heartbeat,
}

/// A 32-byte digest over the canonical serialization of a message's
/// non-signature, non-digest fields.
pub type Digest32 = [u8; 32];

/// A single protocol message (§3). `digest` is a pure function of every
/// other field; mutating any field without recomputing it invalidates the
/// message and `receive` will drop it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusMessage {
    /// Which phase of the protocol this message belongs to.
    pub msg_type: MessageType,
    /// Monotonic, non-negative view number.
    pub view: u64,
    /// Monotonic sequence number within the view.
    pub sequence: u64,
    /// Id of the agent that authored the message.
    pub sender_id: String,
    /// Wall-clock send time, milliseconds since epoch.
    pub timestamp_ms: u64,
    /// Opaque proposed value (the decision under agreement) or evidence
    /// payload, depending on `msg_type`.
    pub payload: Vec<u8>,
    /// Authenticator over `digest`, per the signer in use (§4.2 notes this
    /// is deliberately abstracted behind a signer interface).
    pub signature: Vec<u8>,
    /// SHA-256 digest over the canonical serialization of every field above.
    pub digest: Digest32,
}

#[derive(Serialize)]
struct DigestInput<'a> {
    msg_type: MessageType,
    view: u64,
    sequence: u64,
    sender_id: &'a str,
    timestamp_ms: u64,
    payload: &'a [u8],
}

impl ConsensusMessage {
    /// Build a message and stamp it with its own digest. `signature` must be
    /// attached separately by the caller's signer.
    pub fn new(
        msg_type: MessageType,
        view: u64,
        sequence: u64,
        sender_id: impl Into<String>,
        timestamp_ms: u64,
        payload: Vec<u8>,
    ) -> Self {
        let sender_id = sender_id.into();
        let digest = compute_digest(msg_type, view, sequence, &sender_id, timestamp_ms, &payload);
        Self {
            msg_type,
            view,
            sequence,
            sender_id,
            timestamp_ms,
            payload,
            signature: Vec::new(),
            digest,
        }
    }

    /// Recompute the digest from the current field values and compare it
    /// against the stored one.
    pub fn digest_is_valid(&self) -> bool {
        let expected = compute_digest(
            self.msg_type,
            self.view,
            self.sequence,
            &self.sender_id,
            self.timestamp_ms,
            &self.payload,
        );
        expected == self.digest
    }

    /// Deduplication key: agents drop repeats of `(sender_id, view,
    /// sequence, msg_type)` (§4.2).
    pub fn dedup_key(&self) -> (String, u64, u64, MessageType) {
        (self.sender_id.clone(), self.view, self.sequence, self.msg_type)
    }
}

fn compute_digest(
    msg_type: MessageType,
    view: u64,
    sequence: u64,
    sender_id: &str,
    timestamp_ms: u64,
    payload: &[u8],
) -> Digest32 {
    let input = DigestInput {
        msg_type,
        view,
        sequence,
        sender_id,
        timestamp_ms,
        payload,
    };
    let bytes = bincode::serialize(&input).expect("DigestInput serialization cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_pure_function_of_fields() {
        let msg = ConsensusMessage::new(MessageType::PrePrepare, 0, 1, "leader", 0, vec![1, 2, 3]);
        assert!(msg.digest_is_valid());
    }

    #[test]
    fn mutated_payload_invalidates_digest() {
        let mut msg = ConsensusMessage::new(MessageType::Prepare, 0, 1, "a1", 0, vec![1, 2, 3]);
        msg.payload.push(4);
        assert!(!msg.digest_is_valid());
    }

    #[test]
    fn dedup_key_ignores_payload_and_timestamp() {
        let a = ConsensusMessage::new(MessageType::Commit, 2, 5, "a1", 10, vec![1]);
        let b = ConsensusMessage::new(MessageType::Commit, 2, 5, "a1", 99, vec![9, 9]);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
