//! Wire types for the multi-party decryption coordinator (§4.5).

use std::time::Duration;

use reliquary_threshold::SecretShare;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many approving votes (or threshold shares) a decryption request
/// needs before the coordinator grants it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuorumLevel {
    /// Any single approving vote grants the request.
    SingleAgent,
    /// More than half of `DecryptionRequest::required_voters` must
    /// approve.
    Majority,
    /// Every entry in `required_voters` must approve.
    Unanimous,
    /// Grants once `reliquary-threshold` reconstructs the secret behind
    /// `DecryptionRequest::threshold_scheme_id` from submitted shares.
    ThresholdShares,
    /// A single vote from `DecryptionRequest::admin_id` grants the
    /// request immediately, bypassing the voter roster. Reserved for the
    /// emergency-override path.
    Administrative,
}

/// Keywords that make a `justification` eligible for the emergency
/// bypass path, matched case-insensitively as substrings.
pub const EMERGENCY_VOCABULARY: [&str; 5] = ["emergency", "critical", "urgent", "incident", "breach"];

/// Whether `justification` contains a word from [`EMERGENCY_VOCABULARY`].
pub fn justification_is_emergency_eligible(justification: &str) -> bool {
    let lower = justification.to_lowercase();
    EMERGENCY_VOCABULARY.iter().any(|kw| lower.contains(kw))
}

/// A pending request to decrypt (or otherwise release) a protected
/// vault datum, gated on the configured [`QuorumLevel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub request_id: Uuid,
    pub vault_id: String,
    pub data_id: String,
    pub requestor_id: String,
    pub justification: String,
    pub quorum_level: QuorumLevel,
    /// Agent ids whose approval counts toward `Majority`/`Unanimous`.
    /// Ignored for `SingleAgent`, `ThresholdShares`, and `Administrative`.
    pub required_voters: Vec<String>,
    /// The scheme shares must be submitted against, required when
    /// `quorum_level == ThresholdShares`.
    pub threshold_scheme_id: Option<Uuid>,
    /// The single identity authorized to grant via `Administrative`.
    pub admin_id: Option<String>,
    /// Whether the requestor has asked for the emergency bypass path.
    /// The caller is responsible for having already checked the
    /// requestor holds the emergency-override capability; the
    /// coordinator only checks the justification vocabulary.
    pub emergency: bool,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl DecryptionRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vault_id: impl Into<String>,
        data_id: impl Into<String>,
        requestor_id: impl Into<String>,
        justification: impl Into<String>,
        quorum_level: QuorumLevel,
        required_voters: Vec<String>,
        threshold_scheme_id: Option<Uuid>,
        admin_id: Option<String>,
        emergency: bool,
        created_at_ms: u64,
        ttl: Duration,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            vault_id: vault_id.into(),
            data_id: data_id.into(),
            requestor_id: requestor_id.into(),
            justification: justification.into(),
            quorum_level,
            required_voters,
            threshold_scheme_id,
            admin_id,
            emergency,
            created_at_ms,
            expires_at_ms: created_at_ms + ttl.as_millis() as u64,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Whether this request both asked for the emergency path and
    /// supplied an eligible justification (§4.5).
    pub fn is_emergency_eligible(&self) -> bool {
        self.emergency && justification_is_emergency_eligible(&self.justification)
    }
}

/// One voter's contribution to a pending request: either a plain
/// approve/deny, or (for `ThresholdShares`) a secret share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationVote {
    pub voter_id: String,
    pub approve: bool,
    pub share: Option<SecretShare>,
    pub cast_at_ms: u64,
}

/// Terminal or in-progress outcome for a [`DecryptionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub request_id: Uuid,
    pub granted: bool,
    pub finalized: bool,
    pub votes: Vec<AuthorizationVote>,
    pub reason: String,
    pub finalized_at_ms: Option<u64>,
    /// The released secret, present only once `granted` and the backend
    /// release (vault load + decrypt, or threshold reconstruction) has
    /// actually completed. A grant whose release step failed still
    /// reports `granted: true` (the quorum was genuinely met) but leaves
    /// this `None` and appends the failure to `reason`.
    #[serde(with = "hex_opt")]
    pub plaintext: Option<Vec<u8>>,
}

mod hex_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_ref().map(hex::encode).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
