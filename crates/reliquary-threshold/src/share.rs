//! Share, reconstruction, and validation result types (§4.3).

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Per-share validation outcome, reported alongside reconstruction
/// results so a caller can tell which specific shares were unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// The share matches its commitment (or carries no commitment to
    /// check against, for plain Shamir/MPC schemes).
    Valid,
    /// The share's value does not match its VSS commitment.
    Corrupted,
    /// No share was present at this index.
    Missing,
}

/// A single share of a secret under some [`crate::scheme::ThresholdScheme`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretShare {
    pub scheme_id: Uuid,
    /// 1-indexed share position; `x` coordinate for Shamir-family
    /// interpolation.
    pub index: u32,
    #[serde(with = "crate::bigint_codec::biguint")]
    pub value: BigUint,
    /// VSS Pedersen commitment to this share's coefficients, present only
    /// for [`crate::scheme::SchemeType::Vss`] schemes.
    #[serde(with = "crate::bigint_codec::biguint_vec_opt")]
    pub commitment: Option<Vec<BigUint>>,
}

impl SecretShare {
    pub fn new(scheme_id: Uuid, index: u32, value: BigUint) -> Self {
        Self {
            scheme_id,
            index,
            value,
            commitment: None,
        }
    }

    pub fn with_commitment(mut self, commitment: Vec<BigUint>) -> Self {
        self.commitment = Some(commitment);
        self
    }
}

/// Result of a `reconstruct_secret` call: the recovered value (if
/// successful), a per-share validation breakdown, and whether the
/// operation as a whole succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionResult {
    pub success: bool,
    #[serde(with = "crate::bigint_codec::biguint_opt")]
    pub secret: Option<BigUint>,
    /// Validation status for each share index supplied to the
    /// reconstruction call, in the order supplied.
    pub validation_per_share: Vec<ValidationStatus>,
    pub shares_used: usize,
    pub shares_required: u32,
    /// The underlying failure, present only when `success` is `false`.
    pub error: Option<String>,
    pub reconstruction_time: Duration,
}
