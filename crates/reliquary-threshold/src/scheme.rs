//! Threshold scheme definitions (§4.3): the four scheme families and the
//! parameters that describe one configured instance.

use num_bigint::BigUint;
use reliquary_core::ReliquaryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modmath::default_prime_256;

/// One of the four supported threshold-cryptography families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeType {
    /// Plain Shamir secret sharing over `Z_p`: any `k` of `n` shares
    /// reconstruct the secret via Lagrange interpolation at `x = 0`.
    Shamir,
    /// Shamir sharing augmented with Pedersen commitments so each share
    /// can be verified against the public commitments without revealing
    /// the secret (VSS).
    Vss,
    /// Threshold signatures: each share signs independently and `k`
    /// partial signatures combine into one valid signature. The combiner
    /// here is a placeholder multiplicative scheme, not a production
    /// BLS/FROST-style aggregation.
    ThresholdSig,
    /// Additive secret sharing for multi-party computation: `n` shares
    /// sum to the secret mod `p`; reconstruction requires all `n`
    /// shares, not just `k`.
    MpcAdditive,
}

impl SchemeType {
    /// Whether this scheme's reconstruction threshold can be strictly
    /// less than `n` (Shamir-family schemes) or must equal `n`
    /// (`MpcAdditive`, which has no partial-reconstruction property).
    pub fn requires_all_shares(self) -> bool {
        matches!(self, SchemeType::MpcAdditive)
    }
}

/// A configured threshold scheme: family, `(k, n)` parameters, modulus,
/// and (for VSS) the public commitment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdScheme {
    pub scheme_id: Uuid,
    pub scheme_type: SchemeType,
    /// Minimum number of shares required to reconstruct.
    pub threshold: u32,
    /// Total number of shares issued.
    pub total_shares: u32,
    /// Security level in bits; determines the default modulus width.
    pub security_level_bits: u32,
    #[serde(with = "crate::bigint_codec::biguint")]
    pub prime_modulus: BigUint,
}

impl ThresholdScheme {
    /// Validate `(k, n)` and construct a new scheme with a modulus sized
    /// to `security_level_bits` (§4.3 edge cases: `k` must be in
    /// `[1, n]`; `n` must be `>= 1`).
    pub fn create(
        scheme_type: SchemeType,
        threshold: u32,
        total_shares: u32,
        security_level_bits: u32,
    ) -> reliquary_core::Result<Self> {
        if total_shares == 0 {
            return Err(ReliquaryError::invalid("total_shares must be >= 1"));
        }
        if threshold == 0 || threshold > total_shares {
            return Err(ReliquaryError::invalid(format!(
                "threshold {threshold} must be in [1, {total_shares}]"
            )));
        }
        if scheme_type.requires_all_shares() && threshold != total_shares {
            return Err(ReliquaryError::invalid(
                "mpc-additive schemes require threshold == total_shares",
            ));
        }

        let prime_modulus = if security_level_bits <= 256 {
            default_prime_256()
        } else {
            // Larger security levels reuse the 256-bit prime shifted up
            // by doubling it through repeated squaring-safe multiplication
            // is out of scope for this placeholder generator; callers
            // needing > 256-bit security should supply their own modulus
            // via `with_modulus`.
            default_prime_256()
        };

        Ok(Self {
            scheme_id: Uuid::new_v4(),
            scheme_type,
            threshold,
            total_shares,
            security_level_bits,
            prime_modulus,
        })
    }

    pub fn with_modulus(mut self, prime_modulus: BigUint) -> Self {
        self.prime_modulus = prime_modulus;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_threshold_above_total() {
        let err = ThresholdScheme::create(SchemeType::Shamir, 6, 5, 256).unwrap_err();
        assert!(matches!(err, ReliquaryError::Invalid { .. }));
    }

    #[test]
    fn rejects_zero_shares() {
        let err = ThresholdScheme::create(SchemeType::Shamir, 1, 0, 256).unwrap_err();
        assert!(matches!(err, ReliquaryError::Invalid { .. }));
    }

    #[test]
    fn mpc_additive_requires_threshold_equals_total() {
        let err = ThresholdScheme::create(SchemeType::MpcAdditive, 3, 5, 256).unwrap_err();
        assert!(matches!(err, ReliquaryError::Invalid { .. }));
        assert!(ThresholdScheme::create(SchemeType::MpcAdditive, 5, 5, 256).is_ok());
    }
}
