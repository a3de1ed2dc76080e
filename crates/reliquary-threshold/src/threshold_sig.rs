//! Threshold signatures (§4.3).
//!
//! The spec documents this scheme as a placeholder: partial signatures
//! combine multiplicatively mod `p` rather than through a real pairing-
//! or Schnorr-based aggregate signature. It lets the orchestrator and
//! decryption coordinator exercise a "k-of-n signs" workflow end to end
//! without committing to a specific signature curve; swapping in a real
//! aggregate scheme (FROST, BLS) is a follow-up, not something this
//! module's callers need to know about.

use num_bigint::BigUint;
use reliquary_core::{Result, ReliquaryError};

use crate::scheme::ThresholdScheme;
use crate::share::SecretShare;

/// One share's signature over `message_digest`: `value^digest mod p`.
#[derive(Debug, Clone)]
pub struct PartialSignature {
    pub index: u32,
    pub value: BigUint,
}

/// Produce a partial signature for `share` over `message_digest`.
pub fn sign_partial(
    scheme: &ThresholdScheme,
    share: &SecretShare,
    message_digest: &BigUint,
) -> PartialSignature {
    let value = share.value.modpow(message_digest, &scheme.prime_modulus);
    PartialSignature {
        index: share.index,
        value,
    }
}

/// Combine `k` or more partial signatures into a single aggregate value
/// by multiplying them mod `p`. Requires at least `scheme.threshold`
/// partials.
pub fn combine(scheme: &ThresholdScheme, partials: &[PartialSignature]) -> Result<BigUint> {
    let k = scheme.threshold as usize;
    if partials.len() < k {
        return Err(ReliquaryError::insufficient_shares(format!(
            "need {k} partial signatures, have {}",
            partials.len()
        )));
    }
    let p = &scheme.prime_modulus;
    let mut combined = BigUint::from(1u32);
    for partial in &partials[..k] {
        combined = (combined * &partial.value) % p;
    }
    Ok(combined)
}
