//! Modular arithmetic helpers shared by the Shamir, VSS, threshold-signature,
//! and MPC-additive scheme implementations (§4.3).

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};

/// A well-known 256-bit prime, reused as the default modulus for
/// `security_level_bits = 256`.
pub fn default_prime_256() -> BigUint {
    BigUint::parse_bytes(
        b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
        16,
    )
    .expect("hard-coded constant is valid hex")
}

/// Modular exponentiation `base^exp mod modulus`.
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Modular multiplicative inverse of `a` mod the prime `modulus`, via
/// Fermat's little theorem: `a^(p-2) mod p`.
///
/// Note: `num-bigint`'s `modpow` is not a constant-time implementation.
/// The spec calls for a constant-time inverse when the secrecy of a share
/// depends on it; callers handling long-lived secrets should swap in a
/// constant-time bignum backend before using this in an adversarial
/// network setting. Documented as an open item in `DESIGN.md`.
pub fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    if a.is_zero() {
        return None;
    }
    let two = BigUint::from(2u32);
    let exp = modulus - &two;
    Some(mod_pow(a, &exp, modulus))
}

/// Sample a uniform random value in `[0, modulus)`.
pub fn random_below(modulus: &BigUint) -> BigUint {
    let mut rng = rand::thread_rng();
    rng.gen_biguint_below(modulus)
}

/// Sample `count` uniform random non-zero values in `[1, modulus)`, used
/// for Shamir polynomial coefficients and MPC additive masks.
pub fn random_nonzero_values(count: usize, modulus: &BigUint) -> Vec<BigUint> {
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let v = random_below(modulus);
        if !v.is_zero() {
            out.push(v);
        }
    }
    out
}

/// Encode a `BigUint` as fixed-width big-endian bytes for signing/hash
/// input, matching a canonical serialization regardless of leading zeros.
pub fn to_fixed_bytes(value: &BigUint, width: usize) -> Vec<u8> {
    let mut bytes = value.to_bytes_be();
    if bytes.len() > width {
        // Should not happen for values already reduced mod a `width`-byte
        // modulus; truncate defensively rather than panic.
        bytes = bytes[bytes.len() - width..].to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}

/// A small multiplicative generator, used by the VSS and threshold
/// signature placeholder schemes (§4.3 table). `2` suffices for the toy
/// commitment scheme specified here; production deployments should use a
/// verified generator of a prime-order subgroup.
pub fn default_generator() -> BigUint {
    BigUint::from(2u32)
}

/// The multiplicative identity, `1`.
pub fn one() -> BigUint {
    BigUint::one()
}
