//! Plain Shamir secret sharing over `Z_p` (§4.3).
//!
//! A degree-`(k-1)` polynomial `f(x) = secret + a1*x + ... + a_{k-1}*x^(k-1)`
//! is sampled with random coefficients; share `i` is `(i, f(i))` for
//! `i = 1..=n`. Any `k` shares recover `secret = f(0)` via Lagrange
//! interpolation.

use num_bigint::BigUint;
use num_traits::Zero;
use reliquary_core::{Result, ReliquaryError};

use crate::modmath::{mod_inverse, random_nonzero_values};
use crate::scheme::ThresholdScheme;
use crate::share::SecretShare;

/// Split `secret` into `scheme.total_shares` Shamir shares requiring
/// `scheme.threshold` to reconstruct.
pub fn split(scheme: &ThresholdScheme, secret: &BigUint) -> Result<Vec<SecretShare>> {
    let p = &scheme.prime_modulus;
    if secret >= p {
        return Err(ReliquaryError::invalid(
            "secret must be smaller than the scheme's prime modulus",
        ));
    }

    let degree = scheme.threshold as usize - 1;
    let coeffs = random_nonzero_values(degree.max(1), p);

    let mut shares = Vec::with_capacity(scheme.total_shares as usize);
    for i in 1..=scheme.total_shares {
        let x = BigUint::from(i);
        let y = eval_polynomial(secret, &coeffs[..degree], &x, p);
        shares.push(SecretShare::new(scheme.scheme_id, i, y));
    }
    Ok(shares)
}

/// Evaluate `secret + sum(coeffs[j] * x^(j+1)) mod p`.
fn eval_polynomial(secret: &BigUint, coeffs: &[BigUint], x: &BigUint, p: &BigUint) -> BigUint {
    let mut acc = secret.clone();
    let mut power = x.clone();
    for c in coeffs {
        acc = (acc + c * &power) % p;
        power = (&power * x) % p;
    }
    acc
}

/// Reconstruct the secret at `x = 0` from `shares` via Lagrange
/// interpolation. Requires at least `scheme.threshold` distinct-index
/// shares; callers are responsible for filtering out already-known-bad
/// shares before calling this (see `engine::reconstruct_secret`, which
/// layers VSS validation on top for VSS schemes).
pub fn reconstruct(scheme: &ThresholdScheme, shares: &[SecretShare]) -> Result<BigUint> {
    let k = scheme.threshold as usize;
    if shares.len() < k {
        return Err(ReliquaryError::insufficient_shares(format!(
            "need {k} shares, have {}",
            shares.len()
        )));
    }
    let p = &scheme.prime_modulus;
    let used = &shares[..k];

    let mut secret = BigUint::zero();
    for (j, share_j) in used.iter().enumerate() {
        let xj = BigUint::from(share_j.index);
        let mut numerator = BigUint::from(1u32);
        let mut denominator = BigUint::from(1u32);
        for (m, share_m) in used.iter().enumerate() {
            if m == j {
                continue;
            }
            let xm = BigUint::from(share_m.index);
            numerator = (numerator * &xm) % p;
            // denominator term is (xm - xj) mod p; compute via p-complement
            // to stay in non-negative BigUint arithmetic.
            let diff = if xm >= xj {
                (&xm - &xj) % p
            } else {
                (p - ((&xj - &xm) % p)) % p
            };
            denominator = (denominator * diff) % p;
        }
        let inv = mod_inverse(&denominator, p)
            .ok_or_else(|| ReliquaryError::crypto("degenerate Lagrange denominator"))?;
        let lagrange_coeff = (numerator * inv) % p;
        secret = (secret + &share_j.value * lagrange_coeff) % p;
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::SchemeType;

    #[test]
    fn roundtrips_with_exact_threshold() {
        let scheme = ThresholdScheme::create(SchemeType::Shamir, 3, 5, 256).unwrap();
        let secret = BigUint::from(42u32);
        let shares = split(&scheme, &secret).unwrap();
        assert_eq!(shares.len(), 5);

        let recovered = reconstruct(&scheme, &shares[0..3]).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn any_k_subset_recovers_the_same_secret() {
        let scheme = ThresholdScheme::create(SchemeType::Shamir, 3, 5, 256).unwrap();
        let secret = BigUint::from(12345u32);
        let shares = split(&scheme, &secret).unwrap();

        let subset_a = vec![shares[0].clone(), shares[1].clone(), shares[2].clone()];
        let subset_b = vec![shares[1].clone(), shares[3].clone(), shares[4].clone()];
        assert_eq!(
            reconstruct(&scheme, &subset_a).unwrap(),
            reconstruct(&scheme, &subset_b).unwrap()
        );
    }

    #[test]
    fn fewer_than_threshold_shares_fails() {
        let scheme = ThresholdScheme::create(SchemeType::Shamir, 3, 5, 256).unwrap();
        let secret = BigUint::from(7u32);
        let shares = split(&scheme, &secret).unwrap();
        let err = reconstruct(&scheme, &shares[0..2]).unwrap_err();
        assert!(matches!(err, ReliquaryError::InsufficientShares { .. }));
    }
}
