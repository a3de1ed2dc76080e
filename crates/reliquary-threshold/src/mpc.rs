//! Additive secret sharing for multi-party computation (§4.3): `n` shares
//! sum to the secret mod `p`. There is no partial-reconstruction
//! property, so `scheme.threshold` must equal `scheme.total_shares`
//! ([`crate::scheme::SchemeType::requires_all_shares`]) and
//! reconstruction needs every share.

use num_bigint::BigUint;
use num_traits::Zero;
use reliquary_core::{Result, ReliquaryError};

use crate::modmath::random_nonzero_values;
use crate::scheme::ThresholdScheme;
use crate::share::SecretShare;

/// Split `secret` into `scheme.total_shares` additive shares summing to
/// `secret mod p`.
pub fn split(scheme: &ThresholdScheme, secret: &BigUint) -> Result<Vec<SecretShare>> {
    let p = &scheme.prime_modulus;
    if secret >= p {
        return Err(ReliquaryError::invalid(
            "secret must be smaller than the scheme's prime modulus",
        ));
    }
    let n = scheme.total_shares as usize;
    if n == 0 {
        return Err(ReliquaryError::invalid("total_shares must be >= 1"));
    }

    let mut shares = random_nonzero_values(n - 1, p);
    let sum_so_far = shares.iter().fold(BigUint::zero(), |acc, v| (acc + v) % p);
    let last = if secret >= &sum_so_far {
        (secret - &sum_so_far) % p
    } else {
        (p - ((&sum_so_far - secret) % p)) % p
    };
    shares.push(last);

    Ok(shares
        .into_iter()
        .enumerate()
        .map(|(i, v)| SecretShare::new(scheme.scheme_id, (i + 1) as u32, v))
        .collect())
}

/// Sum every share mod `p`. Unlike Shamir reconstruction, all `n` shares
/// are required; any missing share makes recovery impossible.
pub fn reconstruct(scheme: &ThresholdScheme, shares: &[SecretShare]) -> Result<BigUint> {
    let n = scheme.total_shares as usize;
    if shares.len() < n {
        return Err(ReliquaryError::insufficient_shares(format!(
            "mpc-additive reconstruction requires all {n} shares, have {}",
            shares.len()
        )));
    }
    let p = &scheme.prime_modulus;
    Ok(shares
        .iter()
        .fold(BigUint::zero(), |acc, s| (acc + &s.value) % p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::SchemeType;

    #[test]
    fn additive_shares_sum_to_secret() {
        let scheme = ThresholdScheme::create(SchemeType::MpcAdditive, 5, 5, 256).unwrap();
        let secret = BigUint::from(777u32);
        let shares = split(&scheme, &secret).unwrap();
        assert_eq!(reconstruct(&scheme, &shares).unwrap(), secret);
    }

    #[test]
    fn missing_one_share_fails_reconstruction() {
        let scheme = ThresholdScheme::create(SchemeType::MpcAdditive, 5, 5, 256).unwrap();
        let shares = split(&scheme, &BigUint::from(10u32)).unwrap();
        let err = reconstruct(&scheme, &shares[0..4]).unwrap_err();
        assert!(matches!(err, ReliquaryError::InsufficientShares { .. }));
    }
}
