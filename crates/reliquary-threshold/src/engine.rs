//! The threshold cryptography engine (§4.3): owns configured schemes and
//! their issued shares, and exposes `create_scheme` / `share_secret` /
//! `reconstruct_secret` / `refresh_shares` as one coordinating actor, the
//! same single-owner-state shape the consensus driver uses for its
//! replica map (§5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use num_bigint::BigUint;
use num_traits::Zero;
use reliquary_core::{Result, ReliquaryError};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::modmath::random_nonzero_values;
use crate::scheme::{SchemeType, ThresholdScheme};
use crate::share::{ReconstructionResult, SecretShare, ValidationStatus};
use crate::{mpc, shamir, threshold_sig, vss};

/// Engine-wide counters surfaced to orchestrator/audit metrics.
#[derive(Debug, Default)]
pub struct ThresholdMetrics {
    schemes_created: AtomicU64,
    shares_issued: AtomicU64,
    reconstructions_attempted: AtomicU64,
    reconstructions_failed: AtomicU64,
    refreshes_performed: AtomicU64,
}

/// Point-in-time snapshot of [`ThresholdMetrics`].
#[derive(Debug, Clone, Copy)]
pub struct ThresholdMetricsReport {
    pub schemes_created: u64,
    pub shares_issued: u64,
    pub reconstructions_attempted: u64,
    pub reconstructions_failed: u64,
    pub refreshes_performed: u64,
}

struct SchemeRecord {
    scheme: ThresholdScheme,
    shares: Vec<SecretShare>,
}

/// Owns every configured scheme and its issued shares for one
/// orchestrator instance.
pub struct ThresholdEngine {
    records: RwLock<HashMap<Uuid, SchemeRecord>>,
    metrics: ThresholdMetrics,
}

impl Default for ThresholdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdEngine {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            metrics: ThresholdMetrics::default(),
        }
    }

    /// Validate `(k, n)` and register a new scheme. Does not yet issue
    /// shares; call [`Self::share_secret`] to do that.
    pub async fn create_scheme(
        &self,
        scheme_type: SchemeType,
        threshold: u32,
        total_shares: u32,
        security_level_bits: u32,
    ) -> Result<ThresholdScheme> {
        let scheme =
            ThresholdScheme::create(scheme_type, threshold, total_shares, security_level_bits)?;
        self.records.write().await.insert(
            scheme.scheme_id,
            SchemeRecord {
                scheme: scheme.clone(),
                shares: Vec::new(),
            },
        );
        self.metrics.schemes_created.fetch_add(1, Ordering::Relaxed);
        debug!(scheme_id = %scheme.scheme_id, scheme_type = ?scheme.scheme_type, "threshold scheme created");
        Ok(scheme)
    }

    /// Split `secret` under `scheme_id`'s scheme and persist the issued
    /// shares, replacing any previously issued set.
    pub async fn share_secret(&self, scheme_id: Uuid, secret: &BigUint) -> Result<Vec<SecretShare>> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&scheme_id)
            .ok_or_else(|| ReliquaryError::not_found(format!("scheme {scheme_id} not found")))?;

        let shares = match record.scheme.scheme_type {
            SchemeType::Shamir => shamir::split(&record.scheme, secret)?,
            SchemeType::Vss => vss::split(&record.scheme, secret)?,
            SchemeType::ThresholdSig => shamir::split(&record.scheme, secret)?,
            SchemeType::MpcAdditive => mpc::split(&record.scheme, secret)?,
        };

        self.metrics
            .shares_issued
            .fetch_add(shares.len() as u64, Ordering::Relaxed);
        record.shares = shares.clone();
        Ok(shares)
    }

    /// Attempt to reconstruct the secret for `scheme_id` from
    /// `candidate_shares`, which may include corrupted or insufficient
    /// shares; failures are reported in the result rather than as an
    /// `Err`, except for unknown scheme ids.
    pub async fn reconstruct_secret(
        &self,
        scheme_id: Uuid,
        candidate_shares: &[SecretShare],
    ) -> Result<ReconstructionResult> {
        self.metrics
            .reconstructions_attempted
            .fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let records = self.records.read().await;
        let record = records
            .get(&scheme_id)
            .ok_or_else(|| ReliquaryError::not_found(format!("scheme {scheme_id} not found")))?;

        let (outcome, validation_per_share) = match record.scheme.scheme_type {
            SchemeType::Vss => {
                let (result, statuses) = vss::reconstruct(&record.scheme, candidate_shares);
                (result, statuses)
            }
            SchemeType::MpcAdditive => {
                let statuses = vec![ValidationStatus::Valid; candidate_shares.len()];
                (mpc::reconstruct(&record.scheme, candidate_shares), statuses)
            }
            SchemeType::Shamir | SchemeType::ThresholdSig => {
                let statuses = vec![ValidationStatus::Valid; candidate_shares.len()];
                (shamir::reconstruct(&record.scheme, candidate_shares), statuses)
            }
        };

        let shares_required = record.scheme.threshold;
        match outcome {
            Ok(secret) => Ok(ReconstructionResult {
                success: true,
                secret: Some(secret),
                validation_per_share,
                shares_used: candidate_shares.len(),
                shares_required,
                error: None,
                reconstruction_time: started.elapsed(),
            }),
            Err(err) => {
                self.metrics
                    .reconstructions_failed
                    .fetch_add(1, Ordering::Relaxed);
                Ok(ReconstructionResult {
                    success: false,
                    secret: None,
                    validation_per_share,
                    shares_used: candidate_shares.len(),
                    shares_required,
                    error: Some(err.to_string()),
                    reconstruction_time: started.elapsed(),
                })
            }
        }
    }

    /// Proactive share refresh: re-randomize every share's value while
    /// leaving the underlying secret at `x = 0` unchanged, by adding a
    /// fresh degree-`(k-1)` zero-constant-term polynomial to each share.
    /// Invalidates all previously issued shares for this scheme.
    pub async fn refresh_shares(&self, scheme_id: Uuid) -> Result<Vec<SecretShare>> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&scheme_id)
            .ok_or_else(|| ReliquaryError::not_found(format!("scheme {scheme_id} not found")))?;

        if record.scheme.scheme_type.requires_all_shares() {
            return Err(ReliquaryError::invalid(
                "mpc-additive schemes do not support threshold-preserving refresh",
            ));
        }
        if record.shares.is_empty() {
            return Err(ReliquaryError::invalid("no shares issued yet to refresh"));
        }

        let p = &record.scheme.prime_modulus;
        let degree = record.scheme.threshold as usize - 1;
        let coeffs = random_nonzero_values(degree.max(1), p);

        let refreshed: Vec<SecretShare> = record
            .shares
            .iter()
            .map(|share| {
                let x = BigUint::from(share.index);
                let delta = eval_zero_constant_polynomial(&coeffs[..degree], &x, p);
                let new_value = (&share.value + delta) % p;
                SecretShare::new(record.scheme.scheme_id, share.index, new_value)
            })
            .collect();

        record.shares = refreshed.clone();
        self.metrics.refreshes_performed.fetch_add(1, Ordering::Relaxed);
        debug!(scheme_id = %scheme_id, "threshold shares refreshed");
        Ok(refreshed)
    }

    pub async fn scheme_info(&self, scheme_id: Uuid) -> Result<ThresholdScheme> {
        self.records
            .read()
            .await
            .get(&scheme_id)
            .map(|r| r.scheme.clone())
            .ok_or_else(|| ReliquaryError::not_found(format!("scheme {scheme_id} not found")))
    }

    pub fn metrics(&self) -> ThresholdMetricsReport {
        ThresholdMetricsReport {
            schemes_created: self.metrics.schemes_created.load(Ordering::Relaxed),
            shares_issued: self.metrics.shares_issued.load(Ordering::Relaxed),
            reconstructions_attempted: self
                .metrics
                .reconstructions_attempted
                .load(Ordering::Relaxed),
            reconstructions_failed: self.metrics.reconstructions_failed.load(Ordering::Relaxed),
            refreshes_performed: self.metrics.refreshes_performed.load(Ordering::Relaxed),
        }
    }
}

fn eval_zero_constant_polynomial(coeffs: &[BigUint], x: &BigUint, p: &BigUint) -> BigUint {
    let mut acc = BigUint::zero();
    let mut power = x.clone();
    for c in coeffs {
        acc = (acc + c * &power) % p;
        power = (&power * x) % p;
    }
    acc
}

// Re-exported so `threshold_sig` combine/sign flows can be driven
// directly from engine callers without reaching into the submodule.
pub use threshold_sig::{combine as combine_signatures, sign_partial};
