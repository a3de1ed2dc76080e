//! The multi-party decryption coordinator (§4.5): tracks pending
//! decryption requests, tallies votes against each request's configured
//! [`QuorumLevel`], and finalizes a [`DecryptionResponse`] the moment a
//! request's quorum condition (or expiry) is met.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reliquary_core::{Result, ReliquaryError};
use reliquary_threshold::ThresholdEngine;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backends::{CryptoBackend, VaultStore};
use crate::types::{AuthorizationVote, DecryptionRequest, DecryptionResponse, QuorumLevel};

#[derive(Debug, Default)]
pub struct DecryptMetrics {
    requests_submitted: AtomicU64,
    granted: AtomicU64,
    denied: AtomicU64,
    expired: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct DecryptMetricsReport {
    pub requests_submitted: u64,
    pub granted: u64,
    pub denied: u64,
    pub expired: u64,
}

struct PendingEntry {
    request: DecryptionRequest,
    votes: Vec<AuthorizationVote>,
    response: Option<DecryptionResponse>,
}

/// Owns every in-flight decryption request for one orchestrator instance.
pub struct DecryptCoordinator {
    pending: RwLock<HashMap<Uuid, PendingEntry>>,
    threshold_engine: Arc<ThresholdEngine>,
    vault_store: Arc<dyn VaultStore>,
    crypto_backend: Arc<dyn CryptoBackend>,
    metrics: DecryptMetrics,
}

impl DecryptCoordinator {
    /// `vault_store`/`crypto_backend` are only consulted on grant for
    /// non-`ThresholdShares` requests: a `ThresholdShares` grant's
    /// reconstructed value is itself the released secret (§4.5).
    pub fn new(
        threshold_engine: Arc<ThresholdEngine>,
        vault_store: Arc<dyn VaultStore>,
        crypto_backend: Arc<dyn CryptoBackend>,
    ) -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
            threshold_engine,
            vault_store,
            crypto_backend,
            metrics: DecryptMetrics::default(),
        }
    }

    /// Submit a new decryption request for voting. A `SingleAgent`
    /// request with no votes yet is left pending like any other level;
    /// an emergency-eligible request (§4.5) is granted immediately and
    /// tagged with the distinguished `EMERGENCY_OVERRIDE` marker instead
    /// of waiting on the configured quorum.
    pub async fn request_decryption(&self, request: DecryptionRequest) -> DecryptionResponse {
        let id = request.request_id;
        self.metrics.requests_submitted.fetch_add(1, Ordering::Relaxed);

        if request.is_emergency_eligible() {
            let mut entry = PendingEntry {
                request,
                votes: Vec::new(),
                response: None,
            };
            let resp = self
                .finalize(
                    &mut entry,
                    true,
                    "EMERGENCY_OVERRIDE: justification matched emergency vocabulary",
                    None,
                )
                .await;
            self.metrics.granted.fetch_add(1, Ordering::Relaxed);
            self.pending.write().await.insert(id, entry);
            return resp;
        }

        self.pending.write().await.insert(
            id,
            PendingEntry {
                request,
                votes: Vec::new(),
                response: None,
            },
        );
        DecryptionResponse {
            request_id: id,
            granted: false,
            finalized: false,
            votes: Vec::new(),
            reason: "awaiting quorum".to_string(),
            finalized_at_ms: None,
            plaintext: None,
        }
    }

    /// Cast a vote on `request_id`, re-evaluating its quorum condition.
    /// Returns the current (possibly already-finalized) response.
    pub async fn vote(&self, request_id: Uuid, vote: AuthorizationVote) -> Result<DecryptionResponse> {
        let mut pending = self.pending.write().await;
        let entry = pending
            .get_mut(&request_id)
            .ok_or_else(|| ReliquaryError::not_found(format!("decryption request {request_id} not found")))?;

        if let Some(resp) = &entry.response {
            return Ok(resp.clone());
        }

        if entry.request.is_expired(vote.cast_at_ms) {
            let resp = self
                .finalize(entry, false, "request expired before quorum was met", None)
                .await;
            self.metrics.expired.fetch_add(1, Ordering::Relaxed);
            return Ok(resp);
        }

        if entry.request.quorum_level == QuorumLevel::Administrative {
            let admin = entry.request.admin_id.clone().unwrap_or_default();
            if vote.voter_id != admin {
                return Err(ReliquaryError::unauthorized(format!(
                    "{} is not authorized to vote on an administrative request",
                    vote.voter_id
                )));
            }
        }

        if !entry.request.required_voters.is_empty()
            && !entry.request.required_voters.contains(&vote.voter_id)
        {
            return Err(ReliquaryError::unauthorized(format!(
                "{} is not among this request's required_voters",
                vote.voter_id
            )));
        }

        if entry.votes.iter().any(|v| v.voter_id == vote.voter_id) {
            return Err(ReliquaryError::invalid(format!(
                "{} has already voted on this request",
                vote.voter_id
            )));
        }

        entry.votes.push(vote);

        let decision = evaluate(&entry.request, &entry.votes, &self.threshold_engine).await?;
        match decision {
            Decision::Pending => Ok(DecryptionResponse {
                request_id,
                granted: false,
                finalized: false,
                votes: entry.votes.clone(),
                reason: "awaiting quorum".to_string(),
                finalized_at_ms: None,
                plaintext: None,
            }),
            Decision::Granted { reason, reconstructed } => {
                let resp = self.finalize(entry, true, &reason, reconstructed).await;
                self.metrics.granted.fetch_add(1, Ordering::Relaxed);
                Ok(resp)
            }
            Decision::Denied(reason) => {
                let resp = self.finalize(entry, false, &reason, None).await;
                self.metrics.denied.fetch_add(1, Ordering::Relaxed);
                Ok(resp)
            }
        }
    }

    /// Finalize `entry`. On a grant, releases the actual secret: a
    /// `reconstructed` threshold value is used directly, otherwise the
    /// vault/crypto backends are consulted. A backend failure does not
    /// revoke the grant -- the quorum was genuinely met -- it only
    /// leaves `plaintext` unset and notes the failure in `reason`.
    async fn finalize(
        &self,
        entry: &mut PendingEntry,
        granted: bool,
        reason: &str,
        reconstructed: Option<Vec<u8>>,
    ) -> DecryptionResponse {
        let mut reason = reason.to_string();
        let plaintext = if !granted {
            None
        } else if reconstructed.is_some() {
            reconstructed
        } else {
            match self.release(&entry.request).await {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(request_id = %entry.request.request_id, error = %err, "quorum met but release failed");
                    reason = format!("{reason} (release failed: {err})");
                    None
                }
            }
        };

        let resp = DecryptionResponse {
            request_id: entry.request.request_id,
            granted,
            finalized: true,
            votes: entry.votes.clone(),
            reason,
            finalized_at_ms: Some(entry.votes.last().map(|v| v.cast_at_ms).unwrap_or(entry.request.created_at_ms)),
            plaintext,
        };
        entry.response = Some(resp.clone());
        if granted {
            info!(request_id = %resp.request_id, "decryption request granted");
        } else {
            warn!(request_id = %resp.request_id, reason = %resp.reason, "decryption request denied");
        }
        resp
    }

    async fn release(&self, request: &DecryptionRequest) -> Result<Vec<u8>> {
        let datum = self.vault_store.load(&request.vault_id, &request.data_id).await?;
        self.crypto_backend.decrypt(&datum.ciphertext, &datum.key).await
    }

    /// All requests still awaiting a quorum decision.
    pub async fn pending_requests(&self) -> Vec<DecryptionRequest> {
        self.pending
            .read()
            .await
            .values()
            .filter(|e| e.response.is_none())
            .map(|e| e.request.clone())
            .collect()
    }

    /// Sweep every pending request past its expiry and finalize it as
    /// denied. Returns the number of requests swept.
    pub async fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut pending = self.pending.write().await;
        let mut swept = 0;
        for entry in pending.values_mut() {
            if entry.response.is_none() && entry.request.is_expired(now_ms) {
                self.finalize(entry, false, "request expired before quorum was met", None).await;
                self.metrics.expired.fetch_add(1, Ordering::Relaxed);
                swept += 1;
            }
        }
        swept
    }

    pub fn metrics(&self) -> DecryptMetricsReport {
        DecryptMetricsReport {
            requests_submitted: self.metrics.requests_submitted.load(Ordering::Relaxed),
            granted: self.metrics.granted.load(Ordering::Relaxed),
            denied: self.metrics.denied.load(Ordering::Relaxed),
            expired: self.metrics.expired.load(Ordering::Relaxed),
        }
    }
}

enum Decision {
    Pending,
    /// `reconstructed` is set only for `ThresholdShares`, where the
    /// reconstructed value is itself the released secret.
    Granted { reason: String, reconstructed: Option<Vec<u8>> },
    Denied(String),
}

async fn evaluate(
    request: &DecryptionRequest,
    votes: &[AuthorizationVote],
    threshold_engine: &ThresholdEngine,
) -> Result<Decision> {
    match request.quorum_level {
        QuorumLevel::SingleAgent => {
            if votes.iter().any(|v| v.approve) {
                Ok(Decision::Granted {
                    reason: "single-agent approval received".to_string(),
                    reconstructed: None,
                })
            } else {
                Ok(Decision::Pending)
            }
        }
        QuorumLevel::Majority => {
            let roster = &request.required_voters;
            let approvals = votes
                .iter()
                .filter(|v| v.approve && roster.contains(&v.voter_id))
                .count();
            if approvals * 2 > roster.len() {
                Ok(Decision::Granted {
                    reason: format!("majority reached: {approvals}/{}", roster.len()),
                    reconstructed: None,
                })
            } else {
                Ok(Decision::Pending)
            }
        }
        QuorumLevel::Unanimous => {
            let roster = &request.required_voters;
            let any_denial = votes
                .iter()
                .any(|v| !v.approve && roster.contains(&v.voter_id));
            if any_denial {
                return Ok(Decision::Denied("a required voter denied the request".to_string()));
            }
            let approvers: std::collections::HashSet<&str> = votes
                .iter()
                .filter(|v| v.approve && roster.contains(&v.voter_id))
                .map(|v| v.voter_id.as_str())
                .collect();
            if roster.iter().all(|id| approvers.contains(id.as_str())) {
                Ok(Decision::Granted {
                    reason: "unanimous approval received".to_string(),
                    reconstructed: None,
                })
            } else {
                Ok(Decision::Pending)
            }
        }
        QuorumLevel::Administrative => {
            match votes.last() {
                Some(v) if v.approve => Ok(Decision::Granted {
                    reason: "administrative override granted".to_string(),
                    reconstructed: None,
                }),
                Some(_) => Ok(Decision::Denied("administrative override denied".to_string())),
                None => Ok(Decision::Pending),
            }
        }
        QuorumLevel::ThresholdShares => {
            let scheme_id = request
                .threshold_scheme_id
                .ok_or_else(|| ReliquaryError::invalid("threshold_scheme_id required for ThresholdShares"))?;
            let shares: Vec<_> = votes.iter().filter_map(|v| v.share.clone()).collect();
            let scheme = threshold_engine.scheme_info(scheme_id).await?;
            if shares.len() < scheme.threshold as usize {
                return Ok(Decision::Pending);
            }
            let result = threshold_engine.reconstruct_secret(scheme_id, &shares).await?;
            if result.success {
                let reconstructed = result.secret.as_ref().map(|s| s.to_bytes_be());
                Ok(Decision::Granted {
                    reason: format!(
                        "reconstructed from {} of {} required shares",
                        result.shares_used, result.shares_required
                    ),
                    reconstructed,
                })
            } else {
                Ok(Decision::Pending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::VaultDatum;
    use async_trait::async_trait;
    use reliquary_threshold::SchemeType;
    use std::time::Duration;

    /// XOR "cipher" so grant tests can exercise the release path without
    /// a real crypto dependency: ciphertext XOR key == plaintext.
    struct XorBackend;

    #[async_trait]
    impl CryptoBackend for XorBackend {
        async fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
            Ok(plaintext.iter().zip(key.iter().cycle()).map(|(p, k)| p ^ k).collect())
        }

        async fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
            Ok(ciphertext.iter().zip(key.iter().cycle()).map(|(c, k)| c ^ k).collect())
        }

        async fn random(&self, n: usize) -> Result<Vec<u8>> {
            Ok(vec![0u8; n])
        }
    }

    /// A single fixed ciphertext/key pair that decrypts to `b"plaintext"`.
    struct FixedVaultStore;

    #[async_trait]
    impl VaultStore for FixedVaultStore {
        async fn load(&self, _vault_id: &str, _data_id: &str) -> Result<VaultDatum> {
            let key = b"k".to_vec();
            let plaintext = b"plaintext".to_vec();
            let ciphertext = plaintext.iter().zip(key.iter().cycle()).map(|(p, k)| p ^ k).collect();
            Ok(VaultDatum {
                ciphertext,
                key,
                key_ref: "fixed".to_string(),
            })
        }

        async fn exists(&self, _vault_id: &str, _data_id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn coordinator(engine: Arc<ThresholdEngine>) -> DecryptCoordinator {
        DecryptCoordinator::new(engine, Arc::new(FixedVaultStore), Arc::new(XorBackend))
    }

    fn vote(voter_id: &str, approve: bool, at: u64) -> AuthorizationVote {
        AuthorizationVote {
            voter_id: voter_id.to_string(),
            approve,
            share: None,
            cast_at_ms: at,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn request(
        quorum_level: QuorumLevel,
        required_voters: Vec<String>,
        threshold_scheme_id: Option<uuid::Uuid>,
        admin_id: Option<String>,
        ttl: Duration,
    ) -> DecryptionRequest {
        DecryptionRequest::new(
            "vault-1",
            "secret-1",
            "alice",
            "routine access review",
            quorum_level,
            required_voters,
            threshold_scheme_id,
            admin_id,
            false,
            0,
            ttl,
        )
    }

    #[tokio::test]
    async fn single_agent_grants_on_first_approval() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(QuorumLevel::SingleAgent, vec![], None, None, Duration::from_secs(60));
        let submitted = coordinator.request_decryption(req).await;
        assert!(!submitted.finalized);
        let resp = coordinator
            .vote(submitted.request_id, vote("neutral-1", true, 1))
            .await
            .unwrap();
        assert!(resp.granted);
        assert!(resp.finalized);
        assert_eq!(resp.plaintext.as_deref(), Some(b"plaintext".as_slice()));
    }

    #[tokio::test]
    async fn unanimous_denies_on_first_dissent() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::Unanimous,
            vec!["a".to_string(), "b".to_string()],
            None,
            None,
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;
        coordinator.vote(id, vote("a", true, 1)).await.unwrap();
        let resp = coordinator.vote(id, vote("b", false, 2)).await.unwrap();
        assert!(!resp.granted);
        assert!(resp.finalized);
    }

    #[tokio::test]
    async fn majority_grants_once_over_half_approve() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::Majority,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            None,
            None,
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;
        let pending = coordinator.vote(id, vote("a", true, 1)).await.unwrap();
        assert!(!pending.finalized);
        let granted = coordinator.vote(id, vote("b", true, 2)).await.unwrap();
        assert!(granted.granted);
    }

    #[tokio::test]
    async fn double_vote_from_the_same_voter_is_rejected() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::Majority,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            None,
            None,
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;
        coordinator.vote(id, vote("a", true, 1)).await.unwrap();
        let err = coordinator.vote(id, vote("a", true, 2)).await.unwrap_err();
        assert!(matches!(err, ReliquaryError::Invalid { .. }));
    }

    #[tokio::test]
    async fn vote_from_a_voter_outside_the_roster_is_rejected() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::Majority,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            None,
            None,
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;
        let err = coordinator.vote(id, vote("outsider", true, 1)).await.unwrap_err();
        assert!(matches!(err, ReliquaryError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn administrative_vote_from_non_admin_is_rejected() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::Administrative,
            vec![],
            None,
            Some("root-admin".to_string()),
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;
        let err = coordinator.vote(id, vote("imposter", true, 1)).await.unwrap_err();
        assert!(matches!(err, ReliquaryError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn threshold_shares_grants_once_enough_shares_arrive() {
        let engine = Arc::new(ThresholdEngine::new());
        let scheme = engine.create_scheme(SchemeType::Shamir, 3, 5, 256).await.unwrap();
        let shares = engine
            .share_secret(scheme.scheme_id, &num_bigint::BigUint::from(42u32))
            .await
            .unwrap();

        let coordinator = coordinator(engine);
        let req = request(
            QuorumLevel::ThresholdShares,
            vec![],
            Some(scheme.scheme_id),
            None,
            Duration::from_secs(60),
        );
        let id = coordinator.request_decryption(req).await.request_id;

        for (i, share) in shares.iter().take(2).enumerate() {
            let v = AuthorizationVote {
                voter_id: format!("holder-{i}"),
                approve: true,
                share: Some(share.clone()),
                cast_at_ms: i as u64 + 1,
            };
            let resp = coordinator.vote(id, v).await.unwrap();
            assert!(!resp.finalized);
        }

        let v = AuthorizationVote {
            voter_id: "holder-2".to_string(),
            approve: true,
            share: Some(shares[2].clone()),
            cast_at_ms: 10,
        };
        let resp = coordinator.vote(id, v).await.unwrap();
        assert!(resp.granted);
        assert_eq!(resp.plaintext, Some(num_bigint::BigUint::from(42u32).to_bytes_be()));
    }

    #[tokio::test]
    async fn expired_request_denies_on_next_vote() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = request(QuorumLevel::SingleAgent, vec![], None, None, Duration::from_millis(1));
        let id = coordinator.request_decryption(req).await.request_id;
        let resp = coordinator.vote(id, vote("late-voter", true, 1_000)).await.unwrap();
        assert!(!resp.granted);
        assert!(resp.finalized);
    }

    #[tokio::test]
    async fn emergency_request_with_matching_keyword_grants_immediately() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = DecryptionRequest::new(
            "vault-1",
            "secret-1",
            "alice",
            "active security incident, need immediate access",
            QuorumLevel::Unanimous,
            vec!["a".to_string(), "b".to_string()],
            None,
            None,
            true,
            0,
            Duration::from_secs(60),
        );
        let resp = coordinator.request_decryption(req).await;
        assert!(resp.granted);
        assert!(resp.finalized);
        assert!(resp.reason.contains("EMERGENCY_OVERRIDE"));
        assert_eq!(resp.plaintext.as_deref(), Some(b"plaintext".as_slice()));
    }

    #[tokio::test]
    async fn emergency_flag_without_matching_keyword_stays_pending() {
        let engine = Arc::new(ThresholdEngine::new());
        let coordinator = coordinator(engine);
        let req = DecryptionRequest::new(
            "vault-1",
            "secret-1",
            "alice",
            "routine access review",
            QuorumLevel::SingleAgent,
            vec![],
            None,
            None,
            true,
            0,
            Duration::from_secs(60),
        );
        let resp = coordinator.request_decryption(req).await;
        assert!(!resp.granted);
        assert!(!resp.finalized);
    }
}
