//! The external collaborator interfaces (§6): seams the orchestrator
//! calls through without knowing the concrete backend. `AgentAdapter`
//! lives in `reliquary-committee`; `CryptoBackend`/`VaultStore` live in
//! `reliquary-decrypt` (the decryption coordinator is their only
//! caller) and are re-exported here for callers that only see this
//! crate.

use async_trait::async_trait;
use reliquary_audit::{AuditEntry, AuditLog, AuditProof};
use reliquary_core::Result;
pub use reliquary_decrypt::{CryptoBackend, VaultDatum, VaultStore};

/// Computes (or looks up) a requestor's trust score once per request,
/// before the committee fans out.
#[async_trait]
pub trait TrustProvider: Send + Sync {
    async fn evaluate_trust(&self, user_id: &str, context: &serde_json::Value) -> Result<TrustAssessment>;
}

#[derive(Debug, Clone)]
pub struct TrustAssessment {
    pub trust_score: f64,
    pub risk_level: RiskLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A fixed, trust-everyone provider used when no external trust service
/// is wired in. Not a stand-in for production risk scoring.
pub struct StaticTrustProvider {
    pub default_score: f64,
}

#[async_trait]
impl TrustProvider for StaticTrustProvider {
    async fn evaluate_trust(&self, _user_id: &str, _context: &serde_json::Value) -> Result<TrustAssessment> {
        Ok(TrustAssessment {
            trust_score: self.default_score,
            risk_level: RiskLevel::Low,
            factors: Vec::new(),
        })
    }
}

/// The durable append-only audit sink (§4.6), implemented here for any
/// [`AuditLog`] so the orchestrator can depend on the trait object
/// rather than the concrete log type.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, payload: serde_json::Value) -> AuditEntry;
    async fn verify(&self, index: u64) -> bool;
    async fn proof(&self, index: u64) -> Result<AuditProof>;
}

#[async_trait]
impl AuditSink for AuditLog {
    async fn append(&self, payload: serde_json::Value) -> AuditEntry {
        AuditLog::append(self, payload, reliquary_core::time::now_ms()).await
    }

    async fn verify(&self, index: u64) -> bool {
        AuditLog::verify_entry(self, index).await
    }

    async fn proof(&self, index: u64) -> Result<AuditProof> {
        AuditLog::get_proof(self, index).await
    }
}
