//! Hash-chained audit log (§4.6): every entry commits to its own payload
//! and the previous entry's hash, `entry_hash = H(index || payload ||
//! prev_hash)`, so tampering with any historical entry is detectable by
//! anyone holding the current tip hash.

use std::sync::atomic::{AtomicU64, Ordering};

use reliquary_core::{Result, ReliquaryError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

/// The zero hash used as `prev_hash` for the first entry in a log.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

#[derive(Serialize)]
struct DigestInput<'a> {
    index: u64,
    payload: &'a serde_json::Value,
    prev_hash: [u8; 32],
}

fn compute_entry_hash(index: u64, payload: &serde_json::Value, prev_hash: [u8; 32]) -> [u8; 32] {
    let input = DigestInput {
        index,
        payload,
        prev_hash,
    };
    let encoded = bincode::serialize(&input).expect("audit digest input is always serializable");
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// One committed record in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub index: u64,
    pub payload: serde_json::Value,
    pub prev_hash: [u8; 32],
    pub entry_hash: [u8; 32],
    pub recorded_at_ms: u64,
}

/// A lightweight inclusion proof: the full target entry plus the
/// `(entry_hash, prev_hash)` pair of every subsequent entry, letting a
/// verifier confirm an unbroken chain from the target to the published
/// tip without needing the intervening entries' payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditProof {
    pub target: AuditEntry,
    pub chain_links: Vec<ChainLink>,
    pub tip_hash: [u8; 32],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainLink {
    pub index: u64,
    pub entry_hash: [u8; 32],
    pub prev_hash: [u8; 32],
}

/// Verify `proof` independently of any live [`AuditLog`]: recomputes the
/// target entry's hash from its own fields, then walks the chain links
/// checking each one's `prev_hash` matches the previous hop, and that
/// the final link's hash equals `proof.tip_hash`.
pub fn verify_proof(proof: &AuditProof) -> bool {
    let recomputed = compute_entry_hash(proof.target.index, &proof.target.payload, proof.target.prev_hash);
    if recomputed != proof.target.entry_hash {
        return false;
    }
    let mut expected_prev = proof.target.entry_hash;
    for link in &proof.chain_links {
        if link.prev_hash != expected_prev {
            return false;
        }
        expected_prev = link.entry_hash;
    }
    expected_prev == proof.tip_hash
}

/// An append-only, hash-chained log. Owned exclusively by the
/// orchestrator or audit sink that appends to it; reads never block
/// writers for long since entries are immutable once appended.
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    next_index: AtomicU64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_index: AtomicU64::new(0),
        }
    }

    /// Append `payload` as the next entry, chained to the current tip.
    pub async fn append(&self, payload: serde_json::Value, recorded_at_ms: u64) -> AuditEntry {
        let mut entries = self.entries.write().await;
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let prev_hash = entries.last().map(|e| e.entry_hash).unwrap_or(GENESIS_HASH);
        let entry_hash = compute_entry_hash(index, &payload, prev_hash);
        let entry = AuditEntry {
            index,
            payload,
            prev_hash,
            entry_hash,
            recorded_at_ms,
        };
        entries.push(entry.clone());
        debug!(index, entry_hash = %hex::encode(entry_hash), "audit entry appended");
        entry
    }

    /// Recompute and compare the hash of the entry at `index` against
    /// its stored value. Returns `false` for an out-of-range index.
    pub async fn verify_entry(&self, index: u64) -> bool {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(index as usize) else {
            return false;
        };
        compute_entry_hash(entry.index, &entry.payload, entry.prev_hash) == entry.entry_hash
    }

    /// Build an inclusion proof for the entry at `index` against the
    /// current tip.
    pub async fn get_proof(&self, index: u64) -> Result<AuditProof> {
        let entries = self.entries.read().await;
        let target = entries
            .get(index as usize)
            .cloned()
            .ok_or_else(|| ReliquaryError::not_found(format!("audit entry {index} not found")))?;

        let chain_links = entries[(index as usize + 1)..]
            .iter()
            .map(|e| ChainLink {
                index: e.index,
                entry_hash: e.entry_hash,
                prev_hash: e.prev_hash,
            })
            .collect();

        let tip_hash = entries.last().map(|e| e.entry_hash).unwrap_or(GENESIS_HASH);
        Ok(AuditProof {
            target,
            chain_links,
            tip_hash,
        })
    }

    /// The hash of the most recently appended entry, or [`GENESIS_HASH`]
    /// for an empty log.
    pub async fn tip_hash(&self) -> [u8; 32] {
        self.entries
            .read()
            .await
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or(GENESIS_HASH)
    }

    /// Number of entries currently committed.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Verify the entire chain is internally consistent: every entry's
    /// `prev_hash` matches its predecessor's `entry_hash`, and every
    /// entry's own `entry_hash` matches its recomputed digest.
    pub async fn verify_chain(&self) -> bool {
        let entries = self.entries.read().await;
        let mut expected_prev = GENESIS_HASH;
        for entry in entries.iter() {
            if entry.prev_hash != expected_prev {
                return false;
            }
            if compute_entry_hash(entry.index, &entry.payload, entry.prev_hash) != entry.entry_hash {
                return false;
            }
            expected_prev = entry.entry_hash;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_then_verify_entry_succeeds() {
        let log = AuditLog::new();
        log.append(json!({"decision": "ALLOW"}), 1).await;
        assert!(log.verify_entry(0).await);
    }

    #[tokio::test]
    async fn chain_detects_tampering() {
        let log = AuditLog::new();
        log.append(json!({"decision": "ALLOW"}), 1).await;
        log.append(json!({"decision": "DENY"}), 2).await;
        assert!(log.verify_chain().await);

        {
            let mut entries = log.entries.write().await;
            entries[0].payload = json!({"decision": "DENY"});
        }
        assert!(!log.verify_chain().await);
        assert!(!log.verify_entry(0).await);
    }

    #[tokio::test]
    async fn proof_verifies_against_current_tip() {
        let log = AuditLog::new();
        log.append(json!({"n": 0}), 1).await;
        log.append(json!({"n": 1}), 2).await;
        log.append(json!({"n": 2}), 3).await;

        let proof = log.get_proof(0).await.unwrap();
        assert_eq!(proof.tip_hash, log.tip_hash().await);
        assert!(verify_proof(&proof));
    }

    #[tokio::test]
    async fn proof_for_unknown_index_errors() {
        let log = AuditLog::new();
        log.append(json!({"n": 0}), 1).await;
        let err = log.get_proof(5).await.unwrap_err();
        assert!(matches!(err, ReliquaryError::NotFound { .. }));
    }
}
