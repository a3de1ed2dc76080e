//! The vault/crypto collaborators the coordinator calls through once a
//! request clears its quorum (§4.5, §6). Defined here rather than in
//! `reliquary-orchestrator` so the coordinator can depend on them
//! directly without a crate cycle; `reliquary-orchestrator::interfaces`
//! re-exports these same traits for callers that only see the
//! orchestrator crate.

use async_trait::async_trait;
use reliquary_core::Result;

/// Opaque encryption backend behind the decryption coordinator. Never
/// implemented by this workspace; a host binary wires in a real backend
/// (e.g. an AEAD cipher keyed from a KMS-resolved key).
#[async_trait]
pub trait CryptoBackend: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>>;
    async fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>>;
    async fn random(&self, n: usize) -> Result<Vec<u8>>;
}

/// Read-side access to the vault payloads the decryption coordinator
/// gates. Side-effect-free on read; only invoked once authorization is
/// granted.
#[async_trait]
pub trait VaultStore: Send + Sync {
    async fn load(&self, vault_id: &str, data_id: &str) -> Result<VaultDatum>;
    async fn exists(&self, vault_id: &str, data_id: &str) -> Result<bool>;
}

/// A vault-stored ciphertext plus the key material needed to open it.
/// `key_ref` is carried through for audit logging; `key` is the actual
/// key bytes handed to [`CryptoBackend::decrypt`].
#[derive(Debug, Clone)]
pub struct VaultDatum {
    pub ciphertext: Vec<u8>,
    pub key: Vec<u8>,
    pub key_ref: String,
}
