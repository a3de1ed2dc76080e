//! Message authentication for the consensus driver.
//!
//! §4.2 deliberately abstracts signing behind an interface: any scheme with
//! existential unforgeability is sufficient, and a production deployment may
//! swap in threshold- or PQ-signatures without touching the protocol state
//! machine. This module ships an HMAC-keyed development signer, matching
//! the reference choice noted in the design notes (§9 open question).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Produces and checks message authenticators over a digest.
pub trait Signer: Send + Sync {
    /// Sign `digest` on behalf of `signer_id`.
    fn sign(&self, signer_id: &str, digest: &[u8; 32]) -> Vec<u8>;

    /// Verify that `signature` is a valid authenticator for `digest` from
    /// `signer_id`.
    fn verify(&self, signer_id: &str, digest: &[u8; 32], signature: &[u8]) -> bool;
}

/// Development signer keyed per agent with a shared symmetric key. Not fit
/// for production use across an untrusted network; production deployments
/// should supply a [`Signer`] backed by per-agent asymmetric or threshold
/// keys.
#[derive(Debug, Clone)]
pub struct HmacSigner {
    keys: HashMap<String, Vec<u8>>,
}

impl HmacSigner {
    /// Build a signer from an explicit `agent_id -> key` map.
    pub fn new(keys: HashMap<String, Vec<u8>>) -> Self {
        Self { keys }
    }

    /// Build a signer that derives each agent's key from its id, for tests
    /// and local development where no key distribution exists yet.
    pub fn from_agent_ids<'a>(agent_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let keys = agent_ids
            .into_iter()
            .map(|id| (id.to_string(), format!("dev-key:{id}").into_bytes()))
            .collect();
        Self::new(keys)
    }
}

impl Signer for HmacSigner {
    fn sign(&self, signer_id: &str, digest: &[u8; 32]) -> Vec<u8> {
        let Some(key) = self.keys.get(signer_id) else {
            return Vec::new();
        };
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(digest);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, signer_id: &str, digest: &[u8; 32], signature: &[u8]) -> bool {
        let Some(key) = self.keys.get(signer_id) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(digest);
        mac.verify_slice(signature).is_ok()
    }
}
