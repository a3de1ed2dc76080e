//! # ReliQuary Decrypt
//!
//! The multi-party decryption coordinator (§4.5): request a decryption,
//! collect votes or threshold shares against a configured
//! [`types::QuorumLevel`], and finalize a grant/deny once quorum is met
//! or the request expires.

pub mod backends;
pub mod coordinator;
pub mod types;

pub use backends::{CryptoBackend, VaultDatum, VaultStore};
pub use coordinator::{DecryptCoordinator, DecryptMetrics, DecryptMetricsReport};
pub use types::{AuthorizationVote, DecryptionRequest, DecryptionResponse, QuorumLevel};
