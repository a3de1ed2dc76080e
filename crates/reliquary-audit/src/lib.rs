//! # ReliQuary Audit
//!
//! The hash-chained decision audit log (§4.6):
//! `entry_hash = H(index || payload || prev_hash)`, with
//! [`log::AuditLog::verify_entry`] and [`log::AuditLog::get_proof`] for
//! tamper detection and lightweight inclusion proofs.

pub mod log;

pub use log::{AuditEntry, AuditLog, AuditProof, ChainLink, GENESIS_HASH, verify_proof};
