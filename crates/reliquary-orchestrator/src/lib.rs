//! # ReliQuary Orchestrator - top-level decision orchestrator (§4.1)
//!
//! Ties the committee, consensus, threshold, decrypt, and audit crates
//! together behind the single `orchestrate` entry point plus its
//! `query`/`history`/`emergency_override` companions.

pub mod admission;
pub mod finalize;
pub mod interfaces;
pub mod orchestrator;
pub mod workflow;

pub use admission::{AdmissionControl, AdmissionGuard};
pub use finalize::{tally, Tally};
pub use interfaces::{
    AuditSink, CryptoBackend, RiskLevel, StaticTrustProvider, TrustAssessment, TrustProvider,
    VaultDatum, VaultStore,
};
pub use orchestrator::Orchestrator;
pub use workflow::{is_legal_transition, PhaseCursor};
