//! # ReliQuary Core - Layer 1: Foundation
//!
//! Single source of truth for the domain types, configuration surface, and
//! error system shared by the consensus, threshold-crypto, committee,
//! decrypt, audit, and orchestrator crates.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::ReliquaryConfig;
pub use error::{ReliquaryError, Result};
pub use time::Deadline;
pub use types::{
    AgentRole, AgentVerdict, Decision, DecisionRequest, DecisionStatus, DecisionType,
    OrchestrationResult, RequestId,
};
