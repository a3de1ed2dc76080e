//! Shared domain types for decision requests, verdicts, and outcomes.
//!
//! These are the tagged unions that cross component boundaries (§3). Opaque
//! payloads stay as `serde_json::Value` so callers can carry forward-compatible
//! context blobs without the core needing to understand their shape.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Unique, opaque request identifier. Generated by the orchestrator's entry
/// API and immutable thereafter.
pub type RequestId = String;

/// Kind of decision being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    /// A routine vault access check.
    Access,
    /// A change to the governing policy itself.
    PolicyUpdate,
    /// An admin-initiated bypass of the normal decision path.
    EmergencyOverride,
    /// Recalibration of an agent's trust weighting.
    TrustCalibration,
    /// Housekeeping, e.g. share refresh or checkpoint compaction.
    Maintenance,
}

/// Final ALLOW/DENY verdict, shared by agents, consensus, and the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The action is permitted.
    Allow,
    /// The action is denied. The safety default on any tie or failure.
    Deny,
}

/// Lifecycle status of an [`OrchestrationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// Accepted, not yet scheduled for evaluation.
    Pending,
    /// Agents are evaluating in parallel.
    Evaluating,
    /// The committee reached BFT agreement.
    ConsensusReached,
    /// The committee could not reach agreement within its round budget.
    ConsensusFailed,
    /// Completed normally with a committed decision.
    Executed,
    /// Completed abnormally (internal error, capacity, or auth failure).
    Failed,
    /// The overall request deadline elapsed before completion.
    Timeout,
}

impl DecisionStatus {
    /// Whether this status is a terminal state for the request lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::Timeout)
    }
}

/// Fixed policy-bias role a committee agent plays (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    /// Balanced, no inherent bias.
    Neutral,
    /// Biased toward ALLOW absent contrary evidence.
    Permissive,
    /// Biased toward DENY absent strong evidence.
    Strict,
    /// Anomaly-focused; votes DENY on unfamiliar risk signals.
    Watchdog,
}

impl AgentRole {
    /// The fixed committee roster specified by §4.4.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Neutral,
        AgentRole::Permissive,
        AgentRole::Strict,
        AgentRole::Watchdog,
    ];
}

/// A single access-control decision request (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Globally unique identifier for this request.
    pub request_id: RequestId,
    /// The kind of decision being made.
    pub decision_type: DecisionType,
    /// Identity of the party requesting the action.
    pub requestor_id: String,
    /// Identity of the vault resource being acted on.
    pub resource_id: String,
    /// The action being requested against the resource.
    pub action: String,
    /// Opaque, hashable context mapping handed to agents and trust scoring.
    pub context: HashMap<String, serde_json::Value>,
    /// Scheduling priority: 1 (highest) through 10 (lowest).
    pub priority: u8,
    /// Overall wall-clock budget for the request.
    pub timeout: Duration,
    /// Wall-clock creation timestamp (milliseconds since epoch).
    pub created_at_ms: u64,
}

impl DecisionRequest {
    /// Build a request with a freshly generated `request_id`.
    pub fn new(
        decision_type: DecisionType,
        requestor_id: impl Into<String>,
        resource_id: impl Into<String>,
        action: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
        priority: u8,
        timeout: Duration,
        created_at_ms: u64,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            decision_type,
            requestor_id: requestor_id.into(),
            resource_id: resource_id.into(),
            action: action.into(),
            context,
            priority,
            timeout,
            created_at_ms,
        }
    }

    /// Whether the request satisfies the orchestrator's preconditions.
    pub fn is_well_formed(&self) -> bool {
        !self.timeout.is_zero() && (1..=10).contains(&self.priority)
    }
}

/// One agent's opinion on a [`DecisionRequest`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVerdict {
    /// Identity of the agent that produced this verdict.
    pub agent_id: String,
    /// Fixed policy-bias role of the agent.
    pub agent_role: AgentRole,
    /// The agent's opinion.
    pub decision: Decision,
    /// The agent's confidence in its own opinion, in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Trust score applied to this agent for weighting purposes, `[0.0, 1.0]`.
    pub trust_score: f64,
    /// Free-text rationale, or the error cause for a fallback verdict.
    pub reasoning: String,
    /// Risk signals the agent observed, by name.
    pub risk_factors: HashMap<String, f64>,
    /// Wall-clock time the agent spent evaluating.
    pub processing_time: Duration,
    /// Wall-clock timestamp the verdict was produced (milliseconds since epoch).
    pub timestamp_ms: u64,
}

impl AgentVerdict {
    /// Synthesize the fallback verdict used when an agent errors, times out,
    /// or is absent from the registry at evaluation time (§4.1).
    pub fn fallback(agent_id: impl Into<String>, agent_role: AgentRole, cause: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_role,
            decision: Decision::Deny,
            confidence: 0.0,
            trust_score: 0.0,
            reasoning: cause.into(),
            risk_factors: HashMap::new(),
            processing_time: Duration::ZERO,
            timestamp_ms,
        }
    }
}

/// Terminal outcome of a request's lifecycle (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Identifier of the originating request (or its `_override` derivative).
    pub request_id: RequestId,
    /// The committed ALLOW/DENY outcome.
    pub final_decision: Decision,
    /// Confidence of the winning side, `[0.0, 1.0]`.
    pub consensus_confidence: f64,
    /// Agent ids that contributed a verdict (including fallbacks).
    pub participants: Vec<String>,
    /// The full verdict set considered at finalization.
    pub verdicts: Vec<AgentVerdict>,
    /// Free-form consensus metrics (round counts, view changes, etc).
    pub consensus_metrics: HashMap<String, serde_json::Value>,
    /// Total wall-clock time from acceptance to terminal result.
    pub execution_time: Duration,
    /// Current lifecycle status.
    pub status: DecisionStatus,
    /// Wall-clock timestamp of finalization (milliseconds since epoch).
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_rejects_zero_timeout() {
        let req = DecisionRequest::new(
            DecisionType::Access,
            "alice",
            "vault-1",
            "read",
            HashMap::new(),
            5,
            Duration::ZERO,
            0,
        );
        assert!(!req.is_well_formed());
    }

    #[test]
    fn well_formed_rejects_out_of_range_priority() {
        let req = DecisionRequest::new(
            DecisionType::Access,
            "alice",
            "vault-1",
            "read",
            HashMap::new(),
            11,
            Duration::from_secs(5),
            0,
        );
        assert!(!req.is_well_formed());
    }

    #[test]
    fn fallback_verdict_is_zero_weight_deny() {
        let v = AgentVerdict::fallback("strict-1", AgentRole::Strict, "timed out", 42);
        assert_eq!(v.decision, Decision::Deny);
        assert_eq!(v.trust_score, 0.0);
        assert_eq!(v.confidence, 0.0);
    }
}
