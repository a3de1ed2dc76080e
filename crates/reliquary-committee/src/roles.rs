//! Reference [`AgentAdapter`] implementations for the fixed §4.4 roster:
//! one rule-of-thumb evaluator per [`AgentRole`], reading a `risk_score`
//! and optional `anomaly` flag out of the request context. Real
//! deployments are expected to swap these for adapters backed by a
//! policy engine or model call; these exist so the committee, consensus,
//! and orchestrator crates have something concrete to drive end to end.

use std::time::Instant;

use async_trait::async_trait;
use reliquary_core::{AgentRole, AgentVerdict, Decision, DecisionRequest, Result};

use crate::adapter::AgentAdapter;

fn risk_score(request: &DecisionRequest) -> f64 {
    request
        .context
        .get("risk_score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn anomaly_flagged(request: &DecisionRequest) -> bool {
    request
        .context
        .get("anomaly")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn verdict(
    agent_id: &str,
    role: AgentRole,
    decision: Decision,
    confidence: f64,
    trust_score: f64,
    reasoning: impl Into<String>,
    started: Instant,
) -> AgentVerdict {
    AgentVerdict {
        agent_id: agent_id.to_string(),
        agent_role: role,
        decision,
        confidence,
        trust_score,
        reasoning: reasoning.into(),
        risk_factors: Default::default(),
        processing_time: started.elapsed(),
        timestamp_ms: reliquary_core::time::now_ms(),
    }
}

/// Balanced: allows unless the observed risk score crosses 0.7.
pub struct NeutralAgent {
    id: String,
}

impl NeutralAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl AgentAdapter for NeutralAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Neutral
    }

    async fn evaluate(&self, request: &DecisionRequest) -> Result<AgentVerdict> {
        let started = Instant::now();
        let risk = risk_score(request);
        let decision = if risk > 0.7 { Decision::Deny } else { Decision::Allow };
        Ok(verdict(
            &self.id,
            self.role(),
            decision,
            1.0 - risk,
            0.8,
            format!("risk_score={risk:.2}"),
            started,
        ))
    }
}

/// Biased toward ALLOW; only denies on near-certain risk.
pub struct PermissiveAgent {
    id: String,
}

impl PermissiveAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl AgentAdapter for PermissiveAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Permissive
    }

    async fn evaluate(&self, request: &DecisionRequest) -> Result<AgentVerdict> {
        let started = Instant::now();
        let risk = risk_score(request);
        let decision = if risk > 0.9 { Decision::Deny } else { Decision::Allow };
        Ok(verdict(
            &self.id,
            self.role(),
            decision,
            0.9 - risk * 0.5,
            0.7,
            format!("risk_score={risk:.2}"),
            started,
        ))
    }
}

/// Biased toward DENY; requires low risk and no anomaly flag to allow.
pub struct StrictAgent {
    id: String,
}

impl StrictAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl AgentAdapter for StrictAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Strict
    }

    async fn evaluate(&self, request: &DecisionRequest) -> Result<AgentVerdict> {
        let started = Instant::now();
        let risk = risk_score(request);
        let decision = if risk < 0.2 && !anomaly_flagged(request) {
            Decision::Allow
        } else {
            Decision::Deny
        };
        Ok(verdict(
            &self.id,
            self.role(),
            decision,
            0.6 + risk * 0.3,
            0.9,
            format!("risk_score={risk:.2}"),
            started,
        ))
    }
}

/// Anomaly-focused: denies whenever the anomaly flag is set, regardless
/// of the raw risk score.
pub struct WatchdogAgent {
    id: String,
}

impl WatchdogAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl AgentAdapter for WatchdogAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Watchdog
    }

    async fn evaluate(&self, request: &DecisionRequest) -> Result<AgentVerdict> {
        let started = Instant::now();
        let anomaly = anomaly_flagged(request);
        let risk = risk_score(request);
        let decision = if anomaly || risk > 0.5 {
            Decision::Deny
        } else {
            Decision::Allow
        };
        Ok(verdict(
            &self.id,
            self.role(),
            decision,
            if anomaly { 0.95 } else { 0.7 },
            0.85,
            if anomaly {
                "anomaly flag set".to_string()
            } else {
                format!("risk_score={risk:.2}")
            },
            started,
        ))
    }
}
