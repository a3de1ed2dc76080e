//! End-to-end scenarios driving a full [`Orchestrator`] through the
//! committee, consensus, and audit crates together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reliquary_audit::AuditLog;
use reliquary_committee::{AgentAdapter, AgentRegistry, NeutralAgent, PermissiveAgent, StrictAgent, WatchdogAgent};
use reliquary_consensus::{ConsensusDriver, HmacSigner};
use reliquary_core::{
    AgentRole, AgentVerdict, Decision, DecisionRequest, DecisionStatus, DecisionType, ReliquaryConfig,
};
use reliquary_orchestrator::{Orchestrator, StaticTrustProvider};

const AGENT_IDS: [&str; 4] = ["neutral-1", "permissive-1", "strict-1", "watchdog-1"];

async fn full_committee(registry: &AgentRegistry) {
    registry.register(Arc::new(NeutralAgent::new("neutral-1"))).await;
    registry.register(Arc::new(PermissiveAgent::new("permissive-1"))).await;
    registry.register(Arc::new(StrictAgent::new("strict-1"))).await;
    registry.register(Arc::new(WatchdogAgent::new("watchdog-1"))).await;
}

/// An agent that always outlasts any evaluation budget, used to exercise
/// the orchestrator's timeout-fallback path deterministically.
struct SlowAgent {
    id: String,
    role: AgentRole,
    delay: Duration,
}

#[async_trait]
impl AgentAdapter for SlowAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        self.role
    }

    async fn evaluate(&self, _request: &DecisionRequest) -> reliquary_core::Result<AgentVerdict> {
        tokio::time::sleep(self.delay).await;
        Ok(AgentVerdict {
            agent_id: self.id.clone(),
            agent_role: self.role,
            decision: Decision::Allow,
            confidence: 1.0,
            trust_score: 1.0,
            reasoning: "should never be observed".to_string(),
            risk_factors: Default::default(),
            processing_time: self.delay,
            timestamp_ms: 0,
        })
    }
}

async fn build_orchestrator(config: ReliquaryConfig) -> Orchestrator {
    let registry = Arc::new(AgentRegistry::new());
    full_committee(&registry).await;

    let signer = Arc::new(HmacSigner::from_agent_ids(AGENT_IDS.iter().copied()));
    let consensus = Arc::new(
        ConsensusDriver::new(AGENT_IDS.iter().map(|s| s.to_string()).collect(), signer).unwrap(),
    );
    let audit = Arc::new(AuditLog::new());
    let trust_provider = Arc::new(StaticTrustProvider { default_score: 1.0 });

    Orchestrator::new(config, registry, consensus, audit, trust_provider)
}

fn request(risk: f64, anomaly: bool, priority: u8, timeout: Duration) -> DecisionRequest {
    let mut context = HashMap::new();
    context.insert("risk_score".to_string(), serde_json::json!(risk));
    context.insert("anomaly".to_string(), serde_json::json!(anomaly));
    DecisionRequest::new(
        DecisionType::Access,
        "alice",
        "vault-1",
        "read",
        context,
        priority,
        timeout,
        reliquary_core::time::now_ms(),
    )
}

/// S1: low risk, no anomaly -- every role-biased agent allows, so the
/// committee and consensus both agree on ALLOW with full confidence.
#[tokio::test]
async fn s1_unanimous_low_risk_allows() {
    let orchestrator = build_orchestrator(ReliquaryConfig::default()).await;
    let result = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(result.final_decision, Decision::Allow);
    assert_eq!(result.status, DecisionStatus::Executed);
    assert_eq!(result.verdicts.len(), 4);
    assert!(result.consensus_confidence > 0.9);
}

/// S2: moderate risk splits the committee along its role biases
/// (permissive/neutral allow, strict/watchdog deny); the strict/watchdog
/// pair's higher trust weighting should tip the final decision to DENY.
#[tokio::test]
async fn s2_split_committee_resolves_via_weighted_tally() {
    let orchestrator = build_orchestrator(ReliquaryConfig::default()).await;
    let result = orchestrator
        .orchestrate(request(0.6, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(result.final_decision, Decision::Deny);
    assert_eq!(result.status, DecisionStatus::Executed);
    assert_eq!(result.verdicts.len(), 4);
}

/// S3: one agent is too slow to answer inside its evaluation budget; the
/// orchestrator still produces a complete verdict set by substituting a
/// fallback DENY for that agent rather than hanging, and the remaining
/// honest ALLOW votes still carry the decision.
#[tokio::test]
async fn s3_one_slow_agent_falls_back_without_swaying_the_rest() {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(Arc::new(NeutralAgent::new("neutral-1"))).await;
    registry.register(Arc::new(PermissiveAgent::new("permissive-1"))).await;
    registry.register(Arc::new(WatchdogAgent::new("watchdog-1"))).await;
    registry
        .register(Arc::new(SlowAgent {
            id: "strict-1".to_string(),
            role: AgentRole::Strict,
            delay: Duration::from_secs(10),
        }))
        .await;

    let signer = Arc::new(HmacSigner::from_agent_ids(AGENT_IDS.iter().copied()));
    let consensus = Arc::new(
        ConsensusDriver::new(AGENT_IDS.iter().map(|s| s.to_string()).collect(), signer).unwrap(),
    );
    let audit = Arc::new(AuditLog::new());
    let trust_provider = Arc::new(StaticTrustProvider { default_score: 1.0 });

    let mut config = ReliquaryConfig::default();
    config.evaluation_budget_fraction = 0.5;
    let orchestrator = Orchestrator::new(config, registry, consensus, audit, trust_provider);

    let result = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(result.verdicts.len(), 4);
    let strict = result
        .verdicts
        .iter()
        .find(|v| v.agent_id == "strict-1")
        .unwrap();
    assert_eq!(strict.decision, Decision::Deny);
    assert_eq!(strict.trust_score, 0.0);
    assert_eq!(result.final_decision, Decision::Allow);
}

/// A request queued beyond `max_queue` is rejected immediately with
/// status FAILED rather than blocking indefinitely. The first request is
/// kept genuinely in flight by a slow agent so the admission slot is
/// still held when the second request arrives.
#[tokio::test]
async fn over_capacity_request_fails_immediately() {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(Arc::new(NeutralAgent::new("neutral-1"))).await;
    registry.register(Arc::new(PermissiveAgent::new("permissive-1"))).await;
    registry.register(Arc::new(WatchdogAgent::new("watchdog-1"))).await;
    registry
        .register(Arc::new(SlowAgent {
            id: "strict-1".to_string(),
            role: AgentRole::Strict,
            delay: Duration::from_secs(30),
        }))
        .await;

    let signer = Arc::new(HmacSigner::from_agent_ids(AGENT_IDS.iter().copied()));
    let consensus = Arc::new(
        ConsensusDriver::new(AGENT_IDS.iter().map(|s| s.to_string()).collect(), signer).unwrap(),
    );
    let audit = Arc::new(AuditLog::new());
    let trust_provider = Arc::new(StaticTrustProvider { default_score: 1.0 });

    let mut config = ReliquaryConfig::default();
    config.max_concurrent_decisions = 1;
    config.max_queue = 0;
    let orchestrator = Arc::new(Orchestrator::new(config, registry, consensus, audit, trust_provider));

    let holder = orchestrator.clone();
    let held = tokio::spawn(async move {
        holder
            .orchestrate(request(0.05, false, 5, Duration::from_secs(10)))
            .await
    });
    tokio::task::yield_now().await;

    let rejected = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(rejected.status, DecisionStatus::Failed);
    assert_eq!(
        rejected.consensus_metrics.get("reason").and_then(|v| v.as_str()),
        Some("over_capacity")
    );

    held.abort();
}

/// S8: an admin-issued emergency override records a derived result
/// without mutating the original decision, and is rejected when the
/// override path is disabled by configuration.
#[tokio::test]
async fn s8_emergency_override_records_a_derived_result() {
    let orchestrator = build_orchestrator(ReliquaryConfig::default()).await;
    let original = orchestrator
        .orchestrate(request(0.6, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(original.final_decision, Decision::Deny);

    orchestrator
        .emergency_override(&original.request_id, Decision::Allow, "security team approved manual bypass")
        .await
        .unwrap();

    let overridden = orchestrator
        .query(&format!("{}_override", original.request_id))
        .await
        .unwrap();
    assert_eq!(overridden.final_decision, Decision::Allow);

    // the original record is untouched
    let still_original = orchestrator.query(&original.request_id).await.unwrap();
    assert_eq!(still_original.final_decision, Decision::Deny);
}

#[tokio::test]
async fn emergency_override_is_refused_when_disabled() {
    let mut config = ReliquaryConfig::default();
    config.emergency_override_enabled = false;
    let orchestrator = build_orchestrator(config).await;
    let original = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();

    let err = orchestrator
        .emergency_override(&original.request_id, Decision::Deny, "should be refused")
        .await;
    assert!(err.is_err());
}

/// The overall deadline runs out during evaluation, before consensus is
/// even attempted: the orchestrator reports TIMEOUT (not FAILED) and
/// denies, per the distinct terminal path the workflow table reserves
/// for a deadline that elapses before consensus starts.
#[tokio::test]
async fn request_that_times_out_during_evaluation_reports_timeout_not_failed() {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(Arc::new(NeutralAgent::new("neutral-1"))).await;
    registry.register(Arc::new(PermissiveAgent::new("permissive-1"))).await;
    registry.register(Arc::new(WatchdogAgent::new("watchdog-1"))).await;
    registry
        .register(Arc::new(SlowAgent {
            id: "strict-1".to_string(),
            role: AgentRole::Strict,
            delay: Duration::from_millis(500),
        }))
        .await;

    let signer = Arc::new(HmacSigner::from_agent_ids(AGENT_IDS.iter().copied()));
    let consensus = Arc::new(
        ConsensusDriver::new(AGENT_IDS.iter().map(|s| s.to_string()).collect(), signer).unwrap(),
    );
    let audit = Arc::new(AuditLog::new());
    let trust_provider = Arc::new(StaticTrustProvider { default_score: 1.0 });

    let mut config = ReliquaryConfig::default();
    config.evaluation_budget_fraction = 1.0;
    let orchestrator = Orchestrator::new(config, registry, consensus, audit, trust_provider);

    let result = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_millis(30)))
        .await
        .unwrap();

    assert_eq!(result.status, DecisionStatus::Timeout);
    assert_eq!(result.final_decision, Decision::Deny);
}

/// `history` returns completed decisions newest first, and `query`
/// returns `NotFound` for an unknown request id.
#[tokio::test]
async fn history_and_query_reflect_completed_decisions() {
    let orchestrator = build_orchestrator(ReliquaryConfig::default()).await;
    let first = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();
    let second = orchestrator
        .orchestrate(request(0.05, false, 5, Duration::from_secs(5)))
        .await
        .unwrap();

    let history = orchestrator.history(2).await;
    assert_eq!(history[0].request_id, second.request_id);
    assert_eq!(history[1].request_id, first.request_id);

    assert!(orchestrator.query("does-not-exist").await.is_err());
}
