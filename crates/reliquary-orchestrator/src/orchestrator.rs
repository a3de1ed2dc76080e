//! The decision orchestrator (§4.1): drives each request through
//! AGENT_EVALUATION -> CONSENSUS -> FINALIZATION -> AUDIT_LOG ->
//! COMPLETION, enforcing the overall timeout end to end.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use indexmap::IndexMap;
use reliquary_committee::AgentRegistry;
use reliquary_consensus::ConsensusDriver;
use reliquary_core::{
    AgentVerdict, Decision, DecisionRequest, DecisionStatus, Deadline, OrchestrationResult,
    ReliquaryConfig, ReliquaryError, RequestId, Result,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::admission::AdmissionControl;
use crate::finalize::tally;
use crate::interfaces::{AuditSink, TrustProvider};
use crate::workflow::PhaseCursor;

/// Ties together the committee registry, consensus driver, audit sink,
/// and trust provider behind the public `orchestrate`/`query`/`history`/
/// `emergency_override` surface (§6).
pub struct Orchestrator {
    config: ReliquaryConfig,
    registry: Arc<AgentRegistry>,
    consensus: Arc<ConsensusDriver>,
    audit: Arc<dyn AuditSink>,
    trust_provider: Arc<dyn TrustProvider>,
    admission: AdmissionControl,
    completed: RwLock<IndexMap<RequestId, OrchestrationResult>>,
}

impl Orchestrator {
    pub fn new(
        config: ReliquaryConfig,
        registry: Arc<AgentRegistry>,
        consensus: Arc<ConsensusDriver>,
        audit: Arc<dyn AuditSink>,
        trust_provider: Arc<dyn TrustProvider>,
    ) -> Self {
        let admission = AdmissionControl::new(config.max_concurrent_decisions, config.max_queue);
        Self {
            config,
            registry,
            consensus,
            audit,
            trust_provider,
            admission,
            completed: RwLock::new(IndexMap::new()),
        }
    }

    /// Drive `request` to a terminal [`OrchestrationResult`]. Blocks
    /// until the request completes, times out, or is rejected outright
    /// for capacity.
    pub async fn orchestrate(&self, request: DecisionRequest) -> Result<OrchestrationResult> {
        if !request.is_well_formed() {
            return Err(ReliquaryError::invalid(
                "request violates preconditions: timeout must be > 0 and priority in 1..=10",
            ));
        }

        let start = Instant::now();
        let deadline = Deadline::after(request.timeout);

        let admission = match self.admission.acquire(request.priority).await {
            Ok(guard) => guard,
            Err(_) => {
                let result = self.finish(
                    &request,
                    Decision::Deny,
                    0.0,
                    Vec::new(),
                    HashMap::new(),
                    DecisionStatus::Failed,
                    start.elapsed(),
                    "over_capacity",
                )
                .await;
                return Ok(result);
            }
        };

        let mut phase = PhaseCursor::new();
        if deadline.is_expired() {
            phase.advance(DecisionStatus::Timeout);
            let result = self
                .finish(
                    &request,
                    Decision::Deny,
                    0.0,
                    Vec::new(),
                    HashMap::new(),
                    DecisionStatus::Timeout,
                    start.elapsed(),
                    "deadline exceeded before evaluation began",
                )
                .await;
            drop(admission);
            return Ok(result);
        }
        phase.advance(DecisionStatus::Evaluating);
        debug!(request_id = %request.request_id, "request entered evaluation phase");

        let (eval_budget, consensus_budget) = self.config.split_budget(request.timeout);
        let eval_deadline = deadline.sub_budget(eval_budget);

        let trust = self
            .trust_provider
            .evaluate_trust(&request.requestor_id, &serde_json::Value::Null)
            .await?;

        let mut enriched = request.clone();
        enriched
            .context
            .insert("trust_score".to_string(), serde_json::json!(trust.trust_score));
        enriched.context.insert(
            "risk_level".to_string(),
            serde_json::json!(format!("{:?}", trust.risk_level)),
        );

        let agents = self.registry.snapshot().await;

        // Retry the whole evaluate -> consensus cycle a bounded number of
        // times on ConsensusFailed before settling on the terminal
        // outcome (supplemental to §4.1; see SPEC_FULL.md). A single
        // attempt already satisfies the common case, so this loop runs
        // once unless consensus genuinely fails.
        let mut attempt = 0u32;
        let (final_decision, status, verdicts, confidence, consensus_metrics) = loop {
            let verdicts = fan_out(&enriched, &agents, eval_deadline).await;
            debug_assert_eq!(verdicts.len(), agents.len());

            if deadline.is_expired() {
                // The overall deadline ran out during evaluation, before
                // consensus was even attempted this cycle; distinct from
                // ConsensusFailed, which implies consensus itself ran and
                // came back empty-handed.
                break (
                    Decision::Deny,
                    DecisionStatus::Timeout,
                    verdicts,
                    0.0,
                    HashMap::new(),
                );
            }

            let outcome = tally(&verdicts);
            // A winning side below the configured confidence floor is
            // treated as DENY regardless of which side "won" the raw
            // tally (§6).
            let confident_decision = if outcome.confidence >= self.config.consensus_threshold {
                outcome.decision
            } else {
                Decision::Deny
            };
            let proposed_value = vec![matches!(confident_decision, Decision::Allow) as u8];
            let consensus_deadline = deadline.sub_budget(consensus_budget);

            if agents.len() < 4 {
                // Below the minimum valid BFT committee size; the
                // weighted tally alone stands as the decision, same as a
                // degenerate single-view consensus would produce.
                break (
                    confident_decision,
                    DecisionStatus::ConsensusReached,
                    verdicts,
                    outcome.confidence,
                    HashMap::new(),
                );
            }

            match self
                .consensus
                .propose(proposed_value, consensus_deadline, Default::default())
                .await
            {
                Ok(decided) => {
                    let decided_allow = decided.value.first().copied().unwrap_or(0) != 0;
                    let report = self.consensus.metrics().await;
                    let mut consensus_metrics = HashMap::new();
                    consensus_metrics.insert("rounds".to_string(), serde_json::json!(report.totals.rounds));
                    consensus_metrics.insert(
                        "view_changes".to_string(),
                        serde_json::json!(report.totals.view_changes),
                    );
                    consensus_metrics.insert(
                        "success_rate".to_string(),
                        serde_json::json!(report.totals.success_rate()),
                    );
                    consensus_metrics.insert("retries".to_string(), serde_json::json!(attempt));
                    break (
                        if decided_allow { Decision::Allow } else { Decision::Deny },
                        DecisionStatus::ConsensusReached,
                        verdicts,
                        outcome.confidence,
                        consensus_metrics,
                    );
                }
                Err(err) if attempt < self.config.max_consensus_retries && !deadline.is_expired() => {
                    attempt += 1;
                    warn!(
                        request_id = %request.request_id,
                        error = %err,
                        attempt,
                        "consensus failed, retrying evaluate+consensus cycle"
                    );
                    continue;
                }
                Err(err) => {
                    warn!(request_id = %request.request_id, error = %err, "consensus failed, defaulting to DENY");
                    let mut consensus_metrics = HashMap::new();
                    consensus_metrics.insert("retries".to_string(), serde_json::json!(attempt));
                    break (
                        Decision::Deny,
                        DecisionStatus::ConsensusFailed,
                        verdicts,
                        outcome.confidence,
                        consensus_metrics,
                    );
                }
            }
        };

        match status {
            DecisionStatus::ConsensusReached => phase.advance(DecisionStatus::ConsensusReached),
            DecisionStatus::ConsensusFailed => phase.advance(DecisionStatus::ConsensusFailed),
            DecisionStatus::Timeout => phase.advance(DecisionStatus::Timeout),
            _ => unreachable!("loop only breaks with ConsensusReached, ConsensusFailed, or Timeout"),
        }

        let (terminal_status, finish_reason) = if status == DecisionStatus::Timeout {
            (DecisionStatus::Timeout, "deadline exceeded before consensus was attempted")
        } else if status == DecisionStatus::ConsensusFailed {
            phase.advance(DecisionStatus::Failed);
            (DecisionStatus::Failed, "")
        } else {
            phase.advance(DecisionStatus::Executed);
            (DecisionStatus::Executed, "")
        };

        let result = self
            .finish(
                &request,
                final_decision,
                confidence,
                verdicts,
                consensus_metrics,
                terminal_status,
                start.elapsed(),
                finish_reason,
            )
            .await;

        drop(admission);
        Ok(result)
    }

    async fn finish(
        &self,
        request: &DecisionRequest,
        final_decision: Decision,
        consensus_confidence: f64,
        verdicts: Vec<AgentVerdict>,
        mut consensus_metrics: HashMap<String, serde_json::Value>,
        status: DecisionStatus,
        execution_time: std::time::Duration,
        failure_reason: &str,
    ) -> OrchestrationResult {
        if !failure_reason.is_empty() {
            consensus_metrics.insert("reason".to_string(), serde_json::json!(failure_reason));
        }
        let participants = verdicts.iter().map(|v| v.agent_id.clone()).collect();
        let result = OrchestrationResult {
            request_id: request.request_id.clone(),
            final_decision,
            consensus_confidence,
            participants,
            verdicts,
            consensus_metrics,
            execution_time,
            status,
            timestamp_ms: reliquary_core::time::now_ms(),
        };

        // Audit append must happen before the terminal result is handed
        // back to the caller (§4.6, §7): the system must not claim
        // success without a durable audit trail.
        let payload = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
        self.audit.append(payload).await;

        self.record_completed(result.clone()).await;
        result
    }

    async fn record_completed(&self, result: OrchestrationResult) {
        let mut completed = self.completed.write().await;
        completed.insert(result.request_id.clone(), result);
        let cap = self.config.completed_decisions_capacity;
        while completed.len() > cap {
            completed.shift_remove_index(0);
        }
    }

    /// Look up a previously completed (or in-flight-but-already-recorded)
    /// request's result.
    pub async fn query(&self, request_id: &str) -> Result<OrchestrationResult> {
        self.completed
            .read()
            .await
            .get(request_id)
            .cloned()
            .ok_or_else(|| ReliquaryError::not_found(format!("request {request_id} not found")))
    }

    /// The `limit` most recently completed results, newest first.
    pub async fn history(&self, limit: usize) -> Vec<OrchestrationResult> {
        self.completed
            .read()
            .await
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Admin-only bypass (§4.1): record a derived `{request_id}_override`
    /// result without mutating the original. Capability checking is the
    /// caller's responsibility; this method trusts it has already
    /// happened.
    pub async fn emergency_override(
        &self,
        request_id: &str,
        decision: Decision,
        reason: &str,
    ) -> Result<bool> {
        if !self.config.emergency_override_enabled {
            return Err(ReliquaryError::unauthorized("emergency override path is disabled"));
        }
        let original = self.query(request_id).await?;

        let override_id = format!("{request_id}_override");
        let result = OrchestrationResult {
            request_id: override_id.clone(),
            final_decision: decision,
            consensus_confidence: 1.0,
            participants: vec!["emergency_override".to_string()],
            verdicts: Vec::new(),
            consensus_metrics: HashMap::from([
                ("override_of".to_string(), serde_json::json!(original.request_id)),
                ("reason".to_string(), serde_json::json!(reason)),
                ("marker".to_string(), serde_json::json!("EMERGENCY_OVERRIDE")),
            ]),
            execution_time: std::time::Duration::ZERO,
            status: DecisionStatus::Executed,
            timestamp_ms: reliquary_core::time::now_ms(),
        };

        let payload = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
        self.audit.append(payload).await;
        self.record_completed(result).await;
        info!(request_id, override_id, reason, "emergency override recorded");
        Ok(true)
    }
}

/// Fan out to every registered agent in parallel, substituting a
/// fallback DENY verdict for any agent that errors or exceeds
/// `eval_deadline` (§4.1).
async fn fan_out(
    request: &DecisionRequest,
    agents: &[Arc<dyn reliquary_committee::AgentAdapter>],
    eval_deadline: Deadline,
) -> Vec<AgentVerdict> {
    let futures = agents.iter().map(|agent| async move {
        let remaining = eval_deadline.remaining();
        match tokio::time::timeout(remaining, agent.evaluate(request)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(err)) => {
                AgentVerdict::fallback(agent.agent_id(), agent.role(), err.to_string(), reliquary_core::time::now_ms())
            }
            Err(_) => AgentVerdict::fallback(
                agent.agent_id(),
                agent.role(),
                "evaluation budget exceeded",
                reliquary_core::time::now_ms(),
            ),
        }
    });
    join_all(futures).await
}
