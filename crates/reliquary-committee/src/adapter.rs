//! The agent adapter seam (§4.4): anything implementing [`AgentAdapter`]
//! can sit in the committee roster and be fanned out to by the
//! orchestrator, regardless of how it actually evaluates a request
//! (static rule table, model call, external service).

use async_trait::async_trait;
use reliquary_core::{AgentRole, AgentVerdict, DecisionRequest, Result};

/// One committee member's evaluation contract.
///
/// Implementations must be cheap to hold (`Send + Sync`) since the
/// registry keeps one boxed adapter alive per agent for the life of the
/// process; the actual evaluation work happens inside `evaluate`.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Stable identity of this agent, used as the committee message and
    /// consensus replica id.
    fn agent_id(&self) -> &str;

    /// The fixed policy-bias role this agent plays.
    fn role(&self) -> AgentRole;

    /// Produce a verdict for `request`. Implementations should not sleep
    /// past `request.timeout`; the orchestrator applies its own deadline
    /// independently and will fall back to [`AgentVerdict::fallback`] if
    /// this call doesn't return in time.
    async fn evaluate(&self, request: &DecisionRequest) -> Result<AgentVerdict>;
}
