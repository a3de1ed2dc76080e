//! The committee roster (§4.4): register, deregister, and list agent
//! adapters. Registration is idempotent by `agent_id` — re-registering
//! replaces the prior adapter rather than erroring, so an operator can
//! hot-swap an agent's implementation without a deregister/register
//! race window.

use std::sync::Arc;

use indexmap::IndexMap;
use reliquary_core::{AgentRole, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::adapter::AgentAdapter;

/// Owns the live committee roster for one orchestrator instance.
///
/// Insertion order is preserved (`IndexMap`) so deterministic leader
/// election in the consensus driver (`agent_ids_sorted[view mod n]`) can
/// be layered on top of a stable, inspectable roster ordering.
pub struct AgentRegistry {
    agents: RwLock<IndexMap<String, Arc<dyn AgentAdapter>>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(IndexMap::new()),
        }
    }

    /// Register (or replace) `agent`. Idempotent: registering the same
    /// `agent_id` again swaps the adapter without affecting registry
    /// order for other agents.
    pub async fn register(&self, agent: Arc<dyn AgentAdapter>) {
        let id = agent.agent_id().to_string();
        let replaced = self.agents.write().await.insert(id.clone(), agent).is_some();
        if replaced {
            debug!(agent_id = %id, "agent re-registered, adapter replaced");
        } else {
            info!(agent_id = %id, "agent registered");
        }
    }

    /// Remove `agent_id` from the roster. Returns `true` if it was
    /// present.
    pub async fn deregister(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.shift_remove(agent_id).is_some();
        if removed {
            info!(agent_id, "agent deregistered");
        }
        removed
    }

    /// All currently registered agent ids, in registration order.
    pub async fn list_ids(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }

    /// All currently registered `(agent_id, role)` pairs, in
    /// registration order.
    pub async fn list_roles(&self) -> Vec<(String, AgentRole)> {
        self.agents
            .read()
            .await
            .values()
            .map(|a| (a.agent_id().to_string(), a.role()))
            .collect()
    }

    /// Fetch one agent's adapter handle by id.
    pub async fn get(&self, agent_id: &str) -> Option<Arc<dyn AgentAdapter>> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Snapshot of every registered adapter, in registration order.
    pub async fn snapshot(&self) -> Vec<Arc<dyn AgentAdapter>> {
        self.agents.read().await.values().cloned().collect()
    }

    /// Number of currently registered agents.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Convenience used by callers that need a `Result`-returning lookup
/// rather than an `Option` (e.g. the orchestrator, where a missing agent
/// at evaluation time is a recoverable fallback-to-DENY case, not an
/// error — see `AgentVerdict::fallback`).
pub async fn require(registry: &AgentRegistry, agent_id: &str) -> Result<Arc<dyn AgentAdapter>> {
    registry
        .get(agent_id)
        .await
        .ok_or_else(|| reliquary_core::ReliquaryError::not_found(format!("agent {agent_id} not registered")))
}
