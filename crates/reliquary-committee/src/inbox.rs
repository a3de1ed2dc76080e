//! Per-agent message bus (§4.4 "messaging"): a FIFO inbox per registered
//! agent, supporting direct sends and broadcast. Used for the advisory
//! inter-agent chatter the committee can exchange alongside its verdicts
//! (e.g. a watchdog flagging a risk signal to the rest of the roster);
//! it is deliberately independent of the BFT consensus message flow in
//! `reliquary-consensus`, which carries the actual agreement protocol.

use std::collections::HashMap;

use reliquary_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

/// One message passed between committee agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitteeMessage {
    pub from: String,
    /// `None` for a broadcast message.
    pub to: Option<String>,
    pub payload: serde_json::Value,
    pub sent_at_ms: u64,
}

/// FIFO inboxes for every registered agent.
///
/// Each agent owns an unbounded `mpsc` channel; `send`/`broadcast` push
/// onto the receiving agent(s)' channel, `recv` drains this agent's
/// queue in order. Registering an agent that already has an inbox is a
/// no-op, matching the registry's idempotent-registration semantics.
pub struct MessageBus {
    senders: RwLock<HashMap<String, mpsc::UnboundedSender<CommitteeMessage>>>,
    receivers: RwLock<HashMap<String, mpsc::UnboundedReceiver<CommitteeMessage>>>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            receivers: RwLock::new(HashMap::new()),
        }
    }

    /// Provision an inbox for `agent_id` if it doesn't already have one.
    pub async fn ensure_inbox(&self, agent_id: &str) {
        if self.senders.read().await.contains_key(agent_id) {
            return;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.write().await.insert(agent_id.to_string(), tx);
        self.receivers.write().await.insert(agent_id.to_string(), rx);
    }

    /// Remove `agent_id`'s inbox, dropping any undelivered messages.
    pub async fn remove_inbox(&self, agent_id: &str) {
        self.senders.write().await.remove(agent_id);
        self.receivers.write().await.remove(agent_id);
    }

    /// Deliver `payload` from `from` directly to `to`'s inbox.
    pub async fn send(&self, from: &str, to: &str, payload: serde_json::Value) -> Result<()> {
        let senders = self.senders.read().await;
        let sender = senders
            .get(to)
            .ok_or_else(|| reliquary_core::ReliquaryError::not_found(format!("agent {to} has no inbox")))?;
        let msg = CommitteeMessage {
            from: from.to_string(),
            to: Some(to.to_string()),
            payload,
            sent_at_ms: reliquary_core::time::now_ms(),
        };
        sender
            .send(msg)
            .map_err(|_| reliquary_core::ReliquaryError::internal(format!("agent {to} inbox closed")))
    }

    /// Deliver `payload` from `from` to every other registered inbox.
    pub async fn broadcast(&self, from: &str, payload: serde_json::Value) {
        let senders = self.senders.read().await;
        let now = reliquary_core::time::now_ms();
        for (agent_id, sender) in senders.iter() {
            if agent_id == from {
                continue;
            }
            let msg = CommitteeMessage {
                from: from.to_string(),
                to: None,
                payload: payload.clone(),
                sent_at_ms: now,
            };
            // A closed receiver (agent deregistered mid-broadcast) is not
            // an error for the other recipients.
            let _ = sender.send(msg);
        }
    }

    /// Pop the next queued message for `agent_id`, in FIFO order.
    /// Returns `None` if the queue is currently empty.
    pub async fn try_recv(&self, agent_id: &str) -> Option<CommitteeMessage> {
        let mut receivers = self.receivers.write().await;
        receivers.get_mut(agent_id).and_then(|rx| rx.try_recv().ok())
    }

    /// Await the next queued message for `agent_id`. Returns `None` if
    /// the agent has no inbox or its inbox was removed while waiting.
    pub async fn recv(&self, agent_id: &str) -> Option<CommitteeMessage> {
        let mut receivers = self.receivers.write().await;
        let rx = receivers.get_mut(agent_id)?;
        rx.recv().await
    }
}
