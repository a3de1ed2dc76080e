//! The BFT consensus driver (§4.2): leader election, the three-phase
//! PRE_PREPARE/PREPARE/COMMIT cycle, and view change on leader timeout.
//!
//! All committee members live inside one process (§5), so the driver plays
//! every replica's role concurrently rather than over a network socket. It
//! still constructs and signs one [`ConsensusMessage`] per replica per
//! phase, and every replica admits it through
//! [`ConsensusState::receive`] — which verifies the digest and
//! signature before tallying real `2f+1` quorums — rather than a
//! shortcut count.

use crate::messages::{ConsensusMessage, MessageType};
use crate::signer::Signer;
use crate::state::{ConsensusPhase, ConsensusState};
use reliquary_core::{Deadline, ReliquaryError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Injected test behavior for a misbehaving leader. Production callers pass
/// [`ByzantineBehavior::None`].
#[derive(Debug, Clone, Copy, Default)]
pub enum ByzantineBehavior {
    /// Every replica behaves correctly.
    #[default]
    None,
    /// The leader elected for `view` never broadcasts `PRE_PREPARE`,
    /// forcing the phase timeout and a view change.
    SilentLeaderAtView(u64),
}

/// Running totals surfaced by [`ConsensusDriver::metrics`].
#[derive(Debug, Clone, Default)]
pub struct ConsensusMetrics {
    /// Total consensus rounds driven to either DECIDED or exhausted.
    pub rounds: u64,
    /// Rounds that reached DECIDED.
    pub successes: u64,
    /// Rounds that exhausted their budget without deciding.
    pub failures: u64,
    /// Total view changes triggered across all rounds.
    pub view_changes: u64,
}

impl ConsensusMetrics {
    /// `successes / rounds`, `0.0` when no rounds have run yet.
    pub fn success_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.successes as f64 / self.rounds as f64
        }
    }
}

/// Snapshot returned by [`ConsensusDriver::metrics`], including the fixed
/// committee parameters.
#[derive(Debug, Clone)]
pub struct ConsensusMetricsReport {
    /// Cumulative counters.
    pub totals: ConsensusMetrics,
    /// Byzantine tolerance `f = floor((n-1)/3)`.
    pub tolerance: usize,
    /// Committee size `n`.
    pub n: usize,
}

/// The value agreed on and the view/sequence it was decided at.
#[derive(Debug, Clone)]
pub struct DecidedOutcome {
    /// View the value was finally decided in.
    pub view: u64,
    /// Sequence number of the decided instance.
    pub sequence: u64,
    /// The agreed-on opaque value.
    pub value: Vec<u8>,
    /// Number of view changes consumed to reach this outcome.
    pub view_changes: u64,
}

/// Drives one shard's BFT agreement over proposed values. Owns its
/// committee roster and sequencing state; agents and the threshold engine
/// are addressed through their own owning actors, never shared mutably.
pub struct ConsensusDriver {
    agent_ids: Vec<String>,
    f: usize,
    signer: Arc<dyn Signer>,
    sequence_counter: AtomicU64,
    metrics: Mutex<ConsensusMetrics>,
}

impl ConsensusDriver {
    /// Build a driver over `agent_ids`. Errors if the committee is smaller
    /// than the minimum valid size `n >= 3f+1 = 4`.
    pub fn new(agent_ids: Vec<String>, signer: Arc<dyn Signer>) -> Result<Self> {
        let mut agent_ids = agent_ids;
        agent_ids.sort();
        agent_ids.dedup();
        let n = agent_ids.len();
        if n < 4 {
            return Err(ReliquaryError::invalid(format!(
                "committee of {n} agents is below the minimum valid size of 4"
            )));
        }
        let f = (n - 1) / 3;
        Ok(Self {
            agent_ids,
            f,
            signer,
            sequence_counter: AtomicU64::new(0),
            metrics: Mutex::new(ConsensusMetrics::default()),
        })
    }

    /// Committee size.
    pub fn n(&self) -> usize {
        self.agent_ids.len()
    }

    /// Byzantine tolerance `f`.
    pub fn f(&self) -> usize {
        self.f
    }

    /// The quorum size `2f+1` required to advance PREPARE -> COMMIT and
    /// COMMIT -> DECIDED.
    pub fn quorum(&self) -> usize {
        2 * self.f + 1
    }

    /// Deterministic leader for `view`: `agent_ids_sorted[view mod n]`.
    pub fn leader_for_view(&self, view: u64) -> &str {
        &self.agent_ids[(view as usize) % self.agent_ids.len()]
    }

    /// Propose `value` and drive it to agreement, view-changing on leader
    /// timeout until either DECIDED or `deadline` elapses.
    pub async fn propose(
        &self,
        value: Vec<u8>,
        deadline: Deadline,
        byzantine: ByzantineBehavior,
    ) -> Result<DecidedOutcome> {
        let sequence = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let mut view = 0u64;
        let mut view_changes = 0u64;

        loop {
            if deadline.is_expired() {
                self.record_round(false, view_changes).await;
                return Err(ReliquaryError::consensus_failed(format!(
                    "deadline exceeded after {view_changes} view changes at sequence {sequence}"
                )));
            }

            match self
                .run_view(&value, view, sequence, deadline, byzantine)
                .await
            {
                Ok(decided_value) => {
                    self.record_round(true, view_changes).await;
                    return Ok(DecidedOutcome {
                        view,
                        sequence,
                        value: decided_value,
                        view_changes,
                    });
                }
                Err(ViewOutcome::Timeout) => {
                    warn!(view, sequence, "phase timeout, triggering view change");
                    view_changes += 1;
                    view += 1;
                }
            }
        }
    }

    /// Run one view of the three-phase protocol for `(view, sequence)`.
    async fn run_view(
        &self,
        value: &[u8],
        view: u64,
        sequence: u64,
        deadline: Deadline,
        byzantine: ByzantineBehavior,
    ) -> std::result::Result<Vec<u8>, ViewOutcome> {
        let leader = self.leader_for_view(view).to_string();
        let quorum = self.quorum();
        let budget = deadline.remaining();
        let (pre_prepare_budget, prepare_budget, commit_budget) = split_phase_budgets(budget);

        // --- PRE_PREPARE ---
        let leader_silent = matches!(
            byzantine,
            ByzantineBehavior::SilentLeaderAtView(v) if v == view
        );
        if leader_silent {
            tokio::time::sleep(pre_prepare_budget).await;
            return Err(ViewOutcome::Timeout);
        }

        let pre_prepare = self.sign_message(MessageType::PrePrepare, view, sequence, &leader, value.to_vec());

        let mut replicas: HashMap<&str, ConsensusState> = self
            .agent_ids
            .iter()
            .map(|id| (id.as_str(), ConsensusState::new(view, sequence, leader.clone())))
            .collect();
        let mut pre_prepare_accepted = false;
        for (agent_id, state) in replicas.iter_mut() {
            match state.receive(pre_prepare.clone(), quorum, self.signer.as_ref()) {
                Ok(_) => pre_prepare_accepted = true,
                Err(err) => warn!(agent = %agent_id, error = %err, "rejected PRE_PREPARE"),
            }
        }
        if !pre_prepare_accepted {
            tokio::time::sleep(pre_prepare_budget).await;
            return Err(ViewOutcome::Timeout);
        }
        debug!(view, sequence, leader = %leader, "PRE_PREPARE accepted by committee");

        // --- PREPARE ---
        let prepare_msgs: Vec<ConsensusMessage> = self
            .agent_ids
            .iter()
            .map(|id| self.sign_message(MessageType::Prepare, view, sequence, id, pre_prepare.digest.to_vec()))
            .collect();

        let mut prepared = false;
        for state in replicas.values_mut() {
            for msg in &prepare_msgs {
                match state.receive(msg.clone(), quorum, self.signer.as_ref()) {
                    Ok(true) => prepared = true,
                    Ok(false) => {}
                    Err(err) => warn!(error = %err, "rejected PREPARE"),
                }
            }
        }
        if !prepared {
            tokio::time::sleep(prepare_budget).await;
            return Err(ViewOutcome::Timeout);
        }

        // --- COMMIT ---
        let commit_msgs: Vec<ConsensusMessage> = self
            .agent_ids
            .iter()
            .map(|id| self.sign_message(MessageType::Commit, view, sequence, id, pre_prepare.digest.to_vec()))
            .collect();

        let mut decided = false;
        for state in replicas.values_mut() {
            for msg in &commit_msgs {
                match state.receive(msg.clone(), quorum, self.signer.as_ref()) {
                    Ok(true) => decided = true,
                    Ok(false) => {}
                    Err(err) => warn!(error = %err, "rejected COMMIT"),
                }
            }
        }
        if !decided {
            tokio::time::sleep(commit_budget).await;
            return Err(ViewOutcome::Timeout);
        }

        for (agent_id, state) in &replicas {
            if state.current_phase != ConsensusPhase::Decided {
                warn!(agent = %agent_id, "replica failed to reach DECIDED despite quorum");
            }
        }

        Ok(value.to_vec())
    }

    fn sign_message(
        &self,
        msg_type: MessageType,
        view: u64,
        sequence: u64,
        sender_id: &str,
        payload: Vec<u8>,
    ) -> ConsensusMessage {
        let mut msg = ConsensusMessage::new(msg_type, view, sequence, sender_id, reliquary_core::time::now_ms(), payload);
        msg.signature = self.signer.sign(sender_id, &msg.digest);
        msg
    }

    async fn record_round(&self, success: bool, view_changes: u64) {
        let mut m = self.metrics.lock().await;
        m.rounds += 1;
        if success {
            m.successes += 1;
        } else {
            m.failures += 1;
        }
        m.view_changes += view_changes;
    }

    /// Current cumulative metrics, plus the fixed committee parameters.
    pub async fn metrics(&self) -> ConsensusMetricsReport {
        ConsensusMetricsReport {
            totals: self.metrics.lock().await.clone(),
            tolerance: self.f,
            n: self.agent_ids.len(),
        }
    }
}

enum ViewOutcome {
    Timeout,
}

/// Split a consensus budget across the three phases per the default
/// 30/30/40 ratio (§4.2).
fn split_phase_budgets(total: Duration) -> (Duration, Duration, Duration) {
    let total_ms = total.as_millis() as u64;
    let pre_prepare = Duration::from_millis(total_ms * 30 / 100);
    let prepare = Duration::from_millis(total_ms * 30 / 100);
    let commit = Duration::from_millis(total_ms.saturating_sub(pre_prepare.as_millis() as u64 + prepare.as_millis() as u64));
    (pre_prepare, prepare, commit)
}
