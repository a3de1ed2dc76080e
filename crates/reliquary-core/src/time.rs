//! Monotonic deadline propagation and cancellation tokens (§5).

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current wall-clock time, milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A monotonic deadline propagated through every subtask of a request.
///
/// Crossing it cancels in-flight agent evaluations and aborts the consensus
/// round. Cheap to clone and check from any suspension point.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// Time remaining before the deadline, zero if already past.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has already elapsed.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// A sub-deadline `budget` from now, clamped to never exceed this one.
    pub fn sub_budget(&self, budget: Duration) -> Self {
        let candidate = Instant::now() + budget;
        Self {
            at: candidate.min(self.at),
        }
    }
}
