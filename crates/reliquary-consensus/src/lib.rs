//! # ReliQuary Consensus
//!
//! PBFT-style agreement over a single proposed decision value (§4.2):
//! PRE_PREPARE -> PREPARE -> COMMIT -> DECIDED, with view change on leader
//! timeout or equivocation evidence. Tolerates up to `f = floor((n-1)/3)`
//! Byzantine committee members.

pub mod driver;
pub mod messages;
pub mod signer;
pub mod state;

pub use driver::{ByzantineBehavior, ConsensusDriver, ConsensusMetrics, ConsensusMetricsReport, DecidedOutcome};
pub use messages::{ConsensusMessage, Digest32, MessageType};
pub use signer::{HmacSigner, Signer};
pub use state::{ConsensusPhase, ConsensusState};
