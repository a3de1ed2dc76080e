//! # ReliQuary Committee
//!
//! The specialized agent committee (§4.4): the [`adapter::AgentAdapter`]
//! seam, reference NEUTRAL/PERMISSIVE/STRICT/WATCHDOG adapters, the
//! registration roster, and the inter-agent message bus.

pub mod adapter;
pub mod inbox;
pub mod registry;
pub mod roles;

pub use adapter::AgentAdapter;
pub use inbox::{CommitteeMessage, MessageBus};
pub use registry::AgentRegistry;
pub use roles::{NeutralAgent, PermissiveAgent, StrictAgent, WatchdogAgent};
