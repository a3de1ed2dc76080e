//! # ReliQuary Threshold
//!
//! Threshold cryptography engine (§4.3): Shamir secret sharing, Shamir
//! augmented with Pedersen-style verifiable commitments (VSS), a
//! placeholder threshold-signature combiner, and additive MPC sharing,
//! all behind one [`engine::ThresholdEngine`].

pub mod bigint_codec;
pub mod engine;
pub mod modmath;
pub mod mpc;
pub mod scheme;
pub mod shamir;
pub mod share;
pub mod threshold_sig;
pub mod vss;

pub use engine::{ThresholdEngine, ThresholdMetrics, ThresholdMetricsReport};
pub use scheme::{SchemeType, ThresholdScheme};
pub use share::{ReconstructionResult, SecretShare, ValidationStatus};
