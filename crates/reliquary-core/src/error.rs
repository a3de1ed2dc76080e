//! Unified error system for the ReliQuary core.
//!
//! One error type per §7 of the decision-engine design: explicit result
//! variants at every boundary, never exceptions.

use serde::{Deserialize, Serialize};

/// Unified error type for all ReliQuary core operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ReliquaryError {
    /// Request deadline exceeded.
    #[error("timeout: {message}")]
    Timeout {
        /// Description of what timed out.
        message: String,
    },

    /// Consensus rounds exhausted or view changes diverged.
    #[error("consensus failed: {message}")]
    ConsensusFailed {
        /// Description of the consensus failure.
        message: String,
    },

    /// Reconstruction attempted with fewer than the threshold number of shares.
    #[error("insufficient shares: {message}")]
    InsufficientShares {
        /// Description naming the threshold and count observed.
        message: String,
    },

    /// A specific share failed validation.
    #[error("share invalid: {message}")]
    ShareInvalid {
        /// Description of why the share was rejected.
        message: String,
    },

    /// Unknown request, scheme, agent, or vault datum.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// Over queue or concurrency caps.
    #[error("capacity exceeded: {message}")]
    CapacityExceeded {
        /// Description of the exceeded limit.
        message: String,
    },

    /// Capability check failed. The core maps this to a DENY decision.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of the missing capability.
        message: String,
    },

    /// Invalid input or configuration.
    #[error("invalid: {message}")]
    Invalid {
        /// Description of the invalid input.
        message: String,
    },

    /// Cryptographic operation failed.
    #[error("crypto error: {message}")]
    Crypto {
        /// Description of the cryptographic failure.
        message: String,
    },

    /// Unexpected internal error. Always produces a DENY terminal result.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ReliquaryError {
    /// Construct a [`ReliquaryError::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::ConsensusFailed`].
    pub fn consensus_failed(message: impl Into<String>) -> Self {
        Self::ConsensusFailed {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::InsufficientShares`].
    pub fn insufficient_shares(message: impl Into<String>) -> Self {
        Self::InsufficientShares {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::ShareInvalid`].
    pub fn share_invalid(message: impl Into<String>) -> Self {
        Self::ShareInvalid {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::CapacityExceeded`].
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::Crypto`].
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Construct a [`ReliquaryError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::CapacityExceeded { .. })
    }

    /// Stable category tag, used in metrics and audit payloads.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::ConsensusFailed { .. } => "consensus_failed",
            Self::InsufficientShares { .. } => "insufficient_shares",
            Self::ShareInvalid { .. } => "share_invalid",
            Self::NotFound { .. } => "not_found",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Invalid { .. } => "invalid",
            Self::Crypto { .. } => "crypto",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether this error, surfaced at the orchestrator boundary, must
    /// resolve to a DENY terminal decision rather than propagate as-is.
    pub fn forces_deny(&self) -> bool {
        matches!(
            self,
            Self::ConsensusFailed { .. } | Self::Unauthorized { .. } | Self::Internal { .. }
        )
    }
}

/// Standard `Result` type for ReliQuary core operations.
pub type Result<T> = std::result::Result<T, ReliquaryError>;

impl From<serde_json::Error> for ReliquaryError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(format!("serialization error: {err}"))
    }
}

impl From<std::io::Error> for ReliquaryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::unauthorized(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<uuid::Error> for ReliquaryError {
    fn from(err: uuid::Error) -> Self {
        Self::invalid(format!("uuid error: {err}"))
    }
}
