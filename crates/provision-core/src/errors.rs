//! Error handling for Provision core
//!
//! Fetch failures are not Rust errors: they travel inside [`State`](crate::State)
//! as domain values. `ProvisionError` only covers misuse of the core API, such as
//! assembling a state that violates the provisioning invariants.

use serde::{Deserialize, Serialize};

/// Unified error type for core operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProvisionError {
    /// Invalid input, e.g. a state assembled from inconsistent parts
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl ProvisionError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
