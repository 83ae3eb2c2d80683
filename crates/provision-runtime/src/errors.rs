//! Runtime error types
//!
//! These only describe infrastructure problems. A failed fetch is never an
//! error here: it becomes a `Result` state carrying the domain failure.

use provision_core::ProvisionError;

/// Errors raised by datasource handles, emitters and configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasourceError {
    /// The datasource driver has stopped; impulses can no longer be delivered
    #[error("Datasource has shut down")]
    Shutdown,

    /// The consumer of an impulse channel went away
    #[error("Impulse source closed")]
    ImpulseSourceClosed,

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Error from the core crate
    #[error(transparent)]
    Core(#[from] ProvisionError),
}

impl DatasourceError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
