//! Error types for adapter operations.

use entimgr_core::StrategyError;
use thiserror::Error;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Faults raised by a backend adapter.
///
/// Adapters report a missing row as a value (`false`,
/// [`crate::KeyedOutcome::Missing`]), never through this type.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection to the backend failed or was lost.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// A backend constraint was violated.
    #[error("constraint violated: {message}")]
    Constraint {
        /// Description of the violation.
        message: String,
    },

    /// The adapter was closed.
    #[error("adapter is closed")]
    Closed,
}

impl AdapterError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a constraint error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }
}

impl From<AdapterError> for StrategyError {
    fn from(err: AdapterError) -> Self {
        StrategyError::adapter(err)
    }
}
