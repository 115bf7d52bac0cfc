//! Error types for strategy operations.
//!
//! Only backend faults are errors. A missing entity is an ordinary negative
//! result (`false`, `None` or an empty `Vec`) and never appears here.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for strategy and manager operations.
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Faults raised by a storage strategy.
///
/// The manager never catches or translates these; they reach the caller
/// exactly as the strategy produced them.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The backend rejected or failed the operation.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// The backend could not be reached.
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("backend timed out after {duration_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds.
        duration_ms: u64,
    },

    /// A fault raised by an adapter, preserved as its source.
    #[error("adapter error: {0}")]
    Adapter(#[source] Box<dyn StdError + Send + Sync>),
}

impl StrategyError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Wraps an adapter fault.
    pub fn adapter(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Adapter(source.into())
    }

    /// Returns true if the fault is about reaching the backend rather than
    /// the operation itself.
    ///
    /// Informational only; nothing in this crate retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}
