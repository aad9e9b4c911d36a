//! Error types for Augur core

use thiserror::Error;

/// Main error type for Augur operations
///
/// The belief engine itself never fails on malformed evidence; these errors
/// come from the persistence boundary, configuration and tooling.
#[derive(Debug, Error)]
pub enum AugurError {
    /// Persistence adapter error (custom message)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error (generic)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),

    /// A save failed and the state is only held in memory until a retry succeeds
    #[error("State for agent '{agent_id}' is not persisted: {message}. Pending retries: {pending}")]
    Unpersisted {
        /// Agent identity whose state is pending
        agent_id: String,
        /// Underlying failure message
        message: String,
        /// Number of agents with unsaved state
        pending: usize,
    },
}

/// Convenient Result type using AugurError
pub type Result<T> = std::result::Result<T, AugurError>;

impl AugurError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        AugurError::Storage(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        AugurError::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AugurError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AugurError::NotFound(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        AugurError::Other(msg.into())
    }

    /// Whether retrying the same operation later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AugurError::Storage(_) | AugurError::Io(_) | AugurError::Unpersisted { .. }
        )
    }
}
