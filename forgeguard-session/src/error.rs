//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend store error
    #[error("Session store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SessionError> for forgeguard_core::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Config(msg) => forgeguard_core::Error::Configuration(msg),
            other => forgeguard_core::Error::Session(other.to_string()),
        }
    }
}
