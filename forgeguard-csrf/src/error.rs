use forgeguard_session::SessionError;
use thiserror::Error;

/// Operational failures of the token lifecycle.
///
/// A missing or mismatched token is not an error: it is the normal reject
/// outcome, see [`Rejection`](crate::Rejection).
#[derive(Error, Debug)]
pub enum CsrfError {
    /// Invalid configuration or a storage backend missing from the pipeline
    #[error("CSRF configuration error: {0}")]
    Configuration(String),

    #[error("Token generation failed: {0}")]
    Generation(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl CsrfError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<CsrfError> for forgeguard_core::Error {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::Configuration(msg) => forgeguard_core::Error::Configuration(msg),
            other => forgeguard_core::Error::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
