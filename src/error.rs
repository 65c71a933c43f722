//! Error types for the traffic-watch client core

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    // ========== Session errors ==========
    /// Bad credentials or malformed login input
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Malformed input, e.g. mismatched password confirmation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Username or email already registered upstream
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Expired or invalid token. The session has already been cleared when
    /// a caller sees this.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Response arrived after the session it belonged to had ended
    #[error("Stale response discarded (issued in epoch {issued}, current epoch {current})")]
    Stale { issued: u64, current: u64 },

    // ========== Transport errors ==========
    /// No response received
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== Domain errors ==========
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Errors the caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(err.to_string())
    }
}
