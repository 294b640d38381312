/// Unified error types for the auths resolution core
use thiserror::Error;

/// Main error type for resolution and verification
#[derive(Error, Debug)]
pub enum AuthsError {
    /// Decode errors (malformed DID, hex, signature container, asset JSON)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport errors (network failure, non-2xx response, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (invariant violations)
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AuthsError {
    fn from(e: reqwest::Error) -> Self {
        AuthsError::Transport(e.to_string())
    }
}

/// Result type alias for core operations
pub type AuthsResult<T> = Result<T, AuthsError>;
