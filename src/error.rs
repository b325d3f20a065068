//! Error types for parlance

use thiserror::Error;

/// Result type alias for parlance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a voice chat session
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Recognizer error (fatal category; transient codes are handled in-loop)
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Completion endpoint error (non-2xx status, bad payload)
    #[error("completion error: {0}")]
    Completion(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
