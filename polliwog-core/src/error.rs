//! Error types for polliwog-core

use thiserror::Error;

/// Main error type for the polliwog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session-level feed error (auth, admit, overview, listing).
    /// Always fatal to the run.
    #[error("feed session error: {0}")]
    Session(String),

    /// Malformed binary data (JPEG segments, PNG chunks, timestamps)
    #[error("malformed {format} data: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    /// A bounded-retry filesystem operation exhausted its attempts
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        source: std::io::Error,
    },
}

/// Result type alias for polliwog-core
pub type Result<T> = std::result::Result<T, Error>;
