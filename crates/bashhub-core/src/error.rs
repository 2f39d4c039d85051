//! Error types for the bashhub core library.

use thiserror::Error;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for settings resolution.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
