//! Error types for SALD

use thiserror::Error;

/// Result type alias for SALD operations
pub type Result<T> = std::result::Result<T, SaldError>;

/// Main error type for SALD
#[derive(Error, Debug)]
pub enum SaldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Progress state error: {0}")]
    State(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
