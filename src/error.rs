//! Error types for the Metis trait modeling engine
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Metis operations
#[derive(Error, Debug)]
pub enum MetisError {
    /// LLM API request failed
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Remote service rejected the request due to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Learner record not found
    #[error("Learner not found: {0}")]
    LearnerNotFound(String),

    /// Invalid identifier format
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid operation (e.g., resolving an unknown misconception)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Metis operations
pub type Result<T> = std::result::Result<T, MetisError>;

/// Convert anyhow::Error to MetisError
impl From<anyhow::Error> for MetisError {
    fn from(err: anyhow::Error) -> Self {
        MetisError::Other(err.to_string())
    }
}
