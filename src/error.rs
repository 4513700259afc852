//! Error types for LensPub
//!
//! All errors in the library are converted to `AppError`. The embedding
//! transport layer decides how each variant maps onto its own surface
//! (HTTP status codes, queue retries, ...).

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown actor handle (user-visible not-found)
    #[error("Resource not found")]
    NotFound,

    /// Key persistence collaborator unreachable
    #[error("Key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    /// Stored key material failed to parse
    #[error("Key material corrupt: {0}")]
    KeyMaterialCorrupt(String),

    /// Malformed input (activity, URI, configuration value)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote actor lookup failed
    #[error("Actor resolution failed: {0}")]
    Resolution(String),

    /// Delivery to a remote inbox failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
