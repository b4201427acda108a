//! Error types for huddle-core

use thiserror::Error;

/// Result type alias using huddle-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in huddle-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend (PostgREST/RPC) rejected the request
    #[error("Backend error: {0}")]
    Backend(String),

    /// Session handling failed
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// No signed-in user for an operation that needs one
    #[error("Unauthorized: please sign in")]
    Unauthorized,

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Realtime socket or subscription error
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
