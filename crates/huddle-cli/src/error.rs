use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] huddle_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No content provided")]
    EmptyContent,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("{0} cannot be empty")]
    EmptyIdentifier(&'static str),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Profile '{0}' is not signed in. Run `huddle auth login --email <email> --password <password>` first."
    )]
    NotSignedIn(String),
    #[error("Realtime is disabled for profile '{0}'")]
    RealtimeDisabled(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<huddle_core::auth::AuthError> for CliError {
    fn from(error: huddle_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
