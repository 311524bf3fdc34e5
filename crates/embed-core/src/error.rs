//! Error types for embed-core

use embed_types::limits::ERROR_PREVIEW_LEN;
use embed_types::{OwnerId, ValidationError};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for builder, store and lifecycle operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("No active builder session for owner {owner}")]
    NoActiveSession { owner: OwnerId },

    #[error("No saved document named '{name}'")]
    DocumentNotFound { name: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Extension '{name}' failed to activate: {reason}")]
    ExtensionActivation { name: String, reason: String },

    #[error("Initialization failed: {0}")]
    FatalInit(String),
}

impl Error {
    /// Whether the requester should see this error. Persistence, extension
    /// and init errors are only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NoActiveSession { .. } | Self::DocumentNotFound { .. }
        )
    }

    /// Short text shown to the requester.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoActiveSession { .. } => {
                "There is no embed in progress. Start one with /create.".to_string()
            }
            e if e.is_user_facing() => e.to_string(),
            e => format!(
                "An error occurred: {}",
                truncate_error(&e.to_string(), ERROR_PREVIEW_LEN)
            ),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Cut an error description to at most `max` characters.
pub fn truncate_error(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}
