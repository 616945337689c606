//! SDK Error Types
//!
//! Defines error types for the Tab Stash SDK.

use tabstash_core::Tier;
use thiserror::Error;

/// SDK Result type alias
pub type StashResult<T> = Result<T, StashError>;

/// SDK errors
#[derive(Debug, Error)]
pub enum StashError {
    /// Error from a core operation
    #[error(transparent)]
    Core(#[from] tabstash_core::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Tab source or tab opener failure
    #[error("browser error: {message}")]
    Browser { message: String },

    /// Collection named by a command does not exist
    #[error("collection \"{name}\" not found in {tier} storage")]
    CollectionNotFound { name: String, tier: Tier },

    /// Undo requested after the notice expired
    #[error("undo window has expired")]
    UndoExpired,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl StashError {
    /// Create a browser error
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Check if this error stops background promotion for good
    pub fn is_per_item_quota(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_per_item_quota())
    }

    /// Message shown to the user for a failed action
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
