//! Error types for tabstash-core.

use thiserror::Error;

use crate::codec::CodecError;
use crate::storage::size_kb;
use crate::types::Tier;

/// Result type alias using tabstash-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which quota dimension a rejected write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    /// A single stored item is larger than the per-item quota.
    PerItem,
    /// The tier's cumulative size would exceed its total quota.
    Total,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaKind::PerItem => write!(f, "QUOTA_BYTES_PER_ITEM"),
            QuotaKind::Total => write!(f, "QUOTA_BYTES"),
        }
    }
}

/// Core error types for tab stash operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (rejected before any I/O)
    #[error("{0}")]
    Validation(String),

    // Storage errors
    #[error("{tier} storage quota exceeded ({kind}): {message}")]
    QuotaExceeded {
        tier: Tier,
        kind: QuotaKind,
        message: String,
    },

    #[error("{tier} storage item limit reached (MAX_ITEMS {limit})")]
    TooManyItems { tier: Tier, limit: usize },

    #[error("{tier} storage unavailable: {message}")]
    StorageUnavailable { tier: Tier, message: String },

    #[error(
        "Collection size ({}KB) exceeds maximum allowed size ({}KB). Try saving fewer tabs.",
        kb(.size_bytes),
        kb(.limit_bytes)
    )]
    CollectionTooLarge { size_bytes: u64, limit_bytes: u64 },

    // Recycle bin errors
    #[error("Recycle bin entry deleted at {deleted_at} no longer exists")]
    EntryNotFound { deleted_at: i64 },

    // Codec errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Database errors (opening the file; failures afterwards are StorageUnavailable)
    #[cfg(feature = "db")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

fn kb(bytes: &u64) -> u64 {
    size_kb(*bytes)
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a quota error
    pub fn quota(tier: Tier, kind: QuotaKind, message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            tier,
            kind,
            message: message.into(),
        }
    }

    /// Create a storage unavailable error
    pub fn unavailable(tier: Tier, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            tier,
            message: message.into(),
        }
    }

    /// Check if this error is any quota violation
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. } | Self::CollectionTooLarge { .. })
    }

    /// Check if this error is a per-item quota violation.
    ///
    /// The promotion loop treats this as persistent and stops scheduling.
    pub fn is_per_item_quota(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded {
                kind: QuotaKind::PerItem,
                ..
            }
        )
    }

    /// Message suitable for showing to the user after a failed action.
    pub fn user_message(&self) -> String {
        match self {
            Self::TooManyItems { .. } => {
                "Maximum number of collections reached. Try deleting some old collections first."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}
