//! Error types for ledger storage.

use points_ledger_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The account a transaction was run against does not exist.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was looked up.
        user_id: String,
    },

    /// The record changed since it was read. Retry from a fresh read.
    #[error("write conflict")]
    Conflict,

    /// Every attempt of a transaction hit a write conflict.
    #[error("gave up after {attempts} conflicting attempts")]
    Contention {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound { user_id } => Self::UserNotFound { user_id },
            StoreError::Contention { attempts } => Self::Contention { attempts },
            StoreError::Conflict => Self::Contention { attempts: 1 },
            StoreError::Serialization(msg) => Self::Serialization(msg),
            StoreError::Database(msg) => Self::Storage(msg),
        }
    }
}
