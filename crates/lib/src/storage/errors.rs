//! Storage error types.
//!
//! Storage errors are cloneable so the [`Store`](super::Store) can keep a copy
//! of the most recent outcome while handing the original to the caller.

use thiserror::Error;

/// Errors that can occur in the storage façade or a backend.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// An operation that needs a connection was called while closed.
    #[error("Store is not open")]
    NotOpen,

    /// `open` was called on a store that is already open.
    #[error("Store is already open")]
    AlreadyOpen,

    /// No record matched the lookup.
    #[error("User not found")]
    NotFound,

    /// A uniqueness invariant would be violated.
    #[error("A user with this {field} already exists")]
    Conflict {
        /// The field that collided
        field: String,
    },

    /// The backend does not implement an optional capability.
    #[error("Storage driver does not support {capability}")]
    NoSupport {
        /// The capability that was requested
        capability: String,
    },

    /// The wildcard domain was used with a key that is only unique per domain.
    #[error("Lookup by {key} requires a domain")]
    MatchAnyNotSupported {
        /// The lookup key that was used
        key: String,
    },

    /// A lookup key name that no backend understands.
    #[error("Unknown lookup key: {key}")]
    InvalidKey {
        /// The key as given
        key: String,
    },

    /// The connection string could not be used.
    #[error("Invalid connection string: {reason}")]
    InvalidDsn {
        /// Why it was rejected
        reason: String,
    },

    /// Failed to read or write a backing file.
    #[error("Storage I/O error: {reason}")]
    Io {
        /// The underlying I/O error, rendered
        reason: String,
    },

    /// Stored data could not be encoded or decoded.
    #[error("Storage serialization error: {reason}")]
    Serialization {
        /// The underlying serde error, rendered
        reason: String,
    },

    /// Any other backend failure.
    #[error("Storage backend error: {reason}")]
    Backend {
        /// Description from the backend
        reason: String,
    },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }

    /// Check if this error is about the open/closed state machine.
    pub fn is_state_error(&self) -> bool {
        matches!(self, StorageError::NotOpen | StorageError::AlreadyOpen)
    }

    /// Check if this error was caused by the request rather than the backend.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            StorageError::MatchAnyNotSupported { .. } | StorageError::InvalidKey { .. }
        )
    }

    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            StorageError::Io { .. } | StorageError::Serialization { .. }
        )
    }

    /// HTTP-style status code for this condition.
    pub fn status_code(&self) -> u16 {
        match self {
            e if e.is_request_error() => 400,
            StorageError::NotFound => 404,
            StorageError::Conflict { .. } => 409,
            StorageError::NoSupport { .. } => 501,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<StorageError> for crate::Error {
    fn from(err: StorageError) -> Self {
        crate::Error::Storage(err)
    }
}
