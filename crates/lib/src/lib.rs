//!
//! Tollgate: a multi-tenant user identity service.
//! This library provides the pieces for registering users, checking their
//! passwords and managing their sessions on behalf of trusted callers.
//!
//! ## Core Concepts
//!
//! * **Drivers (`registry::DriverRegistry`)**: Named, self-describing implementations grouped by
//!   concern. Storage backends live in the `storage` group, password algorithms in `encryption`.
//!   [`Drivers`] is the composition root holding both.
//! * **Store (`storage::Store`)**: A façade over one storage backend. It tracks open/closed state,
//!   remembers the last error and hides optional backend capabilities.
//! * **Encryption (`crypt::EncryptDriver`)**: Password hashing and comparison using a per-user salt,
//!   a driver salt and a rotating static salt.
//! * **Users (`user::User`)**: Records scoped to a domain (tenant). Login names and emails are
//!   unique within a domain; Guids and session tokens are unique everywhere.
//! * **Envelopes (`envelope::Package`)**: Signed request/response packages. Callers sign with their
//!   own salt; the service checks the signature and a replay window.
//! * **Service (`service::AuthService`)**: The engine running register, login, authenticate,
//!   logout and update for system-account callers.

pub mod clock;
pub mod constants;
pub mod crypt;
pub mod drivers;
pub mod envelope;
pub mod registry;
pub mod service;
pub mod storage;
pub mod user;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use drivers::Drivers;
pub use service::{AuthService, Operation, ServiceOptions};
pub use storage::Store;
pub use user::User;

/// Result type used throughout the Tollgate library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Tollgate library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured driver registry errors from the registry module
    #[error(transparent)]
    Registry(registry::RegistryError),

    /// Structured password hashing errors from the crypt module
    #[error(transparent)]
    Crypt(crypt::CryptError),

    /// Structured storage errors from the storage module
    #[error(transparent)]
    Storage(storage::StorageError),

    /// Structured envelope errors from the envelope module
    #[error(transparent)]
    Envelope(envelope::EnvelopeError),

    /// Structured user record and session errors from the user module
    #[error(transparent)]
    User(user::UserError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Registry(_) => "registry",
            Error::Crypt(_) => "crypt",
            Error::Storage(_) => "storage",
            Error::Envelope(_) => "envelope",
            Error::User(_) => "user",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// HTTP-style status code carried in response envelopes.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Storage(storage_err) => storage_err.status_code(),
            Error::Envelope(envelope_err) => envelope_err.status_code(),
            Error::User(user_err) => user_err.status_code(),
            Error::Registry(_) | Error::Crypt(_) | Error::Io(_) | Error::Serialize(_) => 500,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists, already logged in).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_conflict(),
            Error::User(user_err) => matches!(user_err, user::UserError::AlreadyLoggedIn),
            _ => false,
        }
    }

    /// Check if this error was raised because the store is not open.
    pub fn is_not_open(&self) -> bool {
        matches!(self, Error::Storage(storage::StorageError::NotOpen))
    }

    /// Check if this error comes from driver selection or driver options.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Registry(_) => true,
            Error::Crypt(crypt_err) => crypt_err.is_configuration_error(),
            Error::Storage(storage_err) => {
                matches!(storage_err, storage::StorageError::InvalidDsn { .. })
            }
            Error::User(user_err) => matches!(user_err, user::UserError::SessionWindow { .. }),
            _ => false,
        }
    }

    /// Check if this error is envelope-related.
    pub fn is_envelope_error(&self) -> bool {
        matches!(self, Error::Envelope(_))
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_validation_error(),
            Error::Envelope(envelope::EnvelopeError::InvalidBody { .. }) => true,
            _ => false,
        }
    }

    /// Check if this error means the presented credentials were not accepted.
    pub fn is_credential_error(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_credential_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Storage(storage_err) => storage_err.is_io_error(),
            _ => false,
        }
    }
}
