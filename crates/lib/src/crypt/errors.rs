//! Error types for password hashing drivers.

use thiserror::Error;

/// Errors that can occur while configuring or running an encryption driver.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptError {
    /// Driver options could not be parsed or hold unusable values.
    #[error("Invalid encryption options: {reason}")]
    InvalidOptions {
        /// What was wrong with the options
        reason: String,
    },

    /// The hashing primitive itself failed.
    #[error("Password hashing failed: {reason}")]
    HashFailed {
        /// Underlying failure description
        reason: String,
    },
}

impl CryptError {
    /// Check if this error comes from bad configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, CryptError::InvalidOptions { .. })
    }
}

impl From<CryptError> for crate::Error {
    fn from(err: CryptError) -> Self {
        crate::Error::Crypt(err)
    }
}
