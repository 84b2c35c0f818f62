//! Error types for user records and account operations.

use thiserror::Error;

/// Errors raised while validating or transitioning a [`User`](super::User).
///
/// Validation variants carry a reason that is safe to show to the caller.
/// Credential failures deliberately do not say which check failed.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserError {
    /// Domain is empty, contains whitespace, or is the wildcard.
    #[error("Invalid domain: {reason}")]
    InvalidDomain { reason: String },

    #[error("Invalid login name: {reason}")]
    InvalidLoginName { reason: String },

    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    #[error("Invalid email: {reason}")]
    InvalidEmail { reason: String },

    #[error("Invalid password: {reason}")]
    InvalidPassword { reason: String },

    /// Unknown user or wrong password. The two are indistinguishable.
    #[error("invalid user or password")]
    InvalidCredentials,

    /// The account is deactivated or soft deleted.
    #[error("Account is not active")]
    Inactive,

    /// Too many consecutive failed logins. Displays as the generic credential
    /// message; the count is for logs only.
    #[error("invalid user or password")]
    Locked { fail_count: u32 },

    /// The session behind a token timed out or hit its maximum length.
    #[error("Session has expired")]
    SessionExpired,

    /// The configured session length does not fit in the calendar.
    #[error("Session window out of range: {reason}")]
    SessionWindow { reason: String },

    /// Login attempted while a live session exists.
    #[error("User is already logged in")]
    AlreadyLoggedIn,

    /// The caller is not an active system account.
    #[error("Caller is not permitted to use this service")]
    CallerNotPermitted,

    /// An update request that changed nothing.
    #[error("No fields included for update")]
    NoFieldsUpdated,

    /// The service was configured without any update permissions.
    #[error("No updates in options")]
    UpdatesDisabled,
}

impl UserError {
    /// Check if this error rejects malformed input.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidDomain { .. }
                | UserError::InvalidLoginName { .. }
                | UserError::InvalidName { .. }
                | UserError::InvalidEmail { .. }
                | UserError::InvalidPassword { .. }
                | UserError::NoFieldsUpdated
        )
    }

    /// Check if this error is an authentication failure.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            UserError::InvalidCredentials
                | UserError::Inactive
                | UserError::Locked { .. }
                | UserError::SessionExpired
        )
    }

    /// HTTP-style status code for this condition.
    pub fn status_code(&self) -> u16 {
        match self {
            e if e.is_validation_error() => 400,
            e if e.is_credential_error() => 401,
            UserError::CallerNotPermitted => 403,
            UserError::AlreadyLoggedIn => 409,
            _ => 500,
        }
    }
}

impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}
