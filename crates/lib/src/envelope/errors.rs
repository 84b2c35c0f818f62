//! Envelope error types.

use thiserror::Error;

/// Errors raised while checking or signing a request/response envelope.
///
/// All of these reject the request outright; none are worth retrying.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The package carried no usable head.
    #[error("Header is not complete")]
    InvalidHeader,

    #[error("Header has no domain")]
    NoDomain,

    #[error("Header has no id")]
    NoId,

    #[error("Header has no timestamp")]
    NoTimestamp,

    /// Timestamp older than the replay window.
    #[error("Request has expired")]
    Expired,

    /// Timestamp further ahead than the replay window.
    #[error("Request timestamp is in the future")]
    Future,

    #[error("Signature does not match")]
    InvalidSignature,

    /// `sign` was called before a secret was set.
    #[error("No secret set for signing")]
    NoSecret,

    /// The body could not be decoded as the expected payload.
    #[error("Invalid body: {reason}")]
    InvalidBody { reason: String },
}

impl EnvelopeError {
    /// Check if this error is about the head's timestamp window.
    pub fn is_timestamp_error(&self) -> bool {
        matches!(
            self,
            EnvelopeError::NoTimestamp | EnvelopeError::Expired | EnvelopeError::Future
        )
    }

    /// Check if this error was caused by the caller's request.
    pub fn is_request_error(&self) -> bool {
        !matches!(self, EnvelopeError::NoSecret)
    }

    /// HTTP-style status code for this condition.
    pub fn status_code(&self) -> u16 {
        if self.is_request_error() { 400 } else { 500 }
    }
}

impl From<EnvelopeError> for crate::Error {
    fn from(err: EnvelopeError) -> Self {
        crate::Error::Envelope(err)
    }
}
