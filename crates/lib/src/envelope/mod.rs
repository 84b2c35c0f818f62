//! Signed request/response envelopes.
//!
//! Every request travels as a [`Package`] holding a [`Head`] and an opaque body
//! (normally a JSON document in a string). The caller signs the package with
//! its own salt, a secret shared with the service and never transmitted. The
//! service verifies the signature, checks the head's timestamp against a
//! replay window of ±[`TIMESTAMP_EXPIRATION_SECS`] seconds, and answers with a
//! `Package<ResponseHead>` signed the same way.
//!
//! The signature is HMAC-SHA256 over the head fields and the body, base64
//! encoded. The secret is held only for the duration of one `sign` or
//! `good_signature` call and is wiped afterwards.
//!
//! ```
//! use tollgate::envelope::{Head, Package};
//!
//! let head = Head::new("t1", "frontend", 1, chrono::Utc::now());
//! let mut request = Package::new(head, r#"{"Login":"alice"}"#);
//! request.set_secret("caller-salt");
//! request.sign().unwrap();
//! assert!(!request.has_secret());
//!
//! request.set_secret("caller-salt");
//! assert!(request.good_signature());
//! ```

mod errors;

pub use errors::EnvelopeError;

use std::fmt;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::clock::Clock;
use crate::constants::TIMESTAMP_EXPIRATION_SECS;

type HmacSha256 = Hmac<Sha256>;

/// Length-prefixed field encoding for signature input.
#[derive(Default)]
struct Canonical(Vec<u8>);

impl Canonical {
    fn field(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
        self.0.extend_from_slice(bytes);
        self
    }

    fn text(self, value: &str) -> Self {
        self.field(value.as_bytes())
    }

    fn number(self, value: u64) -> Self {
        self.field(&value.to_be_bytes())
    }

    fn time(self, value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(at) => self.text(&at.to_rfc3339()),
            None => self.field(&[]),
        }
    }
}

/// Behaviour shared by request and response heads.
pub trait Header: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Signature input for the head: every field except the signature.
    fn canonical(&self) -> Vec<u8>;

    /// Current signature, base64, empty when unsigned.
    fn signature(&self) -> &str;

    fn set_signature(&mut self, signature: String);
}

/// Head of a request package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Head {
    /// Tenant the caller acts for
    pub domain: String,
    /// Caller identity (login name of a system account)
    pub id: String,
    /// Caller-chosen request number, echoed in the response
    #[serde(default)]
    pub sequence: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signature: String,
}

impl Head {
    pub fn new(domain: &str, id: &str, sequence: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            domain: domain.to_string(),
            id: id.to_string(),
            sequence,
            timestamp: Some(timestamp),
            signature: String::new(),
        }
    }

    /// Validate required fields and the replay window at `now`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), EnvelopeError> {
        if self.domain.is_empty() {
            return Err(EnvelopeError::NoDomain);
        }
        if self.id.is_empty() {
            return Err(EnvelopeError::NoId);
        }
        let Some(timestamp) = self.timestamp else {
            return Err(EnvelopeError::NoTimestamp);
        };
        let window = Duration::seconds(TIMESTAMP_EXPIRATION_SECS);
        if timestamp < now - window {
            return Err(EnvelopeError::Expired);
        }
        if timestamp > now + window {
            return Err(EnvelopeError::Future);
        }
        Ok(())
    }

    /// [`check`](Self::check) against a clock.
    pub fn check_with(&self, clock: &dyn Clock) -> Result<(), EnvelopeError> {
        self.check(clock.now())
    }
}

impl Header for Head {
    fn canonical(&self) -> Vec<u8> {
        Canonical::default()
            .text("request")
            .text(&self.domain)
            .text(&self.id)
            .number(self.sequence)
            .time(self.timestamp)
            .0
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

/// Head of a response package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseHead {
    /// Copied from the request
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// HTTP-style status code
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub signature: String,
}

impl ResponseHead {
    pub fn new(sequence: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence,
            timestamp,
            code: 200,
            message: String::new(),
            signature: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl Header for ResponseHead {
    fn canonical(&self) -> Vec<u8> {
        Canonical::default()
            .text("response")
            .number(self.sequence)
            .time(Some(self.timestamp))
            .number(u64::from(self.code))
            .text(&self.message)
            .0
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

/// A head plus an opaque body.
///
/// The secret is never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package<H> {
    pub head: H,
    #[serde(default)]
    pub body: String,
    #[serde(skip)]
    secret: Zeroizing<Vec<u8>>,
}

impl<H: Header> Package<H> {
    pub fn new(head: H, body: impl Into<String>) -> Self {
        Self {
            head,
            body: body.into(),
            secret: Zeroizing::new(Vec::new()),
        }
    }

    /// Set the shared secret used by the next `sign` or `good_signature`.
    pub fn set_secret(&mut self, secret: impl AsRef<[u8]>) {
        self.secret = Zeroizing::new(secret.as_ref().to_vec());
    }

    /// Wipe the secret.
    pub fn clear_secret(&mut self) {
        self.secret = Zeroizing::new(Vec::new());
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    fn mac(&self) -> Option<HmacSha256> {
        if self.secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(&self.head.canonical());
        mac.update(&(self.body.len() as u64).to_be_bytes());
        mac.update(self.body.as_bytes());
        Some(mac)
    }

    /// Sign head and body with the current secret, then wipe it.
    pub fn sign(&mut self) -> Result<(), EnvelopeError> {
        let Some(mac) = self.mac() else {
            return Err(EnvelopeError::NoSecret);
        };
        let signature = Base64::encode_string(&mac.finalize().into_bytes());
        self.head.set_signature(signature);
        self.clear_secret();
        Ok(())
    }

    /// Verify the signature with the current secret, then wipe it.
    ///
    /// False when no secret is set or the signature is malformed.
    pub fn good_signature(&mut self) -> bool {
        let verified = match (self.mac(), Base64::decode_vec(self.head.signature())) {
            (Some(mac), Ok(signature)) => mac.verify_slice(&signature).is_ok(),
            _ => false,
        };
        self.clear_secret();
        verified
    }

    /// Replace the body with the JSON form of `value`.
    pub fn set_body_json<T: Serialize>(&mut self, value: &T) -> Result<(), EnvelopeError> {
        self.body = serde_json::to_string(value).map_err(|e| EnvelopeError::InvalidBody {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Decode the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        serde_json::from_str(&self.body).map_err(|e| EnvelopeError::InvalidBody {
            reason: e.to_string(),
        })
    }
}

impl<H: fmt::Debug> fmt::Debug for Package<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("head", &self.head)
            .field("body", &self.body)
            .field("has_secret", &!self.secret.is_empty())
            .finish()
    }
}

/// A request package.
pub type Request = Package<Head>;

/// A response package.
pub type Response = Package<ResponseHead>;
