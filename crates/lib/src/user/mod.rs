//! The user record and its lifecycle.
//!
//! A [`User`] is a tenant-scoped identity. Identity fields only change through
//! validating setters, and session state only changes through the `record_*`
//! transitions so every backend stores the same shapes:
//!
//! ```text
//! registered ──record_login──▶ logged in (token) ──record_logout──▶ logged out
//!     ▲                          │  record_authentication refreshes TimeoutAt
//!     └──── record_failed_login ─┘  (FailCount + 1, LastFailedAt)
//! ```
//!
//! Users are never purged; [`User::soft_delete`] stamps `DeletedAt`.

mod errors;

pub use errors::UserError;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Longest accepted login name, in characters.
pub const MAX_LOGIN_LEN: usize = 64;

/// Longest accepted full name, in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Random bytes in a user salt and in a session token.
const RANDOM_BYTES: usize = 32;

fn random_hex() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a new session token: 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    random_hex()
}

/// A stored identity record.
///
/// Serialized with PascalCase names; this is also the on-disk shape used by the
/// file and SQL backends.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    guid: String,
    domain: String,
    login_name: String,
    email: String,
    full_name: String,
    password_hash: String,
    salt: String,
    #[serde(default)]
    token: String,
    is_active: bool,
    is_logged_in: bool,
    is_system: bool,
    fail_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    logout_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_auth_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    max_session_at: Option<DateTime<Utc>>,
    #[serde(default)]
    timeout_at: Option<DateTime<Utc>>,
}

impl User {
    /// A fresh active record with a new Guid and salt.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            domain: String::new(),
            login_name: String::new(),
            email: String::new(),
            full_name: String::new(),
            password_hash: String::new(),
            salt: random_hex(),
            token: String::new(),
            is_active: true,
            is_logged_in: false,
            is_system: false,
            fail_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            login_at: None,
            logout_at: None,
            last_auth_at: None,
            last_failed_at: None,
            max_session_at: None,
            timeout_at: None,
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Per-user salt. Assigned at creation and never changed.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Current session token, empty when logged out.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// System accounts are the callers allowed to use the service.
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn login_at(&self) -> Option<DateTime<Utc>> {
        self.login_at
    }

    pub fn logout_at(&self) -> Option<DateTime<Utc>> {
        self.logout_at
    }

    pub fn last_auth_at(&self) -> Option<DateTime<Utc>> {
        self.last_auth_at
    }

    pub fn last_failed_at(&self) -> Option<DateTime<Utc>> {
        self.last_failed_at
    }

    pub fn timeout_at(&self) -> Option<DateTime<Utc>> {
        self.timeout_at
    }

    pub fn max_session_at(&self) -> Option<DateTime<Utc>> {
        self.max_session_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn set_domain(&mut self, domain: &str) -> Result<(), UserError> {
        let domain = domain.trim();
        let reason = if domain.is_empty() {
            Some("domain is empty")
        } else if domain == crate::constants::MATCH_ANY_DOMAIN {
            Some("the wildcard domain cannot own users")
        } else if domain.chars().any(char::is_whitespace) {
            Some("domain contains whitespace")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(UserError::InvalidDomain {
                reason: reason.into(),
            });
        }
        self.domain = domain.to_string();
        Ok(())
    }

    pub fn set_login_name(&mut self, login: &str) -> Result<(), UserError> {
        let login = login.trim();
        let len = login.chars().count();
        let reason = if len == 0 {
            Some("login name is empty".to_string())
        } else if len > MAX_LOGIN_LEN {
            Some(format!("login name is longer than {MAX_LOGIN_LEN} characters"))
        } else if login.chars().any(char::is_whitespace) {
            Some("login name contains whitespace".to_string())
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(UserError::InvalidLoginName { reason });
        }
        self.login_name = login.to_string();
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), UserError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserError::InvalidName {
                reason: "name is empty".into(),
            });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(UserError::InvalidName {
                reason: format!("name is longer than {MAX_NAME_LEN} characters"),
            });
        }
        self.full_name = name.to_string();
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> Result<(), UserError> {
        let email = email.trim();
        validate_email(email).map_err(|reason| UserError::InvalidEmail {
            reason: reason.into(),
        })?;
        self.email = email.to_string();
        Ok(())
    }

    /// Reject passwords that cannot be stored. Hashing happens in the engine.
    pub fn validate_password(clear: &str) -> Result<(), UserError> {
        if clear.is_empty() {
            return Err(UserError::InvalidPassword {
                reason: "password is empty".into(),
            });
        }
        Ok(())
    }

    /// Store a hash produced by the configured encryption driver.
    pub fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }

    pub fn set_system(&mut self, is_system: bool) {
        self.is_system = is_system;
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Stamp `UpdatedAt`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// True when no live session exists at `now`.
    pub fn session_expired(&self, now: DateTime<Utc>) -> bool {
        if !self.is_logged_in || self.token.is_empty() {
            return true;
        }
        let past = |at: Option<DateTime<Utc>>| at.is_some_and(|at| now >= at);
        past(self.timeout_at) || past(self.max_session_at)
    }

    /// Start a session. The record is unchanged when the window does not fit
    /// in the calendar.
    pub fn record_login(
        &mut self,
        token: String,
        now: DateTime<Utc>,
        timeout: Duration,
        max_session: Duration,
    ) -> Result<(), UserError> {
        let timeout_at = session_deadline(now, timeout)?;
        let max_session_at = session_deadline(now, max_session)?;
        self.token = token;
        self.is_logged_in = true;
        self.fail_count = 0;
        self.login_at = Some(now);
        self.last_auth_at = Some(now);
        self.timeout_at = Some(timeout_at);
        self.max_session_at = Some(max_session_at);
        self.updated_at = now;
        Ok(())
    }

    pub fn record_failed_login(&mut self, now: DateTime<Utc>) {
        self.fail_count = self.fail_count.saturating_add(1);
        self.last_failed_at = Some(now);
        self.updated_at = now;
    }

    /// Token was presented and accepted; slide the idle timeout.
    pub fn record_authentication(
        &mut self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<(), UserError> {
        let mut timeout_at = session_deadline(now, timeout)?;
        if let Some(max) = self.max_session_at {
            timeout_at = timeout_at.min(max);
        }
        self.last_auth_at = Some(now);
        self.timeout_at = Some(timeout_at);
        self.updated_at = now;
        Ok(())
    }

    pub fn record_logout(&mut self, now: DateTime<Utc>) {
        self.token.clear();
        self.is_logged_in = false;
        self.logout_at = Some(now);
        self.timeout_at = None;
        self.max_session_at = None;
        self.updated_at = now;
    }

    /// Deactivate the record and end any session. The row is kept.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.is_active = false;
        self.token.clear();
        self.is_logged_in = false;
        self.updated_at = now;
    }
}

fn session_deadline(now: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>, UserError> {
    now.checked_add_signed(span)
        .ok_or_else(|| UserError::SessionWindow {
            reason: format!("{}s from {now} is out of range", span.num_seconds()),
        })
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("guid", &self.guid)
            .field("domain", &self.domain)
            .field("login_name", &self.login_name)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_logged_in", &self.is_logged_in)
            .field("is_system", &self.is_system)
            .field("fail_count", &self.fail_count)
            .finish_non_exhaustive()
    }
}

fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("email is empty");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("email contains whitespace");
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("email must contain exactly one @");
    };
    if local.is_empty() {
        return Err("email has no local part");
    }
    if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
        return Err("email domain is not valid");
    }
    Ok(())
}

/// What callers get to see of a user. No hash, no salt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserReturn {
    pub guid: String,
    pub domain: String,
    pub login_name: String,
    pub email: String,
    pub full_name: String,
    pub token: String,
    pub is_active: bool,
    pub is_logged_in: bool,
    pub created_at: DateTime<Utc>,
    pub login_at: Option<DateTime<Utc>>,
    pub logout_at: Option<DateTime<Utc>>,
    pub last_auth_at: Option<DateTime<Utc>>,
    pub timeout_at: Option<DateTime<Utc>>,
    pub max_session_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserReturn {
    fn from(user: &User) -> Self {
        Self {
            guid: user.guid.clone(),
            domain: user.domain.clone(),
            login_name: user.login_name.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            token: user.token.clone(),
            is_active: user.is_active,
            is_logged_in: user.is_logged_in,
            created_at: user.created_at,
            login_at: user.login_at,
            logout_at: user.logout_at,
            last_auth_at: user.last_auth_at,
            timeout_at: user.timeout_at,
            max_session_at: user.max_session_at,
        }
    }
}
