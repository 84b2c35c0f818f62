//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{PERMIT_ALL, PERMIT_EMAIL, PERMIT_LOGIN, PERMIT_NAME, PERMIT_PASSWORD};

/// A field an update request may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateField {
    Login,
    Name,
    Email,
    Password,
}

impl UpdateField {
    /// Label used in the update response message.
    pub fn label(&self) -> &'static str {
        match self {
            UpdateField::Login => "Login",
            UpdateField::Name => "Name",
            UpdateField::Email => "Email",
            UpdateField::Password => "Password",
        }
    }
}

/// Which fields `update` may change.
///
/// With every flag off, updates are disabled entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub permit_all: bool,
    pub permit_login: bool,
    pub permit_name: bool,
    pub permit_email: bool,
    pub permit_password: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            permit_all: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn allows(&self, field: UpdateField) -> bool {
        self.permit_all
            || match field {
                UpdateField::Login => self.permit_login,
                UpdateField::Name => self.permit_name,
                UpdateField::Email => self.permit_email,
                UpdateField::Password => self.permit_password,
            }
    }

    /// Set a flag by its configuration name. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let flag = match name {
            PERMIT_ALL => &mut self.permit_all,
            PERMIT_LOGIN => &mut self.permit_login,
            PERMIT_NAME => &mut self.permit_name,
            PERMIT_EMAIL => &mut self.permit_email,
            PERMIT_PASSWORD => &mut self.permit_password,
            _ => return false,
        };
        *flag = value;
        true
    }
}

/// Options for [`AuthService`](super::AuthService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Fields `update` may change when no override is passed.
    pub permissions: Permissions,
    /// Refuse logins once this many consecutive failures are recorded.
    pub lockout_threshold: Option<u32>,
    /// Idle time before a session token stops authenticating.
    pub session_timeout: Duration,
    /// Hard limit on a session's lifetime, regardless of activity.
    pub max_session: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            permissions: Permissions::default(),
            lockout_threshold: None,
            session_timeout: Duration::minutes(30),
            max_session: Duration::hours(12),
        }
    }
}
