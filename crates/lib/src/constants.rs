//! Constants used throughout the Tollgate library.
//!
//! Driver group names, lookup field names shared with storage backends, and the
//! envelope replay window.

/// Driver group for storage backends.
pub const STORAGE_GROUP: &str = "storage";

/// Driver group for password hashing algorithms.
pub const ENCRYPTION_GROUP: &str = "encryption";

/// Domain value that matches every tenant.
///
/// Only valid for lookups on globally unique keys (`Guid`, `Token`).
pub const MATCH_ANY_DOMAIN: &str = "*";

/// Envelope timestamps outside `now ± TIMESTAMP_EXPIRATION_SECS` are rejected.
pub const TIMESTAMP_EXPIRATION_SECS: i64 = 120;

/// Field names passed to backends for `user_fetch` lookups.
pub const FIELD_GUID: &str = "Guid";
pub const FIELD_EMAIL: &str = "Email";
pub const FIELD_LOGIN: &str = "LoginName";
pub const FIELD_TOKEN: &str = "Token";

/// Names of the update permission flags, as they appear in configuration.
pub const PERMIT_ALL: &str = "permit_all";
pub const PERMIT_LOGIN: &str = "permit_login";
pub const PERMIT_NAME: &str = "permit_name";
pub const PERMIT_EMAIL: &str = "permit_email";
pub const PERMIT_PASSWORD: &str = "permit_password";
