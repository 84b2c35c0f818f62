//! Password hashing drivers.
//!
//! Every algorithm implements [`EncryptDriver`] and owns its own salt and cost
//! policy. A user's password is always hashed together with that user's salt,
//! the driver-level salt from configuration, and one or more entries of the
//! compiled-in static salt pool, so a leaked table alone is not enough to mount
//! a dictionary attack.
//!
//! Drivers are selected by name from the `"encryption"` registry and then
//! configured with a JSON options string:
//!
//! ```
//! use tollgate::crypt::{self, EncryptDriver};
//! use tollgate::registry::DriverRegistry;
//!
//! let registry: DriverRegistry<dyn EncryptDriver> = DriverRegistry::new("encryption");
//! crypt::register_drivers(&registry).unwrap();
//!
//! let driver = crypt::select(&registry, "sha512", r#"{"Cost": 2}"#).unwrap();
//! let hash = driver.encrypt_password("secret", "user-salt").unwrap();
//! assert!(driver.compare_passwords(&hash, "secret", "user-salt"));
//! ```

pub mod drivers;
mod errors;
mod salts;

pub use errors::CryptError;
pub use salts::{pool_offset, static_salt};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::registry::{DriverRegistry, Identity};

/// Contract for a password hashing algorithm.
pub trait EncryptDriver: Identity + Send + Sync {
    /// Apply JSON options. Only non-zero fields override the current values;
    /// empty or whitespace-only input changes nothing.
    fn setup(&mut self, options: &str) -> Result<()>;

    /// Hash `clear` for storage.
    fn encrypt_password(&self, clear: &str, user_salt: &str) -> Result<String>;

    /// Check `clear` against a stored hash produced by this driver.
    fn compare_passwords(&self, hash: &str, clear: &str, user_salt: &str) -> bool;

    /// The options currently in effect.
    fn options(&self) -> CryptOptions;
}

/// Options shared by the encryption drivers.
///
/// Serialized with the field names used in configuration files:
/// `{"StaticSaltIndex": 0, "Cost": 7, "Salt": "..."}`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CryptOptions {
    pub static_salt_index: usize,
    pub cost: u32,
    pub salt: String,
}

impl CryptOptions {
    /// Parse an options string. Blank input yields all-zero options.
    pub fn parse(json: &str) -> Result<Self> {
        let json = json.trim();
        if json.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| {
            CryptError::InvalidOptions {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Copy every non-zero field of `overrides` into `self`.
    ///
    /// The static salt index is stored reduced to the pool size.
    pub fn apply(&mut self, overrides: &CryptOptions) {
        if overrides.static_salt_index != 0 {
            self.static_salt_index = pool_offset(overrides.static_salt_index);
        }
        if overrides.cost != 0 {
            self.cost = overrides.cost;
        }
        if !overrides.salt.is_empty() {
            self.salt = overrides.salt.clone();
        }
    }
}

impl std::fmt::Debug for CryptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptOptions")
            .field("static_salt_index", &self.static_salt_index)
            .field("cost", &self.cost)
            .field("salt", &"<redacted>")
            .finish()
    }
}

/// Register every built-in hashing algorithm.
pub fn register_drivers(registry: &DriverRegistry<dyn EncryptDriver>) -> Result<()> {
    registry.register(drivers::argon2::registration())?;
    registry.register(drivers::sha512::registration())?;
    registry.register(drivers::plaintext::registration())?;
    Ok(())
}

/// Instantiate the driver `name` and apply `options` to it.
pub fn select(
    registry: &DriverRegistry<dyn EncryptDriver>,
    name: &str,
    options: &str,
) -> Result<Arc<dyn EncryptDriver>> {
    let mut driver = registry.create(name)?;
    driver.setup(options)?;
    tracing::info!(driver = name, "Selected encryption driver");
    Ok(Arc::from(driver))
}
