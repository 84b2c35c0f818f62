//! Argon2id password hashing.
//!
//! The stored value is a PHC string (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
//! so every hash records the parameters it was created with. Raising the cost
//! later does not break existing passwords.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use zeroize::Zeroizing;

use crate::Result;
use crate::crypt::{CryptError, CryptOptions, EncryptDriver, static_salt};
use crate::registry::{Identity, IdentityKind, Registration};

pub const DRIVER_NAME: &str = "argon2";

/// Time cost used when configuration does not set one.
pub const DEFAULT_COST: u32 = 2;

const DEFAULT_SALT: &str =
    "vniiO5UD0w5GpJkPijwQCT63MuMjyWnyi5TtUWBGInCq84zaFFsSwGm9DK8UyUeQp{2h&gV,KoQi9ysC";

const SHORT_HELP: &str = "Argon2id adaptive password hashing";

const LONG_HELP: &str = "\
  The argon2 driver hashes passwords with Argon2id, a memory-hard algorithm that
  is expensive to attack with dedicated hardware. The clear password is combined
  with the driver salt, the user's salt and a compiled-in static salt before it is
  hashed with a fresh random salt. The result records its own parameters.

  Options (JSON):
      Cost             number of passes over memory (default 2)
      Salt             driver salt; set a long random string in configuration
      StaticSaltIndex  which compiled-in salt to mix in (default 0)

  Changing Salt or StaticSaltIndex after users exist makes their passwords
  unverifiable. Cost may be raised at any time.

  Example: {\"Cost\": 3, \"Salt\": \"abc...xyz\"}
";

/// Argon2id driver.
#[derive(Debug)]
pub struct Argon2Driver {
    options: CryptOptions,
}

impl Argon2Driver {
    pub fn new() -> Self {
        Self {
            options: CryptOptions {
                static_salt_index: 0,
                cost: DEFAULT_COST,
                salt: DEFAULT_SALT.to_string(),
            },
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            self.options.cost,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| CryptError::InvalidOptions {
            reason: format!("argon2 parameters: {e}"),
        })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn material(&self, clear: &str, user_salt: &str) -> Zeroizing<Vec<u8>> {
        let extra = static_salt(self.options.static_salt_index);
        let mut material = Zeroizing::new(Vec::with_capacity(
            clear.len() + self.options.salt.len() + user_salt.len() + extra.len(),
        ));
        material.extend_from_slice(clear.as_bytes());
        material.extend_from_slice(self.options.salt.as_bytes());
        material.extend_from_slice(user_salt.as_bytes());
        material.extend_from_slice(extra.as_bytes());
        material
    }
}

impl Default for Argon2Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity for Argon2Driver {
    fn identity(&self, kind: IdentityKind) -> String {
        identity(kind).to_string()
    }
}

impl EncryptDriver for Argon2Driver {
    fn setup(&mut self, options: &str) -> Result<()> {
        let overrides = CryptOptions::parse(options)?;
        let mut next = self.options.clone();
        next.apply(&overrides);
        let candidate = Self { options: next };
        // Reject costs argon2 cannot run with before they reach a request.
        candidate.hasher()?;
        self.options = candidate.options;
        Ok(())
    }

    fn encrypt_password(&self, clear: &str, user_salt: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let material = self.material(clear, user_salt);
        let hash = self
            .hasher()?
            .hash_password(&material, &salt)
            .map_err(|e| CryptError::HashFailed {
                reason: e.to_string(),
            })?;
        Ok(hash.to_string())
    }

    fn compare_passwords(&self, hash: &str, clear: &str, user_salt: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        let material = self.material(clear, user_salt);
        Argon2::default()
            .verify_password(&material, &parsed)
            .is_ok()
    }

    fn options(&self) -> CryptOptions {
        self.options.clone()
    }
}

fn identity(kind: IdentityKind) -> &'static str {
    match kind {
        IdentityKind::Name => DRIVER_NAME,
        IdentityKind::Short => SHORT_HELP,
        IdentityKind::Long => LONG_HELP,
    }
}

fn create() -> Box<dyn EncryptDriver> {
    Box::new(Argon2Driver::new())
}

/// Registry entry for this driver.
pub fn registration() -> Registration<dyn EncryptDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create)
}
