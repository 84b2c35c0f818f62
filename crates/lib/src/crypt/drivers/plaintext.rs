//! Readable password "hashes" for tests.
//!
//! Stores `password;userSalt;driverSalt;Plaintext`. Registered as test-only:
//! it can never become the default and selecting it logs a warning.

use subtle::ConstantTimeEq;

use crate::Result;
use crate::crypt::{CryptOptions, EncryptDriver};
use crate::registry::{Identity, IdentityKind, Registration};

pub const DRIVER_NAME: &str = "plaintext";

const DEFAULT_SALT: &str = "SALT";

const SHORT_HELP: &str = "Plain text passwords (testing only)";

const LONG_HELP: &str = "\
  The plaintext driver stores passwords in readable form together with the salts
  that would have been used. It exists so tests can inspect stored values and
  must never be used in production.

  Options (JSON):
      Salt   driver salt written into each value (default \"SALT\")
";

/// Plaintext driver.
#[derive(Debug)]
pub struct PlaintextDriver {
    options: CryptOptions,
}

impl PlaintextDriver {
    pub fn new() -> Self {
        Self {
            options: CryptOptions {
                salt: DEFAULT_SALT.to_string(),
                ..Default::default()
            },
        }
    }

    fn render(&self, clear: &str, user_salt: &str) -> String {
        format!("{clear};{user_salt};{};Plaintext", self.options.salt)
    }
}

impl Default for PlaintextDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity for PlaintextDriver {
    fn identity(&self, kind: IdentityKind) -> String {
        match kind {
            IdentityKind::Name => DRIVER_NAME,
            IdentityKind::Short => SHORT_HELP,
            IdentityKind::Long => LONG_HELP,
        }
        .to_string()
    }
}

impl EncryptDriver for PlaintextDriver {
    fn setup(&mut self, options: &str) -> Result<()> {
        let overrides = CryptOptions::parse(options)?;
        if !overrides.salt.is_empty() {
            self.options.salt = overrides.salt;
        }
        Ok(())
    }

    fn encrypt_password(&self, clear: &str, user_salt: &str) -> Result<String> {
        Ok(self.render(clear, user_salt))
    }

    fn compare_passwords(&self, hash: &str, clear: &str, user_salt: &str) -> bool {
        hash.as_bytes()
            .ct_eq(self.render(clear, user_salt).as_bytes())
            .into()
    }

    fn options(&self) -> CryptOptions {
        self.options.clone()
    }
}

fn create() -> Box<dyn EncryptDriver> {
    Box::new(PlaintextDriver::new())
}

/// Registry entry for this driver.
pub fn registration() -> Registration<dyn EncryptDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create).test_only()
}
