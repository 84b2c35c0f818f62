//! Iterated, salted SHA-512.
//!
//! Round `i` digests the previous round's output, the user salt, the clear
//! password, the driver salt and `static_salt(index + i)`. The final digest is
//! stored base64 encoded.

use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::Result;
use crate::crypt::{CryptOptions, EncryptDriver, static_salt};
use crate::registry::{Identity, IdentityKind, Registration};

pub const DRIVER_NAME: &str = "sha512";

/// Rounds used when configuration does not set a cost.
pub const DEFAULT_COST: u32 = 4;

const DEFAULT_SALT: &str = "9u4K6f6pKmpUqF%Cgo9$c2rJfZEPut//ziRbrda8A2KQctVxWYKrUCX28GDww.t6jwqay%van6e9CSo^gtfyUeQp{2h&gV,KoQi9ysC";

const SHORT_HELP: &str = "Iterated SHA-512 with user, driver and static salts";

const LONG_HELP: &str = "\
  The sha512 driver balances cost and speed. The password, the user's salt, the
  driver salt and a rotating compiled-in salt are hashed together, and the digest
  is fed back in for Cost rounds.

  Options (JSON):
      Cost             number of rounds (default 4)
      Salt             driver salt; set a long random string in configuration
      StaticSaltIndex  starting offset into the compiled-in salt pool (default 0)

  None of these may change once passwords have been stored.

  Example: {\"Cost\": 7, \"Salt\": \"abc...xyz\"}
";

/// SHA-512 driver.
#[derive(Debug)]
pub struct Sha512Driver {
    options: CryptOptions,
}

impl Sha512Driver {
    pub fn new() -> Self {
        Self {
            options: CryptOptions {
                static_salt_index: 0,
                cost: DEFAULT_COST,
                salt: DEFAULT_SALT.to_string(),
            },
        }
    }

    fn digest(&self, clear: &str, user_salt: &str) -> Vec<u8> {
        let mut previous = Vec::new();
        for round in 0..self.options.cost as usize {
            let mut hasher = Sha512::new();
            hasher.update(&previous);
            hasher.update(user_salt.as_bytes());
            hasher.update(clear.as_bytes());
            hasher.update(self.options.salt.as_bytes());
            hasher.update(static_salt(self.options.static_salt_index.wrapping_add(round)).as_bytes());
            previous = hasher.finalize().to_vec();
        }
        previous
    }
}

impl Default for Sha512Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity for Sha512Driver {
    fn identity(&self, kind: IdentityKind) -> String {
        match kind {
            IdentityKind::Name => DRIVER_NAME,
            IdentityKind::Short => SHORT_HELP,
            IdentityKind::Long => LONG_HELP,
        }
        .to_string()
    }
}

impl EncryptDriver for Sha512Driver {
    fn setup(&mut self, options: &str) -> Result<()> {
        let overrides = CryptOptions::parse(options)?;
        self.options.apply(&overrides);
        Ok(())
    }

    fn encrypt_password(&self, clear: &str, user_salt: &str) -> Result<String> {
        Ok(Base64::encode_string(&self.digest(clear, user_salt)))
    }

    fn compare_passwords(&self, hash: &str, clear: &str, user_salt: &str) -> bool {
        let expected = Base64::encode_string(&self.digest(clear, user_salt));
        hash.as_bytes().ct_eq(expected.as_bytes()).into()
    }

    fn options(&self) -> CryptOptions {
        self.options.clone()
    }
}

fn create() -> Box<dyn EncryptDriver> {
    Box::new(Sha512Driver::new())
}

/// Registry entry for this driver.
pub fn registration() -> Registration<dyn EncryptDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create)
}
