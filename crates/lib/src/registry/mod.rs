//! Name-indexed registration of pluggable drivers.
//!
//! A [`DriverRegistry`] holds every implementation available for one driver
//! group (`"storage"`, `"encryption"`). Drivers are registered once at startup,
//! one of them may be chosen as the group default, and callers instantiate them
//! by name without any compile-time coupling to the concrete type.
//!
//! ```
//! use tollgate::registry::{DriverRegistry, Identity, IdentityKind, Registration};
//!
//! trait Greeter: Identity + Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Hello;
//! impl Identity for Hello {
//!     fn identity(&self, kind: IdentityKind) -> String {
//!         match kind {
//!             IdentityKind::Name => "hello".into(),
//!             _ => "Says hello".into(),
//!         }
//!     }
//! }
//! impl Greeter for Hello {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! fn hello() -> Box<dyn Greeter> {
//!     Box::new(Hello)
//! }
//!
//! let registry: DriverRegistry<dyn Greeter> = DriverRegistry::new("greeting");
//! registry
//!     .register(Registration::new("hello", "Says hello", "", hello))
//!     .unwrap();
//! assert_eq!(registry.create("hello").unwrap().greet(), "hello");
//! assert!(registry.create("bye").is_err());
//! ```

mod errors;

pub use errors::RegistryError;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Which piece of a driver's identity to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// The registered name (`"sha512"`, `"sqlite"`)
    Name,
    /// One-line description
    Short,
    /// Multi-line help text
    Long,
}

/// Self-description shared by every driver.
pub trait Identity {
    /// Return the requested piece of this driver's identity.
    fn identity(&self, kind: IdentityKind) -> String;

    /// The registered name of this driver.
    fn id(&self) -> String {
        self.identity(IdentityKind::Name)
    }

    /// One-line description.
    fn short_help(&self) -> String {
        self.identity(IdentityKind::Short)
    }

    /// Full help text.
    fn long_help(&self) -> String {
        self.identity(IdentityKind::Long)
    }
}

/// A factory stored in a registry.
pub trait Registrant<T: ?Sized>: Send + Sync {
    /// Identity of the drivers this registrant creates.
    fn identity(&self, kind: IdentityKind) -> String;

    /// Build a fresh, unconfigured driver instance.
    fn create(&self) -> Box<T>;

    /// Drivers that exist only to support tests (plaintext hashing, fault
    /// injecting storage) return true here.
    fn is_test_only(&self) -> bool {
        false
    }
}

/// The standard [`Registrant`]: static help text plus a constructor function.
pub struct Registration<T: ?Sized> {
    name: &'static str,
    short: &'static str,
    long: &'static str,
    test_only: bool,
    factory: fn() -> Box<T>,
}

impl<T: ?Sized> Registration<T> {
    /// Describe a driver and how to build it.
    pub fn new(
        name: &'static str,
        short: &'static str,
        long: &'static str,
        factory: fn() -> Box<T>,
    ) -> Self {
        Self {
            name,
            short,
            long,
            test_only: false,
            factory,
        }
    }

    /// Mark the driver as unsuitable for production use.
    pub fn test_only(mut self) -> Self {
        self.test_only = true;
        self
    }
}

impl<T: ?Sized> Registrant<T> for Registration<T> {
    fn identity(&self, kind: IdentityKind) -> String {
        match kind {
            IdentityKind::Name => self.name,
            IdentityKind::Short => self.short,
            IdentityKind::Long => self.long,
        }
        .to_string()
    }

    fn create(&self) -> Box<T> {
        (self.factory)()
    }

    fn is_test_only(&self) -> bool {
        self.test_only
    }
}

/// Listing entry returned by [`DriverRegistry::list_members`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub name: String,
    pub short_help: String,
    pub long_help: String,
    pub is_default: bool,
    pub test_only: bool,
}

struct RegistryState<T: ?Sized> {
    drivers: BTreeMap<String, Arc<dyn Registrant<T>>>,
    default: Option<String>,
    sealed: bool,
}

/// Registry of the drivers available in one group.
///
/// A single mutex guards the table. Populated at startup, read-only afterwards.
pub struct DriverRegistry<T: ?Sized> {
    group: &'static str,
    state: Mutex<RegistryState<T>>,
}

impl<T: ?Sized> DriverRegistry<T> {
    /// Create an empty registry for `group`.
    pub fn new(group: &'static str) -> Self {
        Self {
            group,
            state: Mutex::new(RegistryState {
                drivers: BTreeMap::new(),
                default: None,
                sealed: false,
            }),
        }
    }

    /// The group this registry serves.
    pub fn group(&self) -> &'static str {
        self.group
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unknown(&self, name: &str) -> RegistryError {
        RegistryError::UnknownDriver {
            group: self.group.to_string(),
            name: name.to_string(),
        }
    }

    /// Add a driver. Its name is taken from the registrant's identity.
    pub fn register<R>(&self, registrant: R) -> Result<(), RegistryError>
    where
        R: Registrant<T> + 'static,
    {
        let name = registrant.identity(IdentityKind::Name);
        let mut state = self.lock();
        if state.sealed {
            return Err(RegistryError::Sealed {
                group: self.group.to_string(),
            });
        }
        if state.drivers.contains_key(&name) {
            return Err(RegistryError::DuplicateDriver {
                group: self.group.to_string(),
                name,
            });
        }
        tracing::debug!(group = self.group, driver = %name, "Registered driver");
        state.drivers.insert(name, Arc::new(registrant));
        Ok(())
    }

    /// Choose the driver returned by [`new_default`](Self::new_default).
    pub fn set_default(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.lock();
        let registrant = state.drivers.get(name).ok_or_else(|| self.unknown(name))?;
        if registrant.is_test_only() {
            return Err(RegistryError::TestOnlyDefault {
                group: self.group.to_string(),
                name: name.to_string(),
            });
        }
        state.default = Some(name.to_string());
        Ok(())
    }

    /// Name of the current default driver, if one was chosen.
    pub fn default_name(&self) -> Option<String> {
        self.lock().default.clone()
    }

    /// Check whether a driver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().drivers.contains_key(name)
    }

    /// Refuse any further registrations.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    /// Instantiate the driver registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<T>, RegistryError> {
        let registrant = {
            let state = self.lock();
            state
                .drivers
                .get(name)
                .cloned()
                .ok_or_else(|| self.unknown(name))?
        };
        if registrant.is_test_only() {
            tracing::warn!(
                group = self.group,
                driver = name,
                "Selected a driver intended for testing only"
            );
        }
        Ok(registrant.create())
    }

    /// Instantiate the default driver.
    pub fn new_default(&self) -> Result<Box<T>, RegistryError> {
        let name = self.default_name().ok_or_else(|| RegistryError::NoDefault {
            group: self.group.to_string(),
        })?;
        self.create(&name)
    }

    /// Instantiate a driver or abort.
    ///
    /// Only meant for startup code, where a missing driver means the binary was
    /// built or configured wrong and there is nothing sensible to continue with.
    ///
    /// # Panics
    ///
    /// Panics when `name` is not registered.
    pub fn must_new(&self, name: &str) -> Box<T> {
        match self.create(name) {
            Ok(driver) => driver,
            Err(err) => {
                tracing::error!(group = self.group, driver = name, "{err}");
                panic!("{err}");
            }
        }
    }

    /// Return one piece of help text for a registered driver.
    pub fn help(&self, name: &str, kind: IdentityKind) -> Result<String, RegistryError> {
        let state = self.lock();
        state
            .drivers
            .get(name)
            .map(|r| r.identity(kind))
            .ok_or_else(|| self.unknown(name))
    }

    /// Every registered driver with its help text, ordered by name.
    pub fn list_members(&self) -> Vec<DriverInfo> {
        let state = self.lock();
        state
            .drivers
            .iter()
            .map(|(name, registrant)| DriverInfo {
                name: name.clone(),
                short_help: registrant.identity(IdentityKind::Short),
                long_help: registrant.identity(IdentityKind::Long),
                is_default: state.default.as_deref() == Some(name.as_str()),
                test_only: registrant.is_test_only(),
            })
            .collect()
    }
}

impl<T: ?Sized> fmt::Debug for DriverRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DriverRegistry")
            .field("group", &self.group)
            .field("drivers", &state.drivers.keys().collect::<Vec<_>>())
            .field("default", &state.default)
            .field("sealed", &state.sealed)
            .finish()
    }
}
