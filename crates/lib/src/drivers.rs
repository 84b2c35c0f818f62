//! The built-in driver registries.
//!
//! [`Drivers`] owns one registry per group and is built once at startup. A
//! blank driver name anywhere below means "the group's default".

use std::sync::Arc;

use crate::Result;
use crate::constants::{ENCRYPTION_GROUP, STORAGE_GROUP};
use crate::crypt::{self, EncryptDriver};
use crate::registry::{DriverInfo, DriverRegistry, IdentityKind, RegistryError};
use crate::storage::{self, StorageDriver, Store};

/// Default storage backend.
pub const DEFAULT_STORAGE: &str = storage::drivers::memory::DRIVER_NAME;

/// Default password algorithm.
pub const DEFAULT_ENCRYPTION: &str = crypt::drivers::argon2::DRIVER_NAME;

#[derive(Debug)]
pub struct Drivers {
    pub storage: DriverRegistry<dyn StorageDriver>,
    pub encryption: DriverRegistry<dyn EncryptDriver>,
}

impl Drivers {
    /// Empty registries, for callers assembling their own set.
    pub fn new() -> Self {
        Self {
            storage: DriverRegistry::new(STORAGE_GROUP),
            encryption: DriverRegistry::new(ENCRYPTION_GROUP),
        }
    }

    /// Every built-in driver, with defaults set. Both registries are sealed.
    pub fn builtin() -> Result<Self> {
        let drivers = Self::new();
        storage::register_drivers(&drivers.storage)?;
        crypt::register_drivers(&drivers.encryption)?;
        drivers.storage.set_default(DEFAULT_STORAGE)?;
        drivers.encryption.set_default(DEFAULT_ENCRYPTION)?;
        drivers.storage.seal();
        drivers.encryption.seal();
        Ok(drivers)
    }

    /// Registered drivers in `group`, sorted by name.
    pub fn list_members(&self, group: &str) -> std::result::Result<Vec<DriverInfo>, RegistryError> {
        match group {
            STORAGE_GROUP => Ok(self.storage.list_members()),
            ENCRYPTION_GROUP => Ok(self.encryption.list_members()),
            _ => Err(RegistryError::UnknownGroup {
                group: group.to_string(),
            }),
        }
    }

    /// Help text for driver `name` in `group`.
    pub fn help(
        &self,
        group: &str,
        name: &str,
        kind: IdentityKind,
    ) -> std::result::Result<String, RegistryError> {
        match group {
            STORAGE_GROUP => self.storage.help(name, kind),
            ENCRYPTION_GROUP => self.encryption.help(name, kind),
            _ => Err(RegistryError::UnknownGroup {
                group: group.to_string(),
            }),
        }
    }

    /// A closed store backed by driver `name`.
    pub fn store(&self, name: &str) -> Result<Store> {
        let driver = if name.is_empty() {
            self.storage.new_default()?
        } else {
            self.storage.create(name)?
        };
        Ok(Store::new(driver))
    }

    /// A store backed by driver `name`, opened on `dsn`.
    pub async fn open_store(&self, name: &str, dsn: &str, options: &str) -> Result<Store> {
        let store = self.store(name)?;
        store.open(dsn, options).await?;
        Ok(store)
    }

    /// Encryption driver `name`, configured with `options` (JSON, may be blank).
    pub fn encryption(&self, name: &str, options: &str) -> Result<Arc<dyn EncryptDriver>> {
        let name = if name.is_empty() {
            self.encryption
                .default_name()
                .ok_or_else(|| RegistryError::NoDefault {
                    group: ENCRYPTION_GROUP.to_string(),
                })?
        } else {
            name.to_string()
        };
        crypt::select(&self.encryption, &name, options)
    }
}

impl Default for Drivers {
    fn default() -> Self {
        Self::new()
    }
}
