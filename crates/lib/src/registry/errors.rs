//! Error types for driver registration and lookup.

use thiserror::Error;

/// Errors raised by a [`DriverRegistry`](super::DriverRegistry).
///
/// Every variant is a configuration problem: they surface at startup while
/// drivers are being registered or selected, never in steady state.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A driver with this name is already registered in the group.
    #[error("Driver '{name}' is already registered in group '{group}'")]
    DuplicateDriver {
        /// The driver group
        group: String,
        /// The driver name
        name: String,
    },

    /// No driver with this name is registered in the group.
    #[error("Unknown driver '{name}' in group '{group}'")]
    UnknownDriver {
        /// The driver group
        group: String,
        /// The requested driver name
        name: String,
    },

    /// A default driver was requested but none has been chosen.
    #[error("No default driver selected for group '{group}'")]
    NoDefault {
        /// The driver group
        group: String,
    },

    /// Test-only drivers cannot become the group default.
    #[error("Driver '{name}' in group '{group}' is for testing only and cannot be the default")]
    TestOnlyDefault {
        /// The driver group
        group: String,
        /// The driver name
        name: String,
    },

    /// The registry no longer accepts registrations.
    #[error("Driver group '{group}' is sealed")]
    Sealed {
        /// The driver group
        group: String,
    },

    /// A group name that no registry answers to.
    #[error("Unknown driver group '{group}'")]
    UnknownGroup {
        /// The requested group
        group: String,
    },
}

impl RegistryError {
    /// Check if this error is about a driver or group that does not exist.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            RegistryError::UnknownDriver { .. }
                | RegistryError::UnknownGroup { .. }
                | RegistryError::NoDefault { .. }
        )
    }

    /// Check if this error is a duplicate registration.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::DuplicateDriver { .. })
    }

    /// Get the group this error refers to.
    pub fn group(&self) -> &str {
        match self {
            RegistryError::DuplicateDriver { group, .. }
            | RegistryError::UnknownDriver { group, .. }
            | RegistryError::NoDefault { group }
            | RegistryError::TestOnlyDefault { group, .. }
            | RegistryError::Sealed { group }
            | RegistryError::UnknownGroup { group } => group,
        }
    }
}

impl From<RegistryError> for crate::Error {
    fn from(err: RegistryError) -> Self {
        crate::Error::Registry(err)
    }
}
