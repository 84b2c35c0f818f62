//! JSON configuration file.
//!
//! ```json
//! {
//!   "Service": { "Host": "127.0.0.1", "Port": 7480 },
//!   "Store": { "Name": "jsonfile", "Dsn": "/var/lib/tollgate/users.json", "Options": "" },
//!   "Encrypt": { "Name": "argon2", "Options": { "Cost": 3, "Salt": "..." } },
//!   "Update": { "permit_all": true },
//!   "Session": { "TimeoutSecs": 1800, "MaxSessionSecs": 43200, "LockoutThreshold": null }
//! }
//! ```
//!
//! Driver options may be given as a JSON object or as a string.

use std::path::Path;
use std::sync::Arc;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate::{
    Drivers, ServiceOptions, Store, crypt::EncryptDriver, service::Permissions,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tollgate/config.json";

/// Longest accepted session, in seconds (one year).
pub const MAX_SESSION_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub service: ServiceSection,
    pub store: StoreSection,
    pub encrypt: EncryptSection,
    pub update: Permissions,
    pub session: SessionSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StoreSection {
    /// Storage driver name; blank for the default.
    pub name: String,
    pub dsn: String,
    pub options: Value,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            name: "jsonfile".to_string(),
            dsn: "/var/lib/tollgate/users.json".to_string(),
            options: Value::String(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EncryptSection {
    /// Encryption driver name; blank for the default.
    pub name: String,
    pub options: Value,
}

impl Default for EncryptSection {
    fn default() -> Self {
        Self {
            name: "argon2".to_string(),
            options: Value::String(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionSection {
    pub timeout_secs: i64,
    pub max_session_secs: i64,
    pub lockout_threshold: Option<u32>,
}

impl Default for SessionSection {
    fn default() -> Self {
        let options = ServiceOptions::default();
        Self {
            timeout_secs: options.session_timeout.num_seconds(),
            max_session_secs: options.max_session.num_seconds(),
            lockout_threshold: options.lockout_threshold,
        }
    }
}

/// Driver options as the string the drivers parse.
fn options_string(options: &Value) -> String {
    match options {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Config {
    /// The configuration written by `tollgate config`.
    pub fn generated() -> Self {
        Self {
            update: Permissions::all(),
            ..Self::default()
        }
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            format!(
                "Failed to read config {}: {e} (run `tollgate config --write` to create one)",
                path.display()
            )
        })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.session.timeout_secs <= 0 || self.session.max_session_secs <= 0 {
            return Err("Session timeouts must be positive".into());
        }
        if self.session.max_session_secs > MAX_SESSION_SECS {
            return Err(format!("Session.MaxSessionSecs must not exceed {MAX_SESSION_SECS}").into());
        }
        if self.session.timeout_secs > self.session.max_session_secs {
            return Err("Session.TimeoutSecs must not exceed Session.MaxSessionSecs".into());
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the file, readable only by its owner on unix.
    pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()? + "\n")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn service_options(&self) -> Result<ServiceOptions, Box<dyn std::error::Error>> {
        self.validate()?;
        let seconds = |secs: i64, field: &str| {
            TimeDelta::try_seconds(secs).ok_or_else(|| format!("Session.{field} is out of range"))
        };
        Ok(ServiceOptions {
            permissions: self.update,
            lockout_threshold: self.session.lockout_threshold,
            session_timeout: seconds(self.session.timeout_secs, "TimeoutSecs")?,
            max_session: seconds(self.session.max_session_secs, "MaxSessionSecs")?,
        })
    }

    /// Open the configured store.
    pub async fn open_store(&self, drivers: &Drivers) -> tollgate::Result<Store> {
        drivers
            .open_store(
                &self.store.name,
                &self.store.dsn,
                &options_string(&self.store.options),
            )
            .await
    }

    /// Instantiate the configured encryption driver.
    pub fn encryption(&self, drivers: &Drivers) -> tollgate::Result<Arc<dyn EncryptDriver>> {
        drivers.encryption(&self.encrypt.name, &options_string(&self.encrypt.options))
    }
}
