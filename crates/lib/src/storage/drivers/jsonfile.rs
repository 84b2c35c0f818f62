//! JSON file storage backend.
//!
//! Keeps the user table in memory and writes the whole table through to a file
//! after every successful change. The connection string is the file path. A
//! missing file is treated as an empty table; `CreateStore` writes it.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

use super::table::UserTable;
use crate::registry::{Identity, IdentityKind, Registration};
use crate::storage::{
    Capabilities, Conn, LookupKey, StorageDriver, StorageError, StorageResult,
};
use crate::user::User;

pub const DRIVER_NAME: &str = "jsonfile";

const SHORT_HELP: &str = "Users stored in a single JSON file";

const LONG_HELP: &str = "\
  The jsonfile driver stores all users in one JSON file. The whole file is read
  when the store is opened and rewritten after every insert or update, so it is
  only suitable for small installations.

  Connection string: path to the file, e.g. /var/lib/tollgate/users.json
  Options: none

  Run create-store once to write an empty file.
";

/// The current persistence file format version.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct UserFile {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    users: UserTable,
}

async fn load_from_file(path: &Path) -> StorageResult<UserTable> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let file: UserFile = serde_json::from_str(&json)?;
            Ok(file.users)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UserTable::default()),
        Err(e) => Err(e.into()),
    }
}

async fn save_to_file(path: &Path, table: &UserTable) -> StorageResult<()> {
    let file = UserFile {
        version: PERSISTENCE_VERSION,
        users: table.clone(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct JsonFileDriver;

impl Identity for JsonFileDriver {
    fn identity(&self, kind: IdentityKind) -> String {
        match kind {
            IdentityKind::Name => DRIVER_NAME,
            IdentityKind::Short => SHORT_HELP,
            IdentityKind::Long => LONG_HELP,
        }
        .to_string()
    }
}

#[async_trait]
impl StorageDriver for JsonFileDriver {
    async fn open(&self, dsn: &str, _options: &str) -> StorageResult<Arc<dyn Conn>> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(StorageError::InvalidDsn {
                reason: "jsonfile needs a file path".into(),
            });
        }
        let path = PathBuf::from(dsn);
        let table = load_from_file(&path).await?;
        tracing::debug!(path = %path.display(), users = table.len(), "Loaded user file");
        Ok(Arc::new(JsonFileConn {
            path,
            table: RwLock::new(table),
        }))
    }
}

/// Connection to one JSON file.
#[derive(Debug)]
pub struct JsonFileConn {
    path: PathBuf,
    table: RwLock<UserTable>,
}

impl JsonFileConn {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the table and commit it only once the
    /// file has been written.
    async fn write_through<F>(&self, change: F) -> StorageResult<()>
    where
        F: FnOnce(&mut UserTable) -> StorageResult<()>,
    {
        let mut table = self.table.write().await;
        let mut next = table.clone();
        change(&mut next)?;
        save_to_file(&self.path, &next).await?;
        *table = next;
        Ok(())
    }
}

#[async_trait]
impl Conn for JsonFileConn {
    async fn user_fetch(&self, domain: &str, key: LookupKey, value: &str) -> StorageResult<User> {
        self.table.read().await.find(domain, key, value).cloned()
    }

    async fn user_insert(&self, user: &User) -> StorageResult<()> {
        self.write_through(|table| table.insert(user)).await
    }

    async fn user_update(&self, user: &User) -> StorageResult<()> {
        self.write_through(|table| table.update(user)).await
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            close: true,
            ping: true,
            reset: false,
            release: false,
            create_store: true,
        }
    }

    async fn close(&self) -> StorageResult<()> {
        let table = self.table.read().await;
        if tokio::fs::try_exists(&self.path).await? {
            save_to_file(&self.path, &table).await?;
        }
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        tokio::fs::metadata(dir).await?;
        Ok(())
    }

    async fn create_store(&self) -> StorageResult<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        let table = self.table.read().await;
        save_to_file(&self.path, &table).await?;
        tracing::info!(path = %self.path.display(), "Created user file");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create() -> Box<dyn StorageDriver> {
    Box::new(JsonFileDriver)
}

/// Registry entry for this backend.
pub fn registration() -> Registration<dyn StorageDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create)
}
