//! In-memory storage backend.
//!
//! Data lives only as long as the process. Besides being the default backend
//! for development, [`MemoryConn`] doubles as the test store: errors can be
//! injected per Guid and every `release` call is counted so tests can check
//! that the engine releases on every exit path.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::table::UserTable;
use crate::registry::{Identity, IdentityKind, Registration};
use crate::storage::{
    Capabilities, Conn, LookupKey, StorageDriver, StorageError, StorageResult,
};
use crate::user::User;

pub const DRIVER_NAME: &str = "memory";

const SHORT_HELP: &str = "In-memory user store (not persistent)";

const LONG_HELP: &str = "\
  The memory driver keeps every user in a table inside the running process.
  Nothing is written to disk and all users disappear on restart. The connection
  string and options are ignored.

  Useful for development and tests. CreateStore is not supported because there
  is nothing to create.
";

/// Opens [`MemoryConn`]s.
///
/// By default every `open` starts from an empty table. A driver built with
/// [`with_conn`](Self::with_conn) hands out the same connection every time,
/// which lets tests inspect state the engine wrote.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    shared: Option<Arc<MemoryConn>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always open the given connection.
    pub fn with_conn(conn: Arc<MemoryConn>) -> Self {
        Self { shared: Some(conn) }
    }
}

impl Identity for MemoryDriver {
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
impl StorageDriver for MemoryDriver {
    async fn open(&self, _dsn: &str, _options: &str) -> StorageResult<Arc<dyn Conn>> {
        let conn = match &self.shared {
            Some(conn) => Arc::clone(conn),
            None => Arc::new(MemoryConn::new()),
        };
        Ok(conn)
    }
}

/// Process-local connection.
#[derive(Debug, Default)]
pub struct MemoryConn {
    table: RwLock<UserTable>,
    faults: Mutex<HashMap<String, StorageError>>,
    releases: AtomicUsize,
}

impl MemoryConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation touching `guid` fail with `err`.
    pub fn fail_on(&self, guid: &str, err: StorageError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guid.to_string(), err);
    }

    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of `release` calls so far.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub async fn user_count(&self) -> usize {
        self.table.read().await.len()
    }

    /// Snapshot of every stored user.
    pub async fn users(&self) -> Vec<User> {
        self.table.read().await.users().cloned().collect()
    }

    fn fault(&self, guid: &str) -> StorageResult<()> {
        match self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(guid)
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Conn for MemoryConn {
    async fn user_fetch(&self, domain: &str, key: LookupKey, value: &str) -> StorageResult<User> {
        let table = self.table.read().await;
        let user = table.find(domain, key, value)?;
        self.fault(user.guid())?;
        Ok(user.clone())
    }

    async fn user_insert(&self, user: &User) -> StorageResult<()> {
        self.fault(user.guid())?;
        self.table.write().await.insert(user)
    }

    async fn user_update(&self, user: &User) -> StorageResult<()> {
        self.fault(user.guid())?;
        self.table.write().await.update(user)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            close: false,
            ping: true,
            reset: true,
            release: true,
            create_store: false,
        }
    }

    async fn reset(&self) {
        self.clear_faults();
    }

    async fn release(&self) -> StorageResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create() -> Box<dyn StorageDriver> {
    Box::new(MemoryDriver::new())
}

/// Registry entry for this backend.
pub fn registration() -> Registration<dyn StorageDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create)
}
