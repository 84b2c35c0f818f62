//! Storage façade and backend contracts.
//!
//! A backend provides a [`StorageDriver`] (registered by name in the
//! `"storage"` group) that opens [`Conn`] handles. Only three connection
//! operations are mandatory: fetch, insert and update a user. Everything else
//! (`close`, `ping`, `reset`, `release`, `create_store`) is optional and
//! advertised through [`Capabilities`]; the [`Store`] turns a missing
//! capability into a successful no-op.
//!
//! The [`Store`] also owns the open/closed state machine, rejects wildcard
//! lookups on keys that are only unique inside a domain, and remembers the
//! outcome of the most recent call in [`Store::last_error`]. Every method also
//! returns its own error; code that shares a `Store` between requests must use
//! that and never `last_error`.

pub mod drivers;
mod errors;

pub use errors::StorageError;

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::constants::{FIELD_EMAIL, FIELD_GUID, FIELD_LOGIN, FIELD_TOKEN, MATCH_ANY_DOMAIN};
use crate::registry::{DriverRegistry, Identity, IdentityKind};
use crate::user::User;

/// Result type used by backends.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Field a user can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// Unique across all domains
    Guid,
    /// Unique within a domain
    Email,
    /// Unique within a domain
    LoginName,
    /// Unique while set
    Token,
}

impl LookupKey {
    /// The field name passed to backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKey::Guid => FIELD_GUID,
            LookupKey::Email => FIELD_EMAIL,
            LookupKey::LoginName => FIELD_LOGIN,
            LookupKey::Token => FIELD_TOKEN,
        }
    }

    /// Whether a lookup on this key may use the wildcard domain.
    pub fn allows_any_domain(&self) -> bool {
        matches!(self, LookupKey::Guid | LookupKey::Token)
    }

    /// Read the key's value out of a user record.
    pub fn value_of<'a>(&self, user: &'a User) -> &'a str {
        match self {
            LookupKey::Guid => user.guid(),
            LookupKey::Email => user.email(),
            LookupKey::LoginName => user.login_name(),
            LookupKey::Token => user.token(),
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKey {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s {
            FIELD_GUID => Ok(LookupKey::Guid),
            FIELD_EMAIL => Ok(LookupKey::Email),
            FIELD_LOGIN => Ok(LookupKey::LoginName),
            FIELD_TOKEN => Ok(LookupKey::Token),
            other => Err(StorageError::InvalidKey {
                key: other.to_string(),
            }),
        }
    }
}

/// Optional connection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Close,
    Ping,
    Reset,
    Release,
    CreateStore,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Close => "Close",
            Capability::Ping => "Ping",
            Capability::Reset => "Reset",
            Capability::Release => "Release",
            Capability::CreateStore => "CreateStore",
        };
        f.write_str(name)
    }
}

/// Which optional operations a connection implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub close: bool,
    pub ping: bool,
    pub reset: bool,
    pub release: bool,
    pub create_store: bool,
}

impl Capabilities {
    /// Every optional operation.
    pub fn all() -> Self {
        Self {
            close: true,
            ping: true,
            reset: true,
            release: true,
            create_store: true,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Close => self.close,
            Capability::Ping => self.ping,
            Capability::Reset => self.reset,
            Capability::Release => self.release,
            Capability::CreateStore => self.create_store,
        }
    }
}

/// An open connection to a backend.
///
/// Optional operations default to successful no-ops. A backend that overrides
/// one must also report it in [`capabilities`](Conn::capabilities).
#[async_trait]
pub trait Conn: Send + Sync + Any {
    /// Fetch exactly one user. `domain` may be [`MATCH_ANY_DOMAIN`].
    async fn user_fetch(&self, domain: &str, key: LookupKey, value: &str) -> StorageResult<User>;

    /// Insert a new user, enforcing every uniqueness invariant.
    async fn user_insert(&self, user: &User) -> StorageResult<()>;

    /// Replace an existing user, matched by Guid.
    async fn user_update(&self, user: &User) -> StorageResult<()>;

    /// Optional operations implemented by this connection.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn reset(&self) {}

    /// Release per-request resources (locks, pooled handles).
    async fn release(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Initialise the backing storage (tables, files).
    async fn create_store(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Downcast hook for backend-specific access.
    fn as_any(&self) -> &dyn Any;
}

/// Factory for connections of one backend type.
#[async_trait]
pub trait StorageDriver: Identity + Send + Sync {
    /// Open a connection. `options` is a driver-specific string, often JSON.
    async fn open(&self, dsn: &str, options: &str) -> StorageResult<Arc<dyn Conn>>;
}

/// Register every built-in storage backend.
pub fn register_drivers(registry: &DriverRegistry<dyn StorageDriver>) -> Result<()> {
    registry.register(drivers::memory::registration())?;
    registry.register(drivers::jsonfile::registration())?;
    #[cfg(feature = "sqlite")]
    registry.register(drivers::sql::registration())?;
    Ok(())
}

struct StoreState {
    dsn: String,
    conn: Option<Arc<dyn Conn>>,
    capabilities: Capabilities,
}

/// The storage façade used by the service engine.
///
/// `Store` is shared between concurrent requests; every method takes `&self`.
pub struct Store {
    driver: Box<dyn StorageDriver>,
    state: RwLock<StoreState>,
    last_error: Mutex<Option<StorageError>>,
}

impl Store {
    /// Wrap a driver. The store starts closed.
    pub fn new(driver: Box<dyn StorageDriver>) -> Self {
        Self {
            driver,
            state: RwLock::new(StoreState {
                dsn: String::new(),
                conn: None,
                capabilities: Capabilities::default(),
            }),
            last_error: Mutex::new(None),
        }
    }

    /// Name of the underlying driver.
    pub fn name(&self) -> String {
        self.driver.identity(IdentityKind::Name)
    }

    pub fn id(&self) -> String {
        self.driver.id()
    }

    pub fn short_help(&self) -> String {
        self.driver.short_help()
    }

    pub fn long_help(&self) -> String {
        self.driver.long_help()
    }

    /// Connection string given to the last successful `open`.
    pub async fn dsn(&self) -> String {
        self.state.read().await.dsn.clone()
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.conn.is_some()
    }

    /// Outcome of the most recent call on this store, from any caller: `None`
    /// if it succeeded.
    ///
    /// Only meaningful while a single caller drives the store (the CLI, tests).
    /// Under concurrent requests another call may have replaced it; the service
    /// engine never reads it.
    pub fn last_error(&self) -> Option<StorageError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_errors(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn remember<T>(&self, result: StorageResult<T>) -> Result<T> {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) =
            result.as_ref().err().cloned();
        result.map_err(Into::into)
    }

    /// Whether the open connection implements `capability`. False while closed.
    pub async fn supports(&self, capability: Capability) -> bool {
        let state = self.state.read().await;
        state.conn.is_some() && state.capabilities.supports(capability)
    }

    /// Direct access to the backend connection, for backend-specific code.
    pub async fn conn(&self) -> Option<Arc<dyn Conn>> {
        self.state.read().await.conn.clone()
    }

    async fn open_conn(&self) -> StorageResult<(Arc<dyn Conn>, Capabilities)> {
        let state = self.state.read().await;
        match &state.conn {
            Some(conn) => Ok((Arc::clone(conn), state.capabilities)),
            None => Err(StorageError::NotOpen),
        }
    }

    /// Connect to the backend.
    pub async fn open(&self, dsn: &str, options: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.conn.is_some() {
            return self.remember(Err(StorageError::AlreadyOpen));
        }
        let conn = match self.driver.open(dsn, options).await {
            Ok(conn) => conn,
            Err(err) => return self.remember(Err(err)),
        };
        state.capabilities = conn.capabilities();
        state.conn = Some(conn);
        state.dsn = dsn.to_string();
        tracing::info!(driver = %self.name(), "Opened store");
        self.remember(Ok(()))
    }

    /// Disconnect. The store may be opened again afterwards.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(conn) = state.conn.take() else {
            return self.remember(Err(StorageError::NotOpen));
        };
        let result = if state.capabilities.close {
            conn.close().await
        } else {
            Ok(())
        };
        state.capabilities = Capabilities::default();
        tracing::info!(driver = %self.name(), "Closed store");
        self.remember(result)
    }

    /// Fetch one user.
    ///
    /// `domain` may be [`MATCH_ANY_DOMAIN`] only for [`LookupKey::Guid`] and
    /// [`LookupKey::Token`].
    pub async fn user_fetch(&self, domain: &str, key: LookupKey, value: &str) -> Result<User> {
        let (conn, _) = match self.open_conn().await {
            Ok(open) => open,
            Err(err) => return self.remember(Err(err)),
        };
        if domain == MATCH_ANY_DOMAIN && !key.allows_any_domain() {
            return self.remember(Err(StorageError::MatchAnyNotSupported {
                key: key.to_string(),
            }));
        }
        tracing::debug!(domain, key = %key, "Fetching user");
        let result = conn.user_fetch(domain, key, value).await;
        self.remember(result)
    }

    pub async fn user_insert(&self, user: &User) -> Result<()> {
        let (conn, _) = match self.open_conn().await {
            Ok(open) => open,
            Err(err) => return self.remember(Err(err)),
        };
        tracing::debug!(guid = user.guid(), domain = user.domain(), "Inserting user");
        let result = conn.user_insert(user).await;
        self.remember(result)
    }

    pub async fn user_update(&self, user: &User) -> Result<()> {
        let (conn, _) = match self.open_conn().await {
            Ok(open) => open,
            Err(err) => return self.remember(Err(err)),
        };
        tracing::debug!(guid = user.guid(), "Updating user");
        let result = conn.user_update(user).await;
        self.remember(result)
    }

    /// Check the backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        let result = match self.open_conn().await {
            Ok((conn, caps)) if caps.ping => conn.ping().await,
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };
        self.remember(result)
    }

    /// Clear remembered errors and any intermediate backend state.
    pub async fn reset(&self) {
        self.clear_errors();
        if let Ok((conn, caps)) = self.open_conn().await
            && caps.reset
        {
            conn.reset().await;
        }
    }

    /// Release per-request backend resources. A closed store holds none.
    pub async fn release(&self) -> Result<()> {
        let result = match self.open_conn().await {
            Ok((conn, caps)) if caps.release => conn.release().await,
            _ => Ok(()),
        };
        self.remember(result)
    }

    /// Initialise backing storage.
    ///
    /// Backends without this capability treat it as a no-op; use
    /// [`supports`](Self::supports) to tell the two apart.
    pub async fn create_store(&self) -> Result<()> {
        let result = match self.open_conn().await {
            Ok((conn, caps)) if caps.create_store => conn.create_store().await,
            Ok(_) => {
                tracing::warn!(
                    driver = %self.name(),
                    "Storage driver does not support CreateStore; nothing to do"
                );
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.remember(result)
    }

    pub async fn fetch_user_by_guid(&self, guid: &str) -> Result<User> {
        self.user_fetch(MATCH_ANY_DOMAIN, LookupKey::Guid, guid)
            .await
    }

    /// Only logged-in users have a token; anyone else is not found.
    pub async fn fetch_user_by_token(&self, token: &str) -> Result<User> {
        self.user_fetch(MATCH_ANY_DOMAIN, LookupKey::Token, token)
            .await
    }

    pub async fn fetch_user_by_email(&self, domain: &str, email: &str) -> Result<User> {
        self.user_fetch(domain, LookupKey::Email, email).await
    }

    pub async fn fetch_user_by_login(&self, domain: &str, login: &str) -> Result<User> {
        self.user_fetch(domain, LookupKey::LoginName, login).await
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("driver", &self.name())
            .field("last_error", &self.last_error())
            .finish_non_exhaustive()
    }
}
