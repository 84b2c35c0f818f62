//! SQLite storage backend.
//!
//! Uses sqlx with `AnyPool`. The connection string is either a sqlx URL
//! (`sqlite:/var/lib/tollgate/users.db?mode=rwc`) or a bare file path, which is
//! opened read-write and created if missing.
//!
//! The schema is defined in the [`schema`] module and created by `CreateStore`.

/// Schema definition.
pub mod schema;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::constants::MATCH_ANY_DOMAIN;
use crate::registry::{Identity, IdentityKind, Registration};
use crate::storage::{
    Capabilities, Conn, LookupKey, StorageDriver, StorageError, StorageResult,
};
use crate::user::User;

pub const DRIVER_NAME: &str = "sqlite";

const SHORT_HELP: &str = "SQLite database via sqlx";

const LONG_HELP: &str = "\
  The sqlite driver keeps users in a SQLite database. Uniqueness of login names
  and emails within a domain, and of session tokens, is enforced by unique
  indexes.

  Connection string: a sqlx URL such as sqlite:/var/lib/tollgate/users.db or a
  plain file path (created if missing). Use sqlite::memory: for a throwaway
  database.
  Options: none

  Run create-store once to create the tables.
";

/// Extension trait for sqlx Result types to simplify error handling.
pub(crate) trait SqlxResultExt<T> {
    /// Convert a sqlx error to `StorageError::Backend` with a context message.
    fn sql_context(self, context: &str) -> StorageResult<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> StorageResult<T> {
        self.map_err(|e| StorageError::Backend {
            reason: format!("{context}: {e}"),
        })
    }
}

/// Map a failed insert or update, turning unique violations into conflicts.
fn write_error(err: sqlx::Error, context: &str) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        let message = db.message();
        if db.is_unique_violation() || message.contains("UNIQUE constraint failed") {
            let field = if message.contains("login_name") {
                LookupKey::LoginName.to_string()
            } else if message.contains("email") {
                LookupKey::Email.to_string()
            } else if message.contains("token") {
                LookupKey::Token.to_string()
            } else {
                LookupKey::Guid.to_string()
            };
            return StorageError::Conflict { field };
        }
    }
    StorageError::Backend {
        reason: format!("{context}: {err}"),
    }
}

fn column(key: LookupKey) -> &'static str {
    match key {
        LookupKey::Guid => "guid",
        LookupKey::Email => "email",
        LookupKey::LoginName => "login_name",
        LookupKey::Token => "token",
    }
}

fn token_column(user: &User) -> Option<String> {
    (!user.token().is_empty()).then(|| user.token().to_string())
}

fn connection_url(dsn: &str) -> String {
    if dsn.starts_with("sqlite:") {
        dsn.to_string()
    } else {
        // mode=rwc: read-write-create (create file if it doesn't exist)
        format!("sqlite:{dsn}?mode=rwc")
    }
}

#[derive(Debug, Default)]
pub struct SqliteDriver;

impl Identity for SqliteDriver {
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
impl StorageDriver for SqliteDriver {
    async fn open(&self, dsn: &str, _options: &str) -> StorageResult<Arc<dyn Conn>> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(StorageError::InvalidDsn {
                reason: "sqlite needs a database path or URL".into(),
            });
        }
        Ok(Arc::new(SqlConn::connect(&connection_url(dsn)).await?))
    }
}

/// A pooled SQLite connection.
#[derive(Debug)]
pub struct SqlConn {
    pool: AnyPool,
}

impl SqlConn {
    /// Connect using a sqlx URL.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        sqlx::any::install_default_drivers();

        // Every pooled connection to an unshared in-memory database sees its
        // own empty database.
        let is_in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = if is_in_memory {
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(5)
        };
        let pool = options
            .connect(url)
            .await
            .sql_context("Failed to connect to SQLite")?;

        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl Conn for SqlConn {
    async fn user_fetch(&self, domain: &str, key: LookupKey, value: &str) -> StorageResult<User> {
        if value.is_empty() {
            return Err(StorageError::NotFound);
        }
        let column = column(key);
        let row: Option<(String,)> = if domain == MATCH_ANY_DOMAIN {
            sqlx::query_as(&format!("SELECT user_json FROM users WHERE {column} = $1"))
                .bind(value)
                .fetch_optional(&self.pool)
                .await
        } else {
            sqlx::query_as(&format!(
                "SELECT user_json FROM users WHERE {column} = $1 AND domain = $2"
            ))
            .bind(value)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
        }
        .sql_context("Failed to fetch user")?;

        match row {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => Err(StorageError::NotFound),
        }
    }

    async fn user_insert(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_string(user)?;
        sqlx::query(
            "INSERT INTO users (guid, domain, login_name, email, token, user_json)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.guid())
        .bind(user.domain())
        .bind(user.login_name())
        .bind(user.email())
        .bind(token_column(user))
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Failed to insert user"))?;
        Ok(())
    }

    async fn user_update(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_string(user)?;
        let result = sqlx::query(
            "UPDATE users SET domain = $1, login_name = $2, email = $3, token = $4, user_json = $5
             WHERE guid = $6",
        )
        .bind(user.domain())
        .bind(user.login_name())
        .bind(user.email())
        .bind(token_column(user))
        .bind(json)
        .bind(user.guid())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
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
        self.pool.close().await;
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .sql_context("Ping failed")?;
        Ok(())
    }

    async fn create_store(&self) -> StorageResult<()> {
        schema::initialize(self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create() -> Box<dyn StorageDriver> {
    Box::new(SqliteDriver)
}

/// Registry entry for this backend.
pub fn registration() -> Registration<dyn StorageDriver> {
    Registration::new(DRIVER_NAME, SHORT_HELP, LONG_HELP, create)
}
