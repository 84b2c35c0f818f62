//! SQL schema for the user table.
//!
//! Indexed lookup columns are kept alongside the full record, which is stored as
//! JSON in `user_json`. Uniqueness is enforced by the database:
//!
//! - `guid` is the primary key
//! - `(domain, login_name)` and `(domain, email)` are unique
//! - `token` is unique; logged-out users store NULL so they never collide

use super::{SqlConn, SqlxResultExt};
use crate::storage::StorageResult;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS users (
        guid TEXT PRIMARY KEY NOT NULL,
        domain TEXT NOT NULL,
        login_name TEXT NOT NULL,
        email TEXT NOT NULL,
        token TEXT,
        user_json TEXT NOT NULL
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_domain_login ON users(domain, login_name)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_domain_email ON users(domain, email)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_token ON users(token)",
];

/// Create tables and indexes if they don't exist and record the schema version.
pub async fn initialize(conn: &SqlConn) -> StorageResult<()> {
    let pool = conn.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .sql_context("Schema creation failed")?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((version,)) if version > SCHEMA_VERSION => {
            return Err(crate::storage::StorageError::Backend {
                reason: format!(
                    "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
                ),
            });
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .sql_context("Index creation failed")?;
    }

    tracing::info!(version = SCHEMA_VERSION, "Initialized user schema");
    Ok(())
}
