use std::sync::Arc;

use tempfile::TempDir;
use tollgate::{
    Drivers, Store, User,
    service::NewUser,
    storage::drivers::memory::{MemoryConn, MemoryDriver},
    user::UserReturn,
};

// Re-export tokio test macro for convenience
pub use tokio;

/// Creates a store for the backend named by the TEST_BACKEND env var.
///
/// Supported values:
/// - "memory" or unset: in-process table (default)
/// - "jsonfile": JSON file in a temporary directory
/// - "sqlite": SQLite in-memory database (requires `sqlite` feature)
///
/// The returned directory, if any, must be kept alive for the store to work.
///
/// # Panics
/// Panics if TEST_BACKEND=sqlite but the `sqlite` feature is not enabled.
///
/// # Example
/// ```bash
/// TEST_BACKEND=jsonfile cargo test
/// TEST_BACKEND=sqlite cargo test --features sqlite
/// ```
pub async fn test_store() -> (Store, Option<TempDir>) {
    let drivers = Drivers::builtin().expect("Failed to build driver registries");
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("jsonfile") => {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("users.json");
            let store = drivers
                .open_store("jsonfile", path.to_str().unwrap(), "")
                .await
                .expect("Failed to open jsonfile store");
            store.create_store().await.expect("Failed to create store");
            (store, Some(dir))
        }
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                let store = drivers
                    .open_store("sqlite", "sqlite::memory:", "")
                    .await
                    .expect("Failed to open SQLite store");
                store.create_store().await.expect("Failed to create schema");
                (store, None)
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("memory") | Ok("") | Err(_) => {
            let store = drivers
                .open_store("memory", "", "")
                .await
                .expect("Failed to open memory store");
            (store, None)
        }
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: memory, jsonfile, sqlite")
        }
    }
}

/// An open memory store plus a handle on its connection for inspection.
pub async fn memory_store() -> (Store, Arc<MemoryConn>) {
    let conn = Arc::new(MemoryConn::new());
    let store = Store::new(Box::new(MemoryDriver::with_conn(Arc::clone(&conn))));
    store.open("", "").await.expect("Failed to open memory store");
    (store, conn)
}

/// A valid registration in `domain`.
pub fn new_user(domain: &str, login: &str, email: &str, password: &str) -> NewUser {
    NewUser {
        domain: domain.to_string(),
        login: login.to_string(),
        name: format!("{login} tester"),
        email: email.to_string(),
        password: password.to_string(),
    }
}

/// A user record that has not been stored anywhere.
pub fn user_record(domain: &str, login: &str, email: &str) -> User {
    let mut user = User::new(chrono::Utc::now());
    user.set_domain(domain).unwrap();
    user.set_login_name(login).unwrap();
    user.set_name("Test User").unwrap();
    user.set_email(email).unwrap();
    user
}

/// Decode the user projection in a response body.
pub fn projection(body: &str) -> UserReturn {
    serde_json::from_str(body).expect("response body is not a user projection")
}
