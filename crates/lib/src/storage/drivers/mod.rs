//! Built-in storage backends.
//!
//! ## Available Backends
//!
//! - **memory**: process-local table; also the test double (fault injection,
//!   release counting)
//! - **jsonfile**: the same table written through to a JSON file
//! - **sqlite** (feature: `sqlite`): `sqlx` pool over a SQLite database

pub mod jsonfile;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sql;

mod table;
