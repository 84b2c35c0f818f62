//! Built-in hashing algorithms.
//!
//! - [`argon2`]: adaptive, memory-hard hashing. The default.
//! - [`sha512`]: iterated, salted SHA-512.
//! - [`plaintext`]: readable "hashes" for tests only.

pub mod argon2;
pub mod plaintext;
pub mod sha512;
