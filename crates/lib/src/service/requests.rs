//! Request payloads carried in package bodies.
//!
//! Field names match the JSON callers send (`{"Login": "...", "Password": "..."}`).
//! Missing fields decode as empty strings; the engine decides which are required.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegisterRequest {
    pub login: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Body for both authenticate-by-token and logout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TokenRequest {
    pub token: String,
}

/// Blank fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateRequest {
    pub token: String,
    pub login: String,
    pub name: String,
    pub email: String,
    pub old_password: String,
    pub new_password: String,
}

/// Everything needed to create an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub domain: String,
    pub login: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// A registration placed in the caller's domain.
    pub fn from_register(domain: &str, req: RegisterRequest) -> Self {
        Self {
            domain: domain.to_string(),
            login: req.login,
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}
