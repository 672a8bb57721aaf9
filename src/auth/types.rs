/*!
 * Auth Types
 * Login payloads, user records, and auth errors
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Auth operation result
#[must_use = "auth operations can fail and must be handled"]
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and storage handler errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum AuthError {
    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("No active session")]
    NoSession,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(String),
}

/// Credentials submitted to `login`
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The logged in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: u64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserData {
    /// `admin` implies every group
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group || g == "admin")
    }
}

/// Everything the desktop needs after a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_data: UserData,
    #[serde(default)]
    pub user_settings: Map<String, Value>,
    #[serde(default)]
    pub blacklisted_packages: Vec<String>,
}
