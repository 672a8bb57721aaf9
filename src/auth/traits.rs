/*!
 * Auth Traits
 * Contracts for pluggable authenticators and settings storage
 */

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::*;

/// Verifies credentials and tracks the session
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn name(&self) -> &str;

    async fn login(&self, credentials: &Credentials) -> AuthResult<LoginResponse>;

    async fn logout(&self) -> AuthResult<()>;

    /// The current user, or `NoSession`
    async fn check_session(&self) -> AuthResult<UserData>;
}

/// Per-user settings, groups and package blacklist
#[async_trait]
pub trait StorageHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn get_settings(&self, user: &UserData) -> AuthResult<Map<String, Value>>;

    async fn set_settings(&self, user: &UserData, settings: Map<String, Value>) -> AuthResult<()>;

    async fn get_groups(&self, user: &UserData) -> AuthResult<Vec<String>>;

    async fn get_blacklist(&self, user: &UserData) -> AuthResult<Vec<String>>;

    async fn set_blacklist(&self, user: &UserData, blacklist: Vec<String>) -> AuthResult<()>;
}
