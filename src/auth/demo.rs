/*!
 * Demo Handlers
 * Accept-everyone authenticator and in-memory settings storage
 */

use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use super::traits::{Authenticator, StorageHandler};
use super::types::*;

/// Logs every visitor in as the demo user
pub struct DemoAuthenticator {
    storage: Arc<dyn StorageHandler>,
    session: RwLock<Option<UserData>>,
}

impl DemoAuthenticator {
    pub fn new(storage: Arc<dyn StorageHandler>) -> Self {
        Self {
            storage,
            session: RwLock::new(None),
        }
    }

    pub fn demo_user() -> UserData {
        UserData {
            id: 0,
            username: "demo".into(),
            name: "Demo User".into(),
            groups: vec!["demo".into()],
        }
    }
}

#[async_trait]
impl Authenticator for DemoAuthenticator {
    fn name(&self) -> &str {
        "demo"
    }

    async fn login(&self, credentials: &Credentials) -> AuthResult<LoginResponse> {
        let mut user = Self::demo_user();
        let groups = self.storage.get_groups(&user).await?;
        if !groups.is_empty() {
            user.groups = groups;
        }

        let user_settings = self.storage.get_settings(&user).await?;
        let blacklisted_packages = self.storage.get_blacklist(&user).await?;

        info!(
            requested = %credentials.username,
            user = %user.username,
            "Demo login"
        );
        *self.session.write() = Some(user.clone());

        Ok(LoginResponse {
            user_data: user,
            user_settings,
            blacklisted_packages,
        })
    }

    async fn logout(&self) -> AuthResult<()> {
        self.session.write().take();
        Ok(())
    }

    async fn check_session(&self) -> AuthResult<UserData> {
        self.session.read().clone().ok_or(AuthError::NoSession)
    }
}

#[derive(Debug, Clone, Default)]
struct UserRecord {
    settings: Map<String, Value>,
    groups: Vec<String>,
    blacklist: Vec<String>,
}

/// Settings kept in memory, keyed by username
#[derive(Debug, Default)]
pub struct MemoryStorage {
    users: DashMap<String, UserRecord, RandomState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the groups a user is granted
    pub fn set_groups(&self, username: &str, groups: Vec<String>) {
        self.users.entry(username.to_string()).or_default().groups = groups;
    }
}

#[async_trait]
impl StorageHandler for MemoryStorage {
    fn name(&self) -> &str {
        "demo"
    }

    async fn get_settings(&self, user: &UserData) -> AuthResult<Map<String, Value>> {
        Ok(self
            .users
            .get(&user.username)
            .map(|r| r.settings.clone())
            .unwrap_or_default())
    }

    async fn set_settings(&self, user: &UserData, settings: Map<String, Value>) -> AuthResult<()> {
        self.users
            .entry(user.username.clone())
            .or_default()
            .settings = settings;
        Ok(())
    }

    /// Stored groups, falling back to the ones on the user record
    async fn get_groups(&self, user: &UserData) -> AuthResult<Vec<String>> {
        let stored = self
            .users
            .get(&user.username)
            .map(|r| r.groups.clone())
            .unwrap_or_default();
        Ok(if stored.is_empty() {
            user.groups.clone()
        } else {
            stored
        })
    }

    async fn get_blacklist(&self, user: &UserData) -> AuthResult<Vec<String>> {
        Ok(self
            .users
            .get(&user.username)
            .map(|r| r.blacklist.clone())
            .unwrap_or_default())
    }

    async fn set_blacklist(&self, user: &UserData, blacklist: Vec<String>) -> AuthResult<()> {
        self.users
            .entry(user.username.clone())
            .or_default()
            .blacklist = blacklist;
        Ok(())
    }
}
