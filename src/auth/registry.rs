/*!
 * Handler Registry
 * Named factories for authenticators and storage handlers
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use super::demo::{DemoAuthenticator, MemoryStorage};
use super::traits::{Authenticator, StorageHandler};
use super::types::*;

pub type StorageFactory = Arc<dyn Fn() -> Arc<dyn StorageHandler> + Send + Sync>;

/// Authenticators receive the storage handler selected alongside them
pub type AuthenticatorFactory =
    Arc<dyn Fn(Arc<dyn StorageHandler>) -> Arc<dyn Authenticator> + Send + Sync>;

/// The pair of handlers a kernel runs with
#[derive(Clone)]
pub struct Handlers {
    pub authenticator: Arc<dyn Authenticator>,
    pub storage: Arc<dyn StorageHandler>,
}

/// Factories looked up by configured name
#[derive(Clone)]
pub struct HandlerRegistry {
    authenticators: Arc<DashMap<String, AuthenticatorFactory, RandomState>>,
    storages: Arc<DashMap<String, StorageFactory, RandomState>>,
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            authenticators: Arc::new(DashMap::with_hasher(RandomState::new())),
            storages: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Registry with the `demo` handlers
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_storage(
            "demo",
            Arc::new(|| Arc::new(MemoryStorage::new()) as Arc<dyn StorageHandler>),
        );
        registry.register_authenticator(
            "demo",
            Arc::new(|storage: Arc<dyn StorageHandler>| {
                Arc::new(DemoAuthenticator::new(storage)) as Arc<dyn Authenticator>
            }),
        );
        registry
    }

    pub fn register_authenticator(&self, name: &str, factory: AuthenticatorFactory) {
        self.authenticators.insert(name.to_string(), factory);
    }

    pub fn register_storage(&self, name: &str, factory: StorageFactory) {
        self.storages.insert(name.to_string(), factory);
    }

    /// Instantiate the named handlers
    pub fn create(&self, authenticator: &str, storage: &str) -> AuthResult<Handlers> {
        let storage_factory = self
            .storages
            .get(storage)
            .map(|f| f.value().clone())
            .ok_or_else(|| AuthError::UnknownHandler(format!("storage '{}'", storage)))?;
        let auth_factory = self
            .authenticators
            .get(authenticator)
            .map(|f| f.value().clone())
            .ok_or_else(|| {
                AuthError::UnknownHandler(format!("authenticator '{}'", authenticator))
            })?;

        let storage = storage_factory();
        let authenticator = auth_factory(storage.clone());

        info!(
            authenticator = authenticator.name(),
            storage = storage.name(),
            "Handlers created"
        );
        Ok(Handlers {
            authenticator,
            storage,
        })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
