/*!
 * Package Registry
 * Installed package manifests and the factories that launch them
 */

use ahash::{AHashSet, RandomState};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::serde::{is_empty_vec, is_false, string_or_vec};
use crate::process::ApplicationFactory;
use crate::vfs::mime_matches;

/// Kind of package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Application,
    Extension,
    Service,
}

/// Package manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub package_type: PackageType,
    /// Mime types the application opens (`text/plain`, `image/*`)
    #[serde(
        default,
        deserialize_with = "string_or_vec",
        skip_serializing_if = "is_empty_vec"
    )]
    pub mime: Vec<String>,
    /// Only one instance may run; relaunching signals the running one
    #[serde(default, skip_serializing_if = "is_false")]
    pub singular: bool,
    /// Groups a user needs to see the package
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub groups: Vec<String>,
}

impl PackageMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            package_type: PackageType::Application,
            mime: Vec::new(),
            singular: false,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, package_type: PackageType) -> Self {
        self.package_type = package_type;
        self
    }

    #[must_use]
    pub fn with_mime(mut self, mime: &[&str]) -> Self {
        self.mime = mime.iter().map(|m| m.to_string()).collect();
        self
    }

    #[must_use]
    pub fn singular(mut self) -> Self {
        self.singular = true;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.mime.iter().any(|pattern| mime_matches(pattern, mime))
    }
}

/// Registry of installed packages
pub struct PackageRegistry {
    packages: RwLock<BTreeMap<String, PackageMetadata>>,
    factories: DashMap<String, ApplicationFactory, RandomState>,
    blacklist: RwLock<AHashSet<String>>,
    hidden: RwLock<AHashSet<String>>,
    user_groups: RwLock<Vec<String>>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self {
            packages: RwLock::new(BTreeMap::new()),
            factories: DashMap::with_hasher(RandomState::new()),
            blacklist: RwLock::new(AHashSet::new()),
            hidden: RwLock::new(AHashSet::new()),
            user_groups: RwLock::new(Vec::new()),
        }
    }

    /// Install a manifest (replacing any previous one with the same id)
    pub fn install(&self, metadata: PackageMetadata) {
        debug!(id = %metadata.id, kind = ?metadata.package_type, "Package installed");
        self.packages.write().insert(metadata.id.clone(), metadata);
    }

    /// Install a manifest together with the factory that launches it
    pub fn register(&self, metadata: PackageMetadata, factory: ApplicationFactory) {
        self.factories.insert(metadata.id.clone(), factory);
        self.install(metadata);
    }

    pub fn uninstall(&self, id: &str) -> Option<PackageMetadata> {
        self.factories.remove(id);
        self.packages.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<PackageMetadata> {
        self.packages.read().get(id).cloned()
    }

    pub fn factory(&self, id: &str) -> Option<ApplicationFactory> {
        self.factories.get(id).map(|f| Arc::clone(f.value()))
    }

    /// Replace the blacklist (usually from the login response)
    pub fn set_blacklist(&self, ids: impl IntoIterator<Item = String>) {
        let list: AHashSet<String> = ids.into_iter().collect();
        info!(count = list.len(), "Package blacklist updated");
        *self.blacklist.write() = list;
    }

    pub fn blacklist(&self) -> Vec<String> {
        let mut list: Vec<_> = self.blacklist.read().iter().cloned().collect();
        list.sort();
        list
    }

    pub fn is_blacklisted(&self, id: &str) -> bool {
        self.blacklist.read().contains(id)
    }

    /// Packages the user chose to hide from listings
    pub fn set_hidden(&self, ids: impl IntoIterator<Item = String>) {
        *self.hidden.write() = ids.into_iter().collect();
    }

    pub fn set_user_groups(&self, groups: impl IntoIterator<Item = String>) {
        *self.user_groups.write() = groups.into_iter().collect();
    }

    fn has_groups(&self, required: &[String]) -> bool {
        if required.is_empty() {
            return true;
        }
        let groups = self.user_groups.read();
        if groups.iter().any(|g| g == "admin") {
            return true;
        }
        required.iter().all(|r| groups.contains(r))
    }

    /// Installed packages sorted by id
    ///
    /// `filtered` drops blacklisted, hidden and permission-restricted packages.
    pub fn packages(&self, filtered: bool) -> Vec<PackageMetadata> {
        let packages = self.packages.read();
        if !filtered {
            return packages.values().cloned().collect();
        }

        let blacklist = self.blacklist.read();
        let hidden = self.hidden.read();
        packages
            .values()
            .filter(|p| !blacklist.contains(&p.id))
            .filter(|p| !hidden.contains(&p.id))
            .filter(|p| self.has_groups(&p.groups))
            .cloned()
            .collect()
    }

    /// Ids of non-blacklisted packages that open `mime`
    pub fn by_mime(&self, mime: &str) -> Vec<String> {
        let blacklist = self.blacklist.read();
        self.packages
            .read()
            .values()
            .filter(|p| !blacklist.contains(&p.id))
            .filter(|p| p.accepts_mime(mime))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Manifest and factory of a package that may be launched
    pub fn launchable(&self, id: &str) -> Option<(PackageMetadata, ApplicationFactory)> {
        if self.is_blacklisted(id) {
            return None;
        }
        let metadata = self.get(id)?;
        if !self.has_groups(&metadata.groups) {
            return None;
        }
        Some((metadata, self.factory(id)?))
    }

    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PackageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
