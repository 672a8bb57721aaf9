/*!
 * Mount Registry
 * Maps path prefixes to transports and routes requests to them
 */

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use regex_lite::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::Transport;
use super::types::*;

/// Access options of a mountpoint
#[derive(Debug, Clone)]
pub struct MountOptions {
    pub read_only: bool,
    /// Included in `find` searches across mounts
    pub searchable: bool,
    /// Hidden from normal listings (e.g. the applications mount)
    pub special: bool,
    pub visible: bool,
    pub enabled: bool,
    /// Added at runtime rather than from configuration
    pub dynamic: bool,
    /// Custom match expression replacing the literal prefix test
    pub pattern: Option<Regex>,
    pub description: Option<String>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            searchable: false,
            special: false,
            visible: true,
            enabled: true,
            dynamic: false,
            pattern: None,
            description: None,
        }
    }
}

/// A path prefix bound to one transport
pub struct Mountpoint {
    pub name: String,
    pub root: String,
    pub transport: Arc<dyn Transport>,
    pub options: MountOptions,
}

impl Mountpoint {
    /// Create a mountpoint with the default root `<name>:///`
    ///
    /// The name is lower-cased and whitespace is replaced by `-`.
    pub fn new(name: &str, transport: Arc<dyn Transport>) -> Self {
        let name = mount_name(name);
        let root = format!("{}:///", name);
        Self {
            name,
            root,
            transport,
            options: MountOptions::default(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: MountOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.options.read_only = true;
        self
    }

    /// Length of the prefix this mount claims in `path`, if it matches
    pub fn match_len(&self, path: &str) -> Option<usize> {
        match &self.options.pattern {
            Some(pattern) => pattern
                .find(path)
                .filter(|m| m.start() == 0)
                .map(|m| m.end()),
            None if path.starts_with(&self.root) => Some(self.root.len()),
            None => None,
        }
    }

    /// Reject mutating methods on read-only mounts
    pub fn check_writable(&self, method: VfsMethod) -> VfsResult<()> {
        if self.options.read_only && method.is_mutating() {
            Err(VfsError::ReadOnly(format!("{} ({})", self.name, method)))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Mountpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mountpoint")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("transport", &self.transport.name())
            .field("options", &self.options)
            .finish()
    }
}

/// Normalized mount name
pub fn mount_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Which mounts `list` returns
#[derive(Debug, Clone, Copy, Default)]
pub struct MountFilter {
    pub include_special: bool,
    pub include_hidden: bool,
}

/// Registry of mountpoints
///
/// Resolution picks the longest matching prefix; on equal length the
/// mount registered first wins.
pub struct MountRegistry {
    by_name: Arc<DashMap<String, Arc<Mountpoint>, RandomState>>,
    order: Arc<RwLock<Vec<Arc<Mountpoint>>>>, // Registration order
}

impl MountRegistry {
    pub fn new() -> Self {
        Self {
            by_name: Arc::new(DashMap::with_hasher(RandomState::new())),
            order: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a mountpoint; name and root must both be unused
    pub fn register(&self, mountpoint: Mountpoint) -> VfsResult<Arc<Mountpoint>> {
        let mut order = self.order.write();

        if order
            .iter()
            .any(|m| m.name == mountpoint.name || m.root == mountpoint.root)
        {
            return Err(VfsError::AlreadyMounted(format!(
                "{} ({})",
                mountpoint.name, mountpoint.root
            )));
        }

        let mountpoint = Arc::new(mountpoint);
        self.by_name
            .insert(mountpoint.name.clone(), Arc::clone(&mountpoint));
        order.push(Arc::clone(&mountpoint));

        info!(
            name = %mountpoint.name,
            root = %mountpoint.root,
            transport = mountpoint.transport.name(),
            read_only = mountpoint.options.read_only,
            "Mounted filesystem"
        );
        Ok(mountpoint)
    }

    /// Remove a mountpoint by name
    pub fn unregister(&self, name: &str) -> VfsResult<Arc<Mountpoint>> {
        let mut order = self.order.write();
        let (_, removed) = self
            .by_name
            .remove(name)
            .ok_or_else(|| VfsError::NotMounted(name.to_string()))?;
        order.retain(|m| !Arc::ptr_eq(m, &removed));

        info!(name = %removed.name, "Unmounted filesystem");
        Ok(removed)
    }

    /// Find the mount responsible for a path
    pub fn resolve(&self, path: &str) -> VfsResult<Arc<Mountpoint>> {
        let order = self.order.read();
        let mut best: Option<(usize, &Arc<Mountpoint>)> = None;

        for mount in order.iter().filter(|m| m.options.enabled) {
            if let Some(len) = mount.match_len(path) {
                // Strictly longer only, so earlier registrations win ties
                if best.map_or(true, |(best_len, _)| len > best_len) {
                    best = Some((len, mount));
                }
            }
        }

        match best {
            Some((_, mount)) => {
                debug!(path, mount = %mount.name, "Resolved mount");
                Ok(Arc::clone(mount))
            }
            None => Err(VfsError::NoSuchMount(path.to_string())),
        }
    }

    /// Resolve and reject mutating methods on read-only mounts
    pub fn resolve_for(&self, path: &str, method: VfsMethod) -> VfsResult<Arc<Mountpoint>> {
        let mount = self.resolve(path)?;
        mount.check_writable(method)?;
        Ok(mount)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Mountpoint>> {
        self.by_name.get(name).map(|m| Arc::clone(m.value()))
    }

    pub fn is_mounted(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Enabled mounts in registration order
    pub fn list(&self, filter: MountFilter) -> Vec<Arc<Mountpoint>> {
        self.order
            .read()
            .iter()
            .filter(|m| m.options.enabled)
            .filter(|m| filter.include_hidden || m.options.visible)
            .filter(|m| filter.include_special || !m.options.special)
            .cloned()
            .collect()
    }

    /// Mounts included in cross-mount searches
    pub fn searchable(&self) -> Vec<Arc<Mountpoint>> {
        self.order
            .read()
            .iter()
            .filter(|m| m.options.enabled && m.options.searchable)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MountRegistry {
    fn clone(&self) -> Self {
        Self {
            by_name: Arc::clone(&self.by_name),
            order: Arc::clone(&self.order),
        }
    }
}
