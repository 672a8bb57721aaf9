/*!
 * Local Storage Transport
 * A small persistent filesystem kept in a key-value store
 *
 * Two records are stored under the namespace:
 * - `<ns>/tree`: directory path -> entries of that directory
 * - `<ns>/data`: file path -> base64 contents
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::limits::LOCAL_STORAGE_QUOTA;
use crate::vfs::encoding;
use crate::vfs::paths;
use crate::vfs::traits::Transport;
use crate::vfs::types::*;

const DEFAULT_NAMESPACE: &str = "webtop/vfs/localstorage";

// =============================================================================
// Key-value stores
// =============================================================================

/// String key-value persistence behind the local storage transport
///
/// Stores are called synchronously from inside transport operations.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> VfsResult<Option<String>>;

    fn set(&self, key: &str, value: String) -> VfsResult<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Store every pair or none of them
    fn set_many(&self, pairs: Vec<(String, String)>) -> VfsResult<()>;
}

/// Volatile store, lost with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> VfsResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_many(&self, pairs: Vec<(String, String)>) -> VfsResult<()> {
        self.entries.lock().extend(pairs);
        Ok(())
    }
}

/// All keys kept in one JSON object on disk
///
/// The file is rewritten through a sibling temp file and a rename, so a
/// crash never leaves a half-written store behind. Writes block the calling
/// thread for the duration of the rewrite; the store is sized for the local
/// storage quota, not for bulk data. Memory is only updated once the file
/// was replaced.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> VfsResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| VfsError::Io(format!("{}: {}", path.display(), e)))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> VfsResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> VfsResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_many(&self, pairs: Vec<(String, String)>) -> VfsResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.extend(pairs);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

// =============================================================================
// Tree state
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    filename: String,
    #[serde(rename = "type")]
    file_type: FileType,
    #[serde(default)]
    mime: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Clone, Default)]
struct State {
    tree: BTreeMap<String, Vec<Entry>>,
    data: BTreeMap<String, String>,
}

/// Path inside the mount, always starting with `/` and never ending with one
/// (except the root itself)
fn relative(path: &str) -> String {
    let normalized = paths::normalize(path);
    let rest = paths::split(&normalized).rest;
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    }
}

fn parent_of(rel: &str) -> String {
    match rel.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => rel[..idx].to_string(),
    }
}

fn name_of(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or_default()
}

fn child_of(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

impl State {
    fn entry(&self, rel: &str) -> Option<&Entry> {
        let name = name_of(rel);
        self.tree
            .get(&parent_of(rel))?
            .iter()
            .find(|e| e.filename == name)
    }

    fn is_dir(&self, rel: &str) -> bool {
        self.tree.contains_key(rel)
    }

    fn require_parent(&self, rel: &str) -> VfsResult<()> {
        let parent = parent_of(rel);
        if self.is_dir(&parent) {
            Ok(())
        } else {
            Err(VfsError::NotFound(parent))
        }
    }

    fn upsert(&mut self, rel: &str, entry: Entry) {
        let list = self.tree.entry(parent_of(rel)).or_default();
        match list.iter_mut().find(|e| e.filename == entry.filename) {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
    }

    fn detach(&mut self, rel: &str) {
        let name = name_of(rel);
        if let Some(list) = self.tree.get_mut(&parent_of(rel)) {
            list.retain(|e| e.filename != name);
        }
    }

    fn mkdir(&mut self, rel: &str) {
        self.upsert(
            rel,
            Entry {
                filename: name_of(rel).to_string(),
                file_type: FileType::Directory,
                mime: None,
                size: 0,
            },
        );
        self.data.remove(rel);
        self.tree.entry(rel.to_string()).or_default();
    }

    fn write(&mut self, rel: &str, mime: Option<String>, data: &[u8]) {
        let mime = mime.unwrap_or_else(|| paths::guess_mime(rel).to_string());
        self.upsert(
            rel,
            Entry {
                filename: name_of(rel).to_string(),
                file_type: FileType::File,
                mime: Some(mime),
                size: data.len() as u64,
            },
        );
        self.data
            .insert(rel.to_string(), encoding::encode_base64(data));
    }

    /// Remove an entry and, for directories, everything below it
    fn remove(&mut self, rel: &str) {
        if self.is_dir(rel) {
            let prefix = format!("{}/", rel.trim_end_matches('/'));
            self.tree.retain(|k, _| !k.starts_with(&prefix));
            self.data.retain(|k, _| !k.starts_with(&prefix));
            self.tree.remove(rel);
        }
        self.data.remove(rel);
        self.detach(rel);
    }

    fn copy(&mut self, src: &str, dest: &str) -> VfsResult<()> {
        let entry = self
            .entry(src)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(src.to_string()))?;

        if entry.file_type == FileType::Directory {
            self.mkdir(dest);
            let children = self.tree.get(src).cloned().unwrap_or_default();
            for child in children {
                self.copy(
                    &child_of(src, &child.filename),
                    &child_of(dest, &child.filename),
                )?;
            }
        } else {
            let payload = self.data.get(src).cloned().unwrap_or_default();
            self.upsert(
                dest,
                Entry {
                    filename: name_of(dest).to_string(),
                    ..entry
                },
            );
            self.data.insert(dest.to_string(), payload);
        }
        Ok(())
    }

    fn serialize(&self) -> VfsResult<(String, String)> {
        Ok((
            serde_json::to_string(&self.tree)?,
            serde_json::to_string(&self.data)?,
        ))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Filesystem persisted in a [`KeyValueStore`] with a size quota
pub struct LocalStorageTransport {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    quota: u64,
    state: Mutex<State>,
}

impl LocalStorageTransport {
    /// Restore the tree from `store`; unreadable records start empty
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let mut state = State {
            tree: restore(store.as_ref(), &format!("{}/tree", namespace)),
            data: restore(store.as_ref(), &format!("{}/data", namespace)),
        };
        state.tree.entry("/".to_string()).or_default();

        debug!(
            namespace = %namespace,
            directories = state.tree.len(),
            files = state.data.len(),
            "Local storage restored"
        );

        Self {
            store,
            namespace,
            quota: LOCAL_STORAGE_QUOTA,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = quota;
        self
    }

    /// Bytes used by the persisted records
    pub fn used(&self) -> u64 {
        self.state
            .lock()
            .serialize()
            .map(|(tree, data)| (tree.len() + data.len()) as u64)
            .unwrap_or(0)
    }

    /// Apply `op` to a copy of the state; it replaces the live state only
    /// after it fits the quota and was persisted
    fn mutate<T>(&self, op: impl FnOnce(&mut State) -> VfsResult<T>) -> VfsResult<T> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        let out = op(&mut next)?;

        let (tree, data) = next.serialize()?;
        let used = (tree.len() + data.len()) as u64;
        if used > self.quota {
            return Err(VfsError::QuotaExceeded {
                used,
                quota: self.quota,
            });
        }

        self.store.set_many(vec![
            (format!("{}/tree", self.namespace), tree),
            (format!("{}/data", self.namespace), data),
        ])?;
        *state = next;
        Ok(out)
    }

    fn metadata(scheme_path: &str, entry: &Entry) -> FileMetadata {
        let mut meta = FileMetadata::new(scheme_path, entry.file_type);
        meta.mime = entry.mime.clone();
        if entry.file_type == FileType::File {
            meta.size = Some(entry.size);
        }
        meta
    }
}

fn restore<T: for<'de> Deserialize<'de> + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Discarding unreadable local storage record");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key = %key, error = %e, "Local storage record unavailable");
            T::default()
        }
    }
}

#[async_trait]
impl Transport for LocalStorageTransport {
    fn name(&self) -> &str {
        "localstorage"
    }

    async fn scandir(&self, dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        let rel = relative(&dir.path);
        let state = self.state.lock();
        let entries = state
            .tree
            .get(&rel)
            .ok_or_else(|| VfsError::NotFound(dir.path.clone()))?;

        Ok(entries
            .iter()
            .map(|e| Self::metadata(&paths::join(&dir.path, &e.filename), e))
            .collect())
    }

    async fn read(&self, file: &FileMetadata) -> VfsResult<Bytes> {
        let rel = relative(&file.path);
        let payload = self
            .state
            .lock()
            .data
            .get(&rel)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(file.path.clone()))?;
        encoding::decode_base64(&payload)
    }

    async fn write(&self, file: &FileMetadata, data: Bytes) -> VfsResult<()> {
        let rel = relative(&file.path);
        self.mutate(|state| {
            state.require_parent(&rel)?;
            if state.is_dir(&rel) {
                return Err(VfsError::InvalidArgument(format!(
                    "{} is a directory",
                    file.path
                )));
            }
            state.write(&rel, file.mime.clone(), &data);
            Ok(())
        })
    }

    /// Refuses to replace an existing entry
    async fn upload(&self, dest: &FileMetadata, filename: &str, data: Bytes) -> VfsResult<()> {
        let target = paths::join(&dest.path, filename);
        let rel = relative(&target);
        self.mutate(|state| {
            state.require_parent(&rel)?;
            if state.entry(&rel).is_some() {
                return Err(VfsError::AlreadyExists(target.clone()));
            }
            state.write(&rel, None, &data);
            Ok(())
        })
    }

    async fn copy(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        let from = relative(&src.path);
        let to = relative(&dest.path);
        self.mutate(|state| {
            state.require_parent(&to)?;
            if to == from || to.starts_with(&format!("{}/", from)) {
                return Err(VfsError::InvalidArgument(format!(
                    "cannot copy {} into itself",
                    src.path
                )));
            }
            if state.is_dir(&to) {
                return Err(VfsError::AlreadyExists(dest.path.clone()));
            }
            state.copy(&from, &to)
        })
    }

    async fn move_entry(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        let from = relative(&src.path);
        let to = relative(&dest.path);
        self.mutate(|state| {
            state.require_parent(&to)?;
            if state.entry(&to).is_some() {
                return Err(VfsError::AlreadyExists(dest.path.clone()));
            }
            if to.starts_with(&format!("{}/", from)) {
                return Err(VfsError::InvalidArgument(format!(
                    "cannot move {} into itself",
                    src.path
                )));
            }
            state.copy(&from, &to)?;
            state.remove(&from);
            Ok(())
        })
    }

    async fn unlink(&self, file: &FileMetadata) -> VfsResult<()> {
        let rel = relative(&file.path);
        if rel == "/" {
            return Err(VfsError::InvalidArgument(
                "the storage root cannot be removed".into(),
            ));
        }
        self.mutate(|state| {
            if state.entry(&rel).is_none() {
                return Err(VfsError::NotFound(file.path.clone()));
            }
            state.remove(&rel);
            Ok(())
        })
    }

    async fn mkdir(&self, dir: &FileMetadata) -> VfsResult<()> {
        let rel = relative(&dir.path);
        self.mutate(|state| {
            if rel == "/" || state.entry(&rel).is_some() {
                return Err(VfsError::AlreadyExists(dir.path.clone()));
            }
            state.require_parent(&rel)?;
            state.mkdir(&rel);
            Ok(())
        })
    }

    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        let rel = relative(&file.path);
        Ok(rel == "/" || self.state.lock().entry(&rel).is_some())
    }

    async fn fileinfo(&self, file: &FileMetadata) -> VfsResult<FileMetadata> {
        let rel = relative(&file.path);
        if rel == "/" {
            return Ok(FileMetadata::directory(paths::normalize(&file.path)));
        }
        self.state
            .lock()
            .entry(&rel)
            .map(|e| Self::metadata(&paths::normalize(&file.path), e))
            .ok_or_else(|| VfsError::NotFound(file.path.clone()))
    }

    /// Contents inlined as a `data:` URL
    async fn url(&self, file: &FileMetadata) -> VfsResult<String> {
        let info = self.fileinfo(file).await?;
        if info.is_dir() {
            return Err(VfsError::InvalidArgument(format!(
                "{} is a directory",
                file.path
            )));
        }
        let data = self.read(file).await?;
        let mime = info.mime.as_deref().unwrap_or("application/octet-stream");
        Ok(encoding::to_data_url(&data, mime))
    }

    async fn free_space(&self, _root: &str) -> VfsResult<Option<u64>> {
        Ok(Some(self.quota.saturating_sub(self.used())))
    }
}
