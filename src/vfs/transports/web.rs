/*!
 * Web Transport
 * Read-only access to plain HTTP resources
 */

use async_trait::async_trait;
use bytes::Bytes;
use regex_lite::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::connection::{Connection, FetchMethod};
use crate::vfs::mount::{MountOptions, Mountpoint};
use crate::vfs::paths;
use crate::vfs::traits::Transport;
use crate::vfs::types::*;

/// Paths claimed by the passthrough web mount
pub const WEB_PATTERN: &str = r"^https?://";

/// Directory listings are served as a JSON file inside each folder
const SCANDIR_INDEX: &str = "_scandir.json";

/// Fetches files over plain HTTP
///
/// Without a base URL the path itself is the URL (`https://host/file`).
/// With one, `<mount>:///a/b` maps to `<base>/a/b`.
pub struct WebTransport {
    connection: Arc<dyn Connection>,
    base_url: Option<String>,
}

impl WebTransport {
    /// Passthrough for absolute `http(s)://` paths
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            base_url: None,
        }
    }

    /// Serve a mount from `base_url`
    pub fn with_base(connection: Arc<dyn Connection>, base_url: impl Into<String>) -> Self {
        Self {
            connection,
            base_url: Some(base_url.into().trim_end_matches('/').to_string()),
        }
    }

    /// Read-only mount matching `http://` and `https://` paths
    pub fn mountpoint(connection: Arc<dyn Connection>) -> VfsResult<Mountpoint> {
        let pattern = Regex::new(WEB_PATTERN)
            .map_err(|e| VfsError::InvalidArgument(format!("web pattern: {}", e)))?;
        Ok(Mountpoint::new("web", Arc::new(Self::new(connection))).with_options(
            MountOptions {
                read_only: true,
                special: true,
                pattern: Some(pattern),
                description: Some("Web".into()),
                ..MountOptions::default()
            },
        ))
    }

    /// URL a VFS path is fetched from
    pub fn resolve_url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => {
                let rel = paths::split(path).rest.trim_start_matches('/');
                format!("{}/{}", base, rel)
            }
            None => path.to_string(),
        }
    }

    /// Listing entries carry paths relative to the mount root
    fn rebase(root: &str, dir: &FileMetadata, mut item: Value) -> VfsResult<FileMetadata> {
        let path = match item.get("path").and_then(Value::as_str) {
            Some(p) => format!("{}{}", root, p.trim_start_matches('/')),
            None => {
                let name = item
                    .get("filename")
                    .and_then(Value::as_str)
                    .ok_or_else(|| VfsError::Transport("listing entry without a name".into()))?;
                paths::join(&dir.path, name)
            }
        };
        if let Value::Object(map) = &mut item {
            map.insert("path".into(), Value::String(path));
        }
        FileMetadata::from_value(item)
    }
}

#[async_trait]
impl Transport for WebTransport {
    fn name(&self) -> &str {
        "web"
    }

    async fn scandir(&self, dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        let url = format!(
            "{}/{}",
            self.resolve_url(&dir.path).trim_end_matches('/'),
            SCANDIR_INDEX
        );
        let body = self.connection.fetch(&url, FetchMethod::Get).await?;
        let items: Vec<Value> = serde_json::from_slice(&body)
            .map_err(|e| VfsError::Transport(format!("Failed to parse directory JSON: {}", e)))?;

        let parts = paths::split(&dir.path);
        let root = format!("{}{}/", parts.scheme, parts.separator);
        items
            .into_iter()
            .map(|item| Self::rebase(&root, dir, item))
            .collect()
    }

    async fn read(&self, file: &FileMetadata) -> VfsResult<Bytes> {
        self.connection
            .fetch(&self.resolve_url(&file.path), FetchMethod::Get)
            .await
    }

    /// Any failed HEAD request counts as missing
    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        let url = self.resolve_url(&file.path);
        match self.connection.fetch(&url, FetchMethod::Head).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD failed");
                Ok(false)
            }
        }
    }

    async fn url(&self, file: &FileMetadata) -> VfsResult<String> {
        Ok(self.resolve_url(&file.path))
    }
}
