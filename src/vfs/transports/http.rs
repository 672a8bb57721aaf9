/*!
 * HTTP Transport
 * Files stored behind the server `FS:` API
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::connection::Connection;
use crate::vfs::encoding;
use crate::vfs::paths;
use crate::vfs::traits::Transport;
use crate::vfs::types::*;

/// Transport forwarding every operation to the server
pub struct HttpTransport {
    connection: Arc<dyn Connection>,
    fs_uri: String,
    /// 0 = unlimited
    max_upload_size: u64,
}

impl HttpTransport {
    pub fn new(connection: Arc<dyn Connection>, fs_uri: impl Into<String>) -> Self {
        Self {
            connection,
            fs_uri: fs_uri.into(),
            max_upload_size: 0,
        }
    }

    #[must_use]
    pub fn with_max_upload_size(mut self, limit: u64) -> Self {
        self.max_upload_size = limit;
        self
    }

    async fn call(&self, method: VfsMethod, args: Vec<Value>) -> VfsResult<Value> {
        self.connection
            .request(&format!("FS:{}", method), args)
            .await
    }

    fn check_size(&self, size: usize) -> VfsResult<()> {
        let size = size as u64;
        if self.max_upload_size > 0 && size > self.max_upload_size {
            return Err(VfsError::FileTooLarge {
                size,
                limit: self.max_upload_size,
            });
        }
        Ok(())
    }
}

fn listing(value: Value) -> VfsResult<Vec<FileMetadata>> {
    match value {
        Value::Array(items) => items.into_iter().map(FileMetadata::from_value).collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(VfsError::Transport(format!(
            "expected a file list, got {}",
            other
        ))),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn scandir(&self, dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        listing(self.call(VfsMethod::Scandir, vec![json!(dir.path)]).await?)
    }

    async fn read(&self, file: &FileMetadata) -> VfsResult<Bytes> {
        match self.call(VfsMethod::Read, vec![json!(file.path)]).await? {
            Value::String(s) if s.starts_with("data:") => encoding::from_data_url(&s),
            Value::String(s) => encoding::decode_base64(&s),
            other => Err(VfsError::Transport(format!(
                "expected file contents, got {}",
                other
            ))),
        }
    }

    async fn write(&self, file: &FileMetadata, data: Bytes) -> VfsResult<()> {
        self.check_size(data.len())?;
        let mime = file.mime.as_deref().unwrap_or("application/octet-stream");
        self.call(
            VfsMethod::Write,
            vec![json!(file.path), json!(encoding::to_data_url(&data, mime))],
        )
        .await
        .map(|_| ())
    }

    async fn upload(&self, dest: &FileMetadata, filename: &str, data: Bytes) -> VfsResult<()> {
        self.check_size(data.len())?;
        self.call(
            VfsMethod::Upload,
            vec![
                json!(dest.path),
                json!(filename),
                json!(encoding::encode_base64(&data)),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn copy(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        self.call(VfsMethod::Copy, vec![json!(src.path), json!(dest.path)])
            .await
            .map(|_| ())
    }

    async fn move_entry(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        self.call(VfsMethod::Move, vec![json!(src.path), json!(dest.path)])
            .await
            .map(|_| ())
    }

    async fn unlink(&self, file: &FileMetadata) -> VfsResult<()> {
        self.call(VfsMethod::Unlink, vec![json!(file.path)])
            .await
            .map(|_| ())
    }

    async fn mkdir(&self, dir: &FileMetadata) -> VfsResult<()> {
        self.call(VfsMethod::Mkdir, vec![json!(dir.path)])
            .await
            .map(|_| ())
    }

    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        let result = self.call(VfsMethod::Exists, vec![json!(file.path)]).await?;
        Ok(truthy(&result))
    }

    async fn fileinfo(&self, file: &FileMetadata) -> VfsResult<FileMetadata> {
        FileMetadata::from_value(self.call(VfsMethod::Fileinfo, vec![json!(file.path)]).await?)
    }

    /// Built locally, no request is made
    async fn url(&self, file: &FileMetadata) -> VfsResult<String> {
        let base = self.fs_uri.trim_end_matches('/');
        let path = paths::normalize(&file.path);
        Ok(format!("{}/{}", base, path.trim_start_matches('/')))
    }

    async fn find(&self, dir: &FileMetadata, query: &FindQuery) -> VfsResult<Vec<FileMetadata>> {
        let query = serde_json::to_value(query)?;
        listing(self.call(VfsMethod::Find, vec![json!(dir.path), query]).await?)
    }

    async fn free_space(&self, root: &str) -> VfsResult<Option<u64>> {
        match self.call(VfsMethod::FreeSpace, vec![json!(root)]).await? {
            Value::Number(n) => Ok(n.as_u64()),
            _ => Ok(None),
        }
    }
}
