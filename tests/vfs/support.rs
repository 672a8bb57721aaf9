/*!
 * Shared fixtures for VFS tests
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use webtop_kernel::connection::{Connection, FetchMethod};
use webtop_kernel::core::{MessageSink, Pid};
use webtop_kernel::vfs::{FileMetadata, Transport, VfsError, VfsMethod, VfsResult};

/// In-memory transport that records every call it receives
#[derive(Default)]
pub struct SpyTransport {
    pub calls: Mutex<Vec<VfsMethod>>,
    pub files: Mutex<BTreeMap<String, Bytes>>,
}

impl SpyTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_file(path: &str, data: &'static [u8]) -> Arc<Self> {
        let spy = Self::default();
        spy.files
            .lock()
            .insert(path.to_string(), Bytes::from_static(data));
        Arc::new(spy)
    }

    pub fn called(&self) -> Vec<VfsMethod> {
        self.calls.lock().clone()
    }

    fn record(&self, method: VfsMethod) {
        self.calls.lock().push(method);
    }
}

#[async_trait]
impl Transport for SpyTransport {
    fn name(&self) -> &str {
        "spy"
    }

    async fn scandir(&self, dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        self.record(VfsMethod::Scandir);
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|p| p.starts_with(&dir.path))
            .map(|p| FileMetadata::file(p.as_str()))
            .collect())
    }

    async fn read(&self, file: &FileMetadata) -> VfsResult<Bytes> {
        self.record(VfsMethod::Read);
        self.files
            .lock()
            .get(&file.path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(file.path.clone()))
    }

    async fn write(&self, file: &FileMetadata, data: Bytes) -> VfsResult<()> {
        self.record(VfsMethod::Write);
        self.files.lock().insert(file.path.clone(), data);
        Ok(())
    }

    async fn copy(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        self.record(VfsMethod::Copy);
        let mut files = self.files.lock();
        let data = files
            .get(&src.path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(src.path.clone()))?;
        files.insert(dest.path.clone(), data);
        Ok(())
    }

    async fn move_entry(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        self.record(VfsMethod::Move);
        let mut files = self.files.lock();
        let data = files
            .remove(&src.path)
            .ok_or_else(|| VfsError::NotFound(src.path.clone()))?;
        files.insert(dest.path.clone(), data);
        Ok(())
    }

    async fn unlink(&self, file: &FileMetadata) -> VfsResult<()> {
        self.record(VfsMethod::Unlink);
        self.files
            .lock()
            .remove(&file.path)
            .map(|_| ())
            .ok_or_else(|| VfsError::NotFound(file.path.clone()))
    }

    async fn mkdir(&self, _dir: &FileMetadata) -> VfsResult<()> {
        self.record(VfsMethod::Mkdir);
        Ok(())
    }

    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        self.record(VfsMethod::Exists);
        Ok(self.files.lock().contains_key(&file.path))
    }
}

/// Server stand-in answering every API call with `true`
#[derive(Default)]
pub struct RecordingConnection {
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn request(&self, method: &str, args: Vec<Value>) -> VfsResult<Value> {
        self.calls.lock().push((method.to_string(), args));
        Ok(Value::Bool(true))
    }

    async fn fetch(&self, url: &str, _method: FetchMethod) -> VfsResult<Bytes> {
        Err(VfsError::Transport(format!("no fetch in tests: {}", url)))
    }
}

/// Captures process messages forwarded by the facade
#[derive(Default)]
pub struct MessageLog {
    pub messages: Mutex<Vec<(String, Value, Option<Pid>)>>,
}

impl MessageLog {
    pub fn names(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(n, _, _)| n.clone()).collect()
    }
}

impl MessageSink for MessageLog {
    fn broadcast(&self, name: &str, payload: Value, source: Option<Pid>) -> usize {
        self.messages
            .lock()
            .push((name.to_string(), payload, source));
        1
    }
}
