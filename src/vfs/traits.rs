/*!
 * VFS Traits
 * Core transport abstraction
 */

use async_trait::async_trait;
use bytes::Bytes;

use super::types::*;

/// Storage backend behind a mountpoint
///
/// A transport implements any subset of the VFS capabilities. Every method
/// has a default that rejects with [`VfsError::Unavailable`], so a transport
/// only overrides what its backend can actually do. Read-only enforcement is
/// done by the mount registry before a transport is ever called.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (used in logs and errors)
    fn name(&self) -> &str;

    /// List directory contents
    async fn scandir(&self, dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        let _ = dir;
        Err(unavailable(self.name(), VfsMethod::Scandir))
    }

    /// Read entire file contents
    async fn read(&self, file: &FileMetadata) -> VfsResult<Bytes> {
        let _ = file;
        Err(unavailable(self.name(), VfsMethod::Read))
    }

    /// Write entire file contents (create or overwrite)
    async fn write(&self, file: &FileMetadata, data: Bytes) -> VfsResult<()> {
        let _ = (file, data);
        Err(unavailable(self.name(), VfsMethod::Write))
    }

    /// Store a file named `filename` inside `dest`
    async fn upload(&self, dest: &FileMetadata, filename: &str, data: Bytes) -> VfsResult<()> {
        let _ = (dest, filename, data);
        Err(unavailable(self.name(), VfsMethod::Upload))
    }

    /// Copy within this transport
    async fn copy(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        let _ = (src, dest);
        Err(unavailable(self.name(), VfsMethod::Copy))
    }

    /// Move/rename within this transport
    async fn move_entry(&self, src: &FileMetadata, dest: &FileMetadata) -> VfsResult<()> {
        let _ = (src, dest);
        Err(unavailable(self.name(), VfsMethod::Move))
    }

    /// Delete a file or directory (recursively)
    async fn unlink(&self, file: &FileMetadata) -> VfsResult<()> {
        let _ = file;
        Err(unavailable(self.name(), VfsMethod::Unlink))
    }

    /// Create a directory
    async fn mkdir(&self, dir: &FileMetadata) -> VfsResult<()> {
        let _ = dir;
        Err(unavailable(self.name(), VfsMethod::Mkdir))
    }

    /// Check if an entry exists
    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        let _ = file;
        Err(unavailable(self.name(), VfsMethod::Exists))
    }

    /// Fresh metadata for an entry
    async fn fileinfo(&self, file: &FileMetadata) -> VfsResult<FileMetadata> {
        let _ = file;
        Err(unavailable(self.name(), VfsMethod::Fileinfo))
    }

    /// URL the entry can be fetched from
    async fn url(&self, file: &FileMetadata) -> VfsResult<String> {
        let _ = file;
        Err(unavailable(self.name(), VfsMethod::Url))
    }

    /// Search below a directory
    async fn find(&self, dir: &FileMetadata, query: &FindQuery) -> VfsResult<Vec<FileMetadata>> {
        let _ = (dir, query);
        Err(unavailable(self.name(), VfsMethod::Find))
    }

    /// Remaining space (`None` = no quota)
    async fn free_space(&self, root: &str) -> VfsResult<Option<u64>> {
        let _ = root;
        Err(unavailable(self.name(), VfsMethod::FreeSpace))
    }
}

/// The "Not available" rejection used by default capability methods
pub fn unavailable(transport: &str, method: VfsMethod) -> VfsError {
    VfsError::Unavailable(format!("{} on {}", method, transport))
}

/// Invoke the transport method matching a request
pub async fn dispatch(transport: &dyn Transport, request: &VfsRequest) -> VfsResult<VfsResponse> {
    match request {
        VfsRequest::Scandir { dir, options } => {
            let list = transport.scandir(dir).await?;
            Ok(VfsResponse::Listing(options.apply(list)))
        }
        VfsRequest::Read { file } => transport.read(file).await.map(VfsResponse::Data),
        VfsRequest::Write { file, data } => transport
            .write(file, data.clone())
            .await
            .map(|_| VfsResponse::Done),
        VfsRequest::Upload {
            dest,
            filename,
            data,
        } => transport
            .upload(dest, filename, data.clone())
            .await
            .map(|_| VfsResponse::Done),
        VfsRequest::Copy { src, dest } => transport.copy(src, dest).await.map(|_| VfsResponse::Done),
        VfsRequest::Move { src, dest } => transport
            .move_entry(src, dest)
            .await
            .map(|_| VfsResponse::Done),
        VfsRequest::Unlink { file } => transport.unlink(file).await.map(|_| VfsResponse::Done),
        VfsRequest::Mkdir { dir } => transport.mkdir(dir).await.map(|_| VfsResponse::Done),
        VfsRequest::Exists { file } => transport.exists(file).await.map(VfsResponse::Exists),
        VfsRequest::Fileinfo { file } => transport.fileinfo(file).await.map(VfsResponse::Metadata),
        VfsRequest::Url { file } => transport.url(file).await.map(VfsResponse::Url),
        VfsRequest::Find { dir, query } => {
            transport.find(dir, query).await.map(VfsResponse::Listing)
        }
        VfsRequest::FreeSpace { root } => {
            transport.free_space(root).await.map(VfsResponse::FreeSpace)
        }
    }
}
