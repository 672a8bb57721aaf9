/*!
 * VFS Facade
 * Single entry point for filesystem requests
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

use super::mount::{MountRegistry, Mountpoint};
use super::observable::{WatchEvent, WatchHub, WatchId, WatchKind, WatchTarget};
use super::traits::{dispatch, Transport};
use super::types::*;
use crate::core::traits::{MessageSink, NullSink};
use crate::core::types::Origin;
use crate::monitoring::span_vfs;

/// Interception points around every request
///
/// `on_request` may answer a request itself, in which case the transport is
/// not called. `on_request_completed` may replace a successful response.
#[async_trait]
pub trait RequestHooks: Send + Sync {
    async fn on_request(
        &self,
        mount: &Mountpoint,
        request: &VfsRequest,
        origin: &Origin,
    ) -> VfsResult<Option<VfsResponse>> {
        let _ = (mount, request, origin);
        Ok(None)
    }

    async fn on_request_completed(
        &self,
        mount: &Mountpoint,
        request: &VfsRequest,
        response: VfsResponse,
        origin: &Origin,
    ) -> VfsResult<VfsResponse> {
        let _ = (mount, request, origin);
        Ok(response)
    }
}

/// The VFS facade: resolve, enforce, dispatch, notify
#[derive(Clone)]
pub struct Vfs {
    mounts: MountRegistry,
    watches: WatchHub,
    hooks: Vec<Arc<dyn RequestHooks>>,
    sink: Arc<dyn MessageSink>,
}

impl Vfs {
    pub fn new(mounts: MountRegistry) -> Self {
        Self {
            mounts,
            watches: WatchHub::default(),
            hooks: Vec::new(),
            sink: Arc::new(NullSink),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn RequestHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    #[must_use]
    pub fn with_message_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn mounts(&self) -> &MountRegistry {
        &self.mounts
    }

    pub fn watches(&self) -> &WatchHub {
        &self.watches
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Register a mount and announce it to running processes
    pub fn mount(&self, mountpoint: Mountpoint) -> VfsResult<Arc<Mountpoint>> {
        let mount = self.mounts.register(mountpoint)?;
        if !mount.options.special {
            self.sink
                .broadcast("vfs:mount", Value::String(mount.name.clone()), None);
        }
        Ok(mount)
    }

    /// Remove a mount and announce it to running processes
    pub fn unmount(&self, name: &str) -> VfsResult<()> {
        let mount = self.mounts.unregister(name)?;
        if !mount.options.special {
            self.sink
                .broadcast("vfs:unmount", Value::String(mount.name.clone()), None);
        }
        Ok(())
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Perform a typed request
    pub async fn request(&self, request: VfsRequest, origin: Origin) -> VfsResult<VfsResponse> {
        let method = request.method();
        let span = span_vfs(method.as_str(), request.path(), &origin);

        let result = self
            .execute(&request, &origin, |mount| span.record_mount(mount))
            .instrument(span.span().clone())
            .await;

        match &result {
            Ok(_) => span.record_result(true),
            Err(e) => span.record_error(&e.to_string()),
        }

        if result.is_ok() && method.is_mutating() {
            self.notify(&request, origin);
        }
        result
    }

    /// Perform a request given as a method name and positional JSON arguments
    pub async fn request_raw(
        &self,
        method: &str,
        args: Vec<Value>,
        origin: Origin,
    ) -> VfsResult<Value> {
        let request = VfsRequest::from_wire(method, args)?;
        self.request(request, origin).await.map(VfsResponse::into_value)
    }

    async fn execute(
        &self,
        request: &VfsRequest,
        origin: &Origin,
        on_resolved: impl FnOnce(&str),
    ) -> VfsResult<VfsResponse> {
        let method = request.method();
        // A copy only writes to its destination
        let mount = match method {
            VfsMethod::Copy => self.mounts.resolve(request.path())?,
            _ => self.mounts.resolve_for(request.path(), method)?,
        };
        on_resolved(&mount.name);

        let destination = match request.destination() {
            Some(dest) => Some(self.mounts.resolve_for(dest, method)?),
            None => None,
        };

        for hooks in &self.hooks {
            if let Some(response) = hooks.on_request(&mount, request, origin).await? {
                debug!(method = %method, "Request answered by hook");
                return Ok(response);
            }
        }

        let mut response = match (&destination, request) {
            (Some(dest), VfsRequest::Copy { src, dest: target })
                if !same_transport(&mount.transport, &dest.transport) =>
            {
                let data = mount.transport.read(src).await?;
                dest.transport.write(target, data).await?;
                VfsResponse::Done
            }
            (Some(dest), VfsRequest::Move { src, dest: target })
                if !same_transport(&mount.transport, &dest.transport) =>
            {
                let data = mount.transport.read(src).await?;
                dest.transport.write(target, data).await?;
                mount.transport.unlink(src).await?;
                VfsResponse::Done
            }
            _ => dispatch(mount.transport.as_ref(), request).await?,
        };

        for hooks in &self.hooks {
            response = hooks
                .on_request_completed(&mount, request, response, origin)
                .await?;
        }
        Ok(response)
    }

    /// Emit the watch event and process message for a completed mutation
    fn notify(&self, request: &VfsRequest, origin: Origin) {
        let Some(target) = watch_target(request) else {
            return;
        };

        if let Some(dead) = target
            .paths()
            .into_iter()
            .find(|p| self.mounts.resolve(p).is_err())
        {
            warn!(path = dead, "Dropping watch event for unmounted path");
            return;
        }

        let event = WatchEvent {
            method: request.method(),
            target,
            origin,
        };
        let payload = serde_json::to_value(&event.target).unwrap_or(Value::Null);
        self.sink.broadcast(&event.message_name(), payload, origin.pid);
        let notified = self.watches.emit(&event);
        debug!(method = %event.method, notified, "Watch event emitted");
    }

    // =========================================================================
    // Watches
    // =========================================================================

    /// Watch a file or directory for changes made by others
    pub fn watch(
        &self,
        path: &str,
        kind: WatchKind,
        owner: Origin,
    ) -> (WatchId, tokio::sync::mpsc::UnboundedReceiver<WatchEvent>) {
        self.watches.watch(path, kind, owner)
    }

    pub fn unwatch(&self, id: WatchId) -> bool {
        self.watches.unwatch(id)
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    pub async fn scandir(
        &self,
        dir: &str,
        options: ScandirOptions,
        origin: Origin,
    ) -> VfsResult<Vec<FileMetadata>> {
        let request = VfsRequest::Scandir {
            dir: FileMetadata::directory(dir),
            options,
        };
        self.request(request, origin).await?.into_listing()
    }

    pub async fn read(&self, file: &str, origin: Origin) -> VfsResult<Bytes> {
        let request = VfsRequest::Read {
            file: FileMetadata::file(file),
        };
        self.request(request, origin).await?.into_data()
    }

    pub async fn write(
        &self,
        file: &str,
        data: impl Into<Bytes>,
        origin: Origin,
    ) -> VfsResult<()> {
        let request = VfsRequest::Write {
            file: FileMetadata::file(file),
            data: data.into(),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn upload(
        &self,
        dest: &str,
        filename: &str,
        data: impl Into<Bytes>,
        origin: Origin,
    ) -> VfsResult<()> {
        let request = VfsRequest::Upload {
            dest: FileMetadata::directory(dest),
            filename: filename.to_string(),
            data: data.into(),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn copy(&self, src: &str, dest: &str, origin: Origin) -> VfsResult<()> {
        let request = VfsRequest::Copy {
            src: FileMetadata::from(src),
            dest: FileMetadata::from(dest),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn move_entry(&self, src: &str, dest: &str, origin: Origin) -> VfsResult<()> {
        let request = VfsRequest::Move {
            src: FileMetadata::from(src),
            dest: FileMetadata::from(dest),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn unlink(&self, file: &str, origin: Origin) -> VfsResult<()> {
        let request = VfsRequest::Unlink {
            file: FileMetadata::from(file),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn mkdir(&self, dir: &str, origin: Origin) -> VfsResult<()> {
        let request = VfsRequest::Mkdir {
            dir: FileMetadata::directory(dir),
        };
        self.request(request, origin).await.map(|_| ())
    }

    pub async fn exists(&self, file: &str, origin: Origin) -> VfsResult<bool> {
        let request = VfsRequest::Exists {
            file: FileMetadata::from(file),
        };
        self.request(request, origin).await?.into_bool()
    }

    pub async fn fileinfo(&self, file: &str, origin: Origin) -> VfsResult<FileMetadata> {
        let request = VfsRequest::Fileinfo {
            file: FileMetadata::from(file),
        };
        self.request(request, origin).await?.into_metadata()
    }

    pub async fn url(&self, file: &str, origin: Origin) -> VfsResult<String> {
        let request = VfsRequest::Url {
            file: FileMetadata::file(file),
        };
        self.request(request, origin).await?.into_url()
    }

    pub async fn find(
        &self,
        dir: &str,
        query: FindQuery,
        origin: Origin,
    ) -> VfsResult<Vec<FileMetadata>> {
        let request = VfsRequest::Find {
            dir: FileMetadata::directory(dir),
            query,
        };
        self.request(request, origin).await?.into_listing()
    }

    pub async fn free_space(&self, root: &str, origin: Origin) -> VfsResult<Option<u64>> {
        let request = VfsRequest::FreeSpace {
            root: root.to_string(),
        };
        self.request(request, origin).await?.into_free_space()
    }

    /// Run `find` on every searchable mount and merge the results
    ///
    /// Mounts that cannot search are skipped; any other failure aborts.
    pub async fn search(&self, query: FindQuery, origin: Origin) -> VfsResult<Vec<FileMetadata>> {
        let mut results = Vec::new();
        for mount in self.mounts.searchable() {
            match self.find(&mount.root, query.clone(), origin).await {
                Ok(found) => results.extend(found),
                Err(VfsError::Unavailable(_)) => continue,
                Err(e) => return Err(e),
            }
            if query.limit.map_or(false, |limit| results.len() >= limit) {
                break;
            }
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}

/// Path(s) a completed mutating request touched
///
/// Uploads report the stored file rather than the destination directory.
pub fn watch_target(request: &VfsRequest) -> Option<WatchTarget> {
    match request {
        VfsRequest::Upload { dest, filename, .. } => {
            Some(WatchTarget::Path(upload_target(dest, filename)))
        }
        other => WatchTarget::from_args(other.method(), &other.path_args()),
    }
}

fn same_transport(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
