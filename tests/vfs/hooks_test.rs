/*!
 * Request Hook Tests
 * Interception before dispatch and rewriting after completion
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use webtop_kernel::core::Origin;
use webtop_kernel::vfs::{
    MountRegistry, Mountpoint, RequestHooks, Vfs, VfsMethod, VfsRequest, VfsResponse,
    VfsResult, WatchKind,
};

use crate::support::{MessageLog, SpyTransport};

/// Unmounts the target mount while its request is in flight
struct Unmounter {
    mounts: MountRegistry,
}

#[async_trait]
impl RequestHooks for Unmounter {
    async fn on_request(
        &self,
        mount: &Mountpoint,
        _request: &VfsRequest,
        _origin: &Origin,
    ) -> VfsResult<Option<VfsResponse>> {
        self.mounts.unregister(&mount.name)?;
        Ok(None)
    }
}

/// Serves reads of `.cached` files itself
struct ReadCache;

#[async_trait]
impl RequestHooks for ReadCache {
    async fn on_request(
        &self,
        _mount: &Mountpoint,
        request: &VfsRequest,
        _origin: &Origin,
    ) -> VfsResult<Option<VfsResponse>> {
        match request {
            VfsRequest::Read { file } if file.path.ends_with(".cached") => {
                Ok(Some(VfsResponse::Data(Bytes::from_static(b"from cache"))))
            }
            _ => Ok(None),
        }
    }
}

/// Upper-cases read results and remembers which mounts it saw
#[derive(Default)]
struct Shouter {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl RequestHooks for Shouter {
    async fn on_request_completed(
        &self,
        mount: &Mountpoint,
        _request: &VfsRequest,
        response: VfsResponse,
        _origin: &Origin,
    ) -> VfsResult<VfsResponse> {
        self.seen.lock().push(mount.name.clone());
        Ok(match response {
            VfsResponse::Data(data) => VfsResponse::Data(Bytes::from(data.to_ascii_uppercase())),
            other => other,
        })
    }
}

#[tokio::test]
async fn test_event_for_unmounted_path_dropped() {
    let spy = SpyTransport::new();
    let mounts = MountRegistry::new();
    let log = Arc::new(MessageLog::default());
    let vfs = Vfs::new(mounts.clone())
        .with_message_sink(log.clone())
        .with_hooks(Arc::new(Unmounter {
            mounts: mounts.clone(),
        }));
    vfs.mount(Mountpoint::new("temp", spy.clone())).unwrap();
    let (_, mut rx) = vfs.watch("temp:///", WatchKind::Dir, Origin::window(2, 2));

    vfs.write("temp:///a.txt", "a", Origin::system()).await.unwrap();

    // The transport was already resolved, so the write itself lands
    assert_eq!(spy.called(), vec![VfsMethod::Write]);
    assert!(!vfs.mounts().is_mounted("temp"));
    assert!(rx.try_recv().is_err());
    assert_eq!(log.names(), vec!["vfs:mount".to_string()]);
}

#[tokio::test]
async fn test_hook_answers_without_transport() {
    let spy = SpyTransport::with_file("disk:///a.txt", b"on disk");
    let vfs = Vfs::new(MountRegistry::new()).with_hooks(Arc::new(ReadCache));
    vfs.mount(Mountpoint::new("disk", spy.clone())).unwrap();

    let data = vfs.read("disk:///b.cached", Origin::system()).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"from cache"));
    assert!(spy.called().is_empty());

    let data = vfs.read("disk:///a.txt", Origin::system()).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"on disk"));
    assert_eq!(spy.called(), vec![VfsMethod::Read]);
}

#[tokio::test]
async fn test_completed_hook_rewrites_response() {
    let spy = SpyTransport::with_file("disk:///a.txt", b"quiet");
    let shouter = Arc::new(Shouter::default());
    let vfs = Vfs::new(MountRegistry::new()).with_hooks(shouter.clone());
    vfs.mount(Mountpoint::new("disk", spy.clone())).unwrap();

    let data = vfs.read("disk:///a.txt", Origin::system()).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"QUIET"));

    // Non-data responses pass through unchanged
    assert!(vfs.exists("disk:///a.txt", Origin::system()).await.unwrap());
    assert_eq!(*shouter.seen.lock(), vec!["disk".to_string(), "disk".to_string()]);
}

#[tokio::test]
async fn test_failed_request_skips_completed_hook() {
    let spy = SpyTransport::new();
    let shouter = Arc::new(Shouter::default());
    let vfs = Vfs::new(MountRegistry::new()).with_hooks(shouter.clone());
    vfs.mount(Mountpoint::new("disk", spy)).unwrap();

    assert!(vfs.read("disk:///missing.txt", Origin::system()).await.is_err());
    assert!(shouter.seen.lock().is_empty());
}
