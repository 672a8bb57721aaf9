/*!
 * VFS Facade Tests
 * Request routing, notifications, and cross-mount operations
 */

use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

use webtop_kernel::core::Origin;
use webtop_kernel::vfs::transports::HttpTransport;
use webtop_kernel::vfs::{
    MountRegistry, Mountpoint, Vfs, VfsError, VfsMethod, WatchKind, WatchTarget,
};

use crate::support::{MessageLog, RecordingConnection, SpyTransport};

fn vfs_with(mounts: Vec<Mountpoint>) -> (Vfs, Arc<MessageLog>) {
    let log = Arc::new(MessageLog::default());
    let vfs = Vfs::new(MountRegistry::new()).with_message_sink(log.clone());
    for mount in mounts {
        vfs.mount(mount).unwrap();
    }
    (vfs, log)
}

#[tokio::test]
async fn test_write_over_http_notifies_other_windows() {
    let conn = Arc::new(RecordingConnection::default());
    let home = Mountpoint::new("home", Arc::new(HttpTransport::new(conn.clone(), "http://fs")))
        .with_root("home:/");
    let (vfs, log) = vfs_with(vec![home]);

    let origin = Origin::window(1, 10);
    let (_, mut own) = vfs.watch("home:/", WatchKind::Dir, origin);
    let (_, mut other) = vfs.watch("home:/", WatchKind::Dir, Origin::window(2, 20));

    vfs.write("home:/a.txt", "hello", origin).await.unwrap();

    let event = other.try_recv().unwrap();
    assert_eq!(event.method, VfsMethod::Write);
    assert_eq!(event.target, WatchTarget::Path("home:/a.txt".into()));
    assert!(other.try_recv().is_err());
    assert!(own.try_recv().is_err());

    let calls = conn.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "FS:write");
    assert_eq!(calls[0].1[0], json!("home:/a.txt"));

    let messages = log.messages.lock();
    let (name, payload, source) = messages.last().unwrap();
    assert_eq!(name, "vfs:write");
    assert_eq!(payload, &json!("home:/a.txt"));
    assert_eq!(*source, Some(1));
}

#[tokio::test]
async fn test_unknown_scheme_has_no_mount() {
    let (vfs, _) = vfs_with(vec![]);
    let err = vfs.read("ftp:/foo", Origin::system()).await.unwrap_err();
    assert_eq!(err, VfsError::NoSuchMount("ftp:/foo".into()));
    assert!(vfs.mounts().resolve("ftp:/foo").is_err());
}

#[tokio::test]
async fn test_move_notifies_once_with_both_paths() {
    let spy = SpyTransport::with_file("a:/x.txt", b"x");
    let (vfs, log) = vfs_with(vec![Mountpoint::new("a", spy.clone()).with_root("a:/")]);
    let (_, mut rx) = vfs.watch("a:/", WatchKind::Dir, Origin::window(3, 30));

    vfs.move_entry("a:/x.txt", "a:/y.txt", Origin::window(1, 1))
        .await
        .unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(
        event.target,
        WatchTarget::Move {
            source: "a:/x.txt".into(),
            destination: "a:/y.txt".into(),
        }
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(spy.called(), vec![VfsMethod::Move]);
    assert_eq!(
        log.messages.lock().last().unwrap().1,
        json!({"source": "a:/x.txt", "destination": "a:/y.txt"})
    );
}

#[tokio::test]
async fn test_copy_notifies_destination_only() {
    let spy = SpyTransport::with_file("a:/x.txt", b"x");
    let (vfs, _) = vfs_with(vec![Mountpoint::new("a", spy).with_root("a:/")]);
    let (_, mut src_watch) = vfs.watch("a:/x.txt", WatchKind::File, Origin::window(3, 30));
    let (_, mut dst_watch) = vfs.watch("a:/z.txt", WatchKind::File, Origin::window(3, 31));

    vfs.copy("a:/x.txt", "a:/z.txt", Origin::system()).await.unwrap();

    assert!(src_watch.try_recv().is_err());
    assert_eq!(
        dst_watch.try_recv().unwrap().target,
        WatchTarget::Path("a:/z.txt".into())
    );
}

#[tokio::test]
async fn test_cross_mount_copy_and_move() {
    let left = SpyTransport::with_file("left:///a.txt", b"payload");
    let right = SpyTransport::new();
    let (vfs, _) = vfs_with(vec![
        Mountpoint::new("left", left.clone()),
        Mountpoint::new("right", right.clone()),
    ]);

    vfs.copy("left:///a.txt", "right:///a.txt", Origin::system())
        .await
        .unwrap();
    assert_eq!(left.called(), vec![VfsMethod::Read]);
    assert_eq!(right.called(), vec![VfsMethod::Write]);

    vfs.move_entry("left:///a.txt", "right:///b.txt", Origin::system())
        .await
        .unwrap();
    assert_eq!(
        left.called(),
        vec![VfsMethod::Read, VfsMethod::Read, VfsMethod::Unlink]
    );
    assert_eq!(
        vfs.read("right:///b.txt", Origin::system()).await.unwrap(),
        Bytes::from_static(b"payload")
    );
    assert!(!vfs.exists("left:///a.txt", Origin::system()).await.unwrap());
}

#[tokio::test]
async fn test_failed_request_emits_nothing() {
    let spy = SpyTransport::new();
    let (vfs, log) = vfs_with(vec![Mountpoint::new("a", spy)]);
    let (_, mut rx) = vfs.watch("a:///", WatchKind::Dir, Origin::system());

    let err = vfs.unlink("a:///missing.txt", Origin::system()).await.unwrap_err();
    assert!(matches!(err, VfsError::NotFound(_)));
    assert!(rx.try_recv().is_err());
    assert!(!log.names().iter().any(|n| n == "vfs:unlink"));
}

#[tokio::test]
async fn test_request_raw() {
    let spy = SpyTransport::new();
    let (vfs, _) = vfs_with(vec![Mountpoint::new("a", spy)]);

    let result = vfs
        .request_raw(
            "write",
            vec![json!("a:///b.txt"), json!("data:text/plain;base64,aGk=")],
            Origin::system(),
        )
        .await
        .unwrap();
    assert_eq!(result, Value::Bool(true));

    let data = vfs.read("a:///b.txt", Origin::system()).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"hi"));

    let err = vfs
        .request_raw("chmod", vec![json!("a:///b.txt")], Origin::system())
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::UnsupportedMethod(_)));

    let err = vfs
        .request_raw("write", vec![json!("a:///b.txt")], Origin::system())
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_missing_capability_is_unavailable() {
    let spy = SpyTransport::new();
    let (vfs, _) = vfs_with(vec![Mountpoint::new("a", spy)]);
    let err = vfs.url("a:///b.txt", Origin::system()).await.unwrap_err();
    assert!(matches!(err, VfsError::Unavailable(_)));
    assert!(err.to_string().starts_with("Not available"));
}

#[tokio::test]
async fn test_mount_messages() {
    let (vfs, log) = vfs_with(vec![Mountpoint::new("a", SpyTransport::new())]);
    vfs.unmount("a").unwrap();
    assert_eq!(log.names(), vec!["vfs:mount", "vfs:unmount"]);
    assert!(matches!(vfs.unmount("a"), Err(VfsError::NotMounted(_))));
}
