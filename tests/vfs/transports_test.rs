/*!
 * Transport Tests
 * Built-in transports exercised through the facade
 */

use bytes::Bytes;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

use webtop_kernel::core::Origin;
use webtop_kernel::packages::{PackageMetadata, PackageRegistry};
use webtop_kernel::vfs::transports::{
    ApplicationsTransport, JsonFileStore, KeyValueStore, LocalStorageTransport, MemoryStore,
};
use webtop_kernel::vfs::{
    FindQuery, MountOptions, MountRegistry, Mountpoint, ScandirOptions, Vfs, VfsError,
};

fn local_vfs(store: Arc<dyn KeyValueStore>) -> Vfs {
    let vfs = Vfs::new(MountRegistry::new());
    let mount = Mountpoint::new("local", Arc::new(LocalStorageTransport::new(store)))
        .with_options(MountOptions {
            searchable: true,
            ..MountOptions::default()
        });
    vfs.mount(mount).unwrap();
    vfs
}

#[tokio::test]
async fn test_applications_listing_is_stable() {
    let packages = Arc::new(PackageRegistry::new());
    packages.install(PackageMetadata::new("Writer", "Writer"));
    packages.install(PackageMetadata::new("Calculator", "Calculator"));
    let vfs = Vfs::new(MountRegistry::new());
    vfs.mount(ApplicationsTransport::mountpoint(packages)).unwrap();

    let first = vfs
        .scandir("applications:///", ScandirOptions::default(), Origin::system())
        .await
        .unwrap();
    let second = vfs
        .scandir("applications:///", ScandirOptions::default(), Origin::system())
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn test_search_spans_searchable_mounts() {
    let packages = Arc::new(PackageRegistry::new());
    packages.install(PackageMetadata::new("Writer", "Writer"));
    let vfs = local_vfs(Arc::new(MemoryStore::new()));
    vfs.mount(ApplicationsTransport::mountpoint(packages)).unwrap();

    let found = vfs
        .search(
            FindQuery {
                query: "writ".into(),
                ..FindQuery::default()
            },
            Origin::system(),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, "applications:///Writer");
}

#[tokio::test]
async fn test_local_storage_tree() {
    let vfs = local_vfs(Arc::new(MemoryStore::new()));
    let origin = Origin::system();

    vfs.mkdir("local:///docs", origin).await.unwrap();
    vfs.write("local:///docs/a.txt", "alpha", origin).await.unwrap();
    vfs.copy("local:///docs", "local:///backup", origin).await.unwrap();
    vfs.move_entry("local:///docs/a.txt", "local:///b.txt", origin)
        .await
        .unwrap();

    let root = vfs
        .scandir("local:///", ScandirOptions::default(), origin)
        .await
        .unwrap();
    let names: Vec<_> = root.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["docs", "backup", "b.txt"]);

    assert_eq!(
        vfs.read("local:///backup/a.txt", origin).await.unwrap(),
        Bytes::from_static(b"alpha")
    );
    assert!(!vfs.exists("local:///docs/a.txt", origin).await.unwrap());
    assert!(matches!(
        vfs.write("local:///missing/a.txt", "x", origin).await,
        Err(VfsError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_local_storage_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.json");

    {
        let store = Arc::new(JsonFileStore::open(&path).unwrap());
        let vfs = local_vfs(store);
        vfs.write("local:///note.txt", "kept", Origin::system())
            .await
            .unwrap();
    }

    let store = Arc::new(JsonFileStore::open(&path).unwrap());
    let vfs = local_vfs(store);
    assert_eq!(
        vfs.read("local:///note.txt", Origin::system()).await.unwrap(),
        Bytes::from_static(b"kept")
    );
}

#[tokio::test]
async fn test_local_storage_quota() {
    let transport = LocalStorageTransport::new(Arc::new(MemoryStore::new())).with_quota(64);
    let vfs = Vfs::new(MountRegistry::new());
    vfs.mount(Mountpoint::new("local", Arc::new(transport))).unwrap();

    let err = vfs
        .write("local:///big.bin", vec![0u8; 256], Origin::system())
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::QuotaExceeded { quota: 64, .. }));
    assert!(!vfs.exists("local:///big.bin", Origin::system()).await.unwrap());
    assert!(vfs
        .free_space("local:///", Origin::system())
        .await
        .unwrap()
        .is_some());
}
