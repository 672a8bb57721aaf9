/*!
 * Kernel Boot Tests
 * Configuration, mounts, sessions and file opening end to end
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

use webtop_kernel::auth::{AuthError, Credentials, HandlerRegistry};
use webtop_kernel::config::{KernelConfig, MountConfig, TransportKind};
use webtop_kernel::connection::{Connection, FetchMethod};
use webtop_kernel::core::Origin;
use webtop_kernel::packages::{PackageMetadata, PackageRegistry};
use webtop_kernel::process::{
    Application, Destroyable, InitContext, Initializable, Message, MessageReceiver,
    ProcessResult, WindowSpec,
};
use webtop_kernel::vfs::{MountFilter, VfsResult, WatchKind};
use webtop_kernel::{Kernel, KernelError, VfsError};

struct Offline;

#[async_trait]
impl Connection for Offline {
    async fn request(&self, method: &str, _args: Vec<Value>) -> VfsResult<Value> {
        Err(VfsError::Transport(format!("offline: {}", method)))
    }

    async fn fetch(&self, url: &str, _method: FetchMethod) -> VfsResult<Bytes> {
        Err(VfsError::Transport(format!("offline: {}", url)))
    }
}

struct Viewer {
    inbox: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl Initializable for Viewer {
    async fn init(&self, ctx: &mut InitContext) -> ProcessResult<()> {
        ctx.add_window(WindowSpec::new("main", "Viewer"));
        Ok(())
    }
}

impl Destroyable for Viewer {}

impl MessageReceiver for Viewer {
    fn on_message(&self, message: &Message) {
        self.inbox.lock().push(message.clone());
    }
}

fn boot(config: KernelConfig) -> (Kernel, Arc<Mutex<Vec<Message>>>) {
    let inbox = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&inbox);
    let packages = Arc::new(PackageRegistry::new());
    packages.register(
        PackageMetadata::new("Viewer", "Viewer").with_mime(&["text/plain", "image/*"]),
        Arc::new(move || {
            Arc::new(Viewer {
                inbox: Arc::clone(&shared),
            }) as Arc<dyn Application>
        }),
    );

    let kernel = Kernel::builder(config)
        .with_connection(Arc::new(Offline))
        .with_packages(packages)
        .build()
        .unwrap();
    (kernel, inbox)
}

#[tokio::test]
async fn test_local_storage_persists_across_boots() {
    let dir = TempDir::new().unwrap();
    let mut config = KernelConfig::default();
    config.vfs.storage_path = Some(dir.path().join("storage.json"));

    {
        let (kernel, _) = boot(config.clone());
        kernel
            .vfs()
            .write("local:///todo.txt", "water plants", Origin::system())
            .await
            .unwrap();
        kernel.shutdown();
    }

    let (kernel, _) = boot(config);
    let data = kernel
        .vfs()
        .read("local:///todo.txt", Origin::system())
        .await
        .unwrap();
    assert_eq!(data, Bytes::from_static(b"water plants"));
}

#[tokio::test]
async fn test_vfs_changes_reach_processes() {
    let (kernel, inbox) = boot(KernelConfig::default());
    let pid = kernel.processes().launch("Viewer", json!({})).await.unwrap();
    let window = kernel.processes().get(pid).unwrap().windows[0].id;

    // Changes made by the process itself are not echoed back
    kernel
        .vfs()
        .write("local:///mine.txt", "x", Origin::window(pid, window))
        .await
        .unwrap();
    assert!(inbox.lock().is_empty());

    kernel
        .vfs()
        .write("local:///theirs.txt", "x", Origin::system())
        .await
        .unwrap();
    let received = inbox.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].name, "vfs:write");
    assert_eq!(received[0].payload, json!("local:///theirs.txt"));
}

#[tokio::test]
async fn test_closed_window_stops_watching() {
    let (kernel, _) = boot(KernelConfig::default());
    let processes = kernel.processes();
    let pid = processes.launch("Viewer", json!({})).await.unwrap();
    let main = processes.get(pid).unwrap().windows[0].id;
    let second = processes
        .add_window(pid, WindowSpec::new("second", "Viewer"))
        .unwrap();

    let (_, mut main_rx) = kernel
        .vfs()
        .watch("local:///", WatchKind::Dir, Origin::window(pid, main));
    let (_, mut second_rx) = kernel
        .vfs()
        .watch("local:///", WatchKind::Dir, Origin::window(pid, second));

    assert!(!processes.destroy_window(pid, second).unwrap());
    kernel
        .vfs()
        .write("local:///x.txt", "x", Origin::system())
        .await
        .unwrap();
    assert!(second_rx.try_recv().is_err());
    assert!(main_rx.try_recv().is_ok());

    processes.kill(pid).unwrap();
    assert_eq!(kernel.vfs().watches().watch_count(), 0);
    kernel
        .vfs()
        .write("local:///y.txt", "y", Origin::system())
        .await
        .unwrap();
    assert!(main_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_open_passes_file_to_application() {
    let (kernel, _) = boot(KernelConfig::default());
    kernel
        .vfs()
        .write("local:///photo.png", vec![0x89, b'P', b'N', b'G'], Origin::system())
        .await
        .unwrap();
    let file = kernel
        .vfs()
        .fileinfo("local:///photo.png", Origin::system())
        .await
        .unwrap();

    let pid = kernel.open(&file, json!({"zoom": 2})).await.unwrap();
    let args = kernel.processes().get(pid).unwrap().args;
    assert_eq!(args["zoom"], 2);
    assert_eq!(args["file"]["mime"], "image/png");
}

#[tokio::test]
async fn test_session_round_trip() {
    let (kernel, _) = boot(KernelConfig::default());
    let response = kernel
        .login(&Credentials::new("demo", "demo"))
        .await
        .unwrap();
    assert_eq!(response.user_data.username, "demo");
    assert!(kernel.handlers().authenticator.check_session().await.is_ok());

    kernel.processes().launch("Viewer", json!({})).await.unwrap();
    kernel.logout().await.unwrap();
    assert_eq!(kernel.processes().count(), 0);
    assert_eq!(
        kernel.handlers().authenticator.check_session().await,
        Err(AuthError::NoSession)
    );
}

#[test]
fn test_unknown_handler_fails_boot() {
    let mut config = KernelConfig::default();
    config.auth.handler = "ldap".into();

    let result = Kernel::builder(config)
        .with_connection(Arc::new(Offline))
        .with_handlers(HandlerRegistry::with_defaults())
        .build();
    assert!(matches!(result, Err(KernelError::Auth(AuthError::UnknownHandler(_)))));
}

#[test]
fn test_boot_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "vfs": {{
                "mountpoints": [
                    {{"name": "Shared", "transport": "local", "searchable": true}},
                    {{"name": "Docs", "transport": "web", "base_url": "http://docs.local"}},
                    {{"name": "Old", "transport": "http", "enabled": false}}
                ]
            }},
            "packages": [{{"id": "Notes", "name": "Notes", "mime": "text/markdown"}}]
        }}"#
    )
    .unwrap();

    let config = KernelConfig::from_file(file.path()).unwrap();
    let (kernel, _) = boot(config);
    let mounts = kernel.vfs().mounts();

    assert!(mounts.get("shared").unwrap().options.searchable);
    assert!(mounts.get("docs").unwrap().options.read_only);
    assert!(!mounts.is_mounted("old"));
    assert!(kernel.packages().get("Notes").is_some());

    let names: Vec<_> = mounts
        .list(MountFilter::default())
        .iter()
        .map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["shared", "docs"]);
}

#[test]
fn test_mount_config_builders() {
    let mount = MountConfig::new("Team Files", TransportKind::Http)
        .with_description("Team")
        .read_only();
    let mut config = KernelConfig::default();
    config.vfs.mountpoints = vec![mount];

    let (kernel, _) = boot(config);
    let team = kernel.vfs().mounts().get("team-files").unwrap();
    assert_eq!(team.root, "team-files:///");
    assert!(team.options.read_only);
    assert_eq!(team.options.description.as_deref(), Some("Team"));
}
