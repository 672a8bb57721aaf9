/*!
 * Process Lifecycle Tests
 * Launch, window ownership, and destruction
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use webtop_kernel::core::{LifecycleObserver, Pid, WindowId};

use webtop_kernel::packages::{PackageMetadata, PackageType};
use webtop_kernel::process::{
    messages, LifecycleEvent, ProcessError, ProcessOptions, ProcessState, WindowSpec,
};

use crate::support::{install, manager, RecorderSpec};

#[tokio::test]
async fn test_launch_runs_with_main_window() {
    let (pm, packages) = manager();
    install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());
    let mut events = pm.subscribe();

    let pid = pm.launch("Writer", json!({"file": null})).await.unwrap();
    let info = pm.get(pid).unwrap();
    assert_eq!(info.state, ProcessState::Running);
    assert_eq!(info.windows.len(), 1);
    assert_eq!(info.main_window, Some(info.windows[0].id));
    assert_eq!(info.args, json!({"file": null}));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            LifecycleEvent::StateChanged {
                pid,
                from: ProcessState::Created,
                to: ProcessState::Initializing,
                failed: false,
            },
            LifecycleEvent::ProcessStarted {
                pid,
                name: "Writer".into(),
            },
            LifecycleEvent::WindowAdded {
                pid,
                window: info.windows[0].id,
            },
            LifecycleEvent::StateChanged {
                pid,
                from: ProcessState::Initializing,
                to: ProcessState::Running,
                failed: false,
            },
        ]
    );
}

#[tokio::test]
async fn test_unknown_and_blacklisted_packages() {
    let (pm, packages) = manager();
    install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());
    packages.install(PackageMetadata::new("Manifest", "No factory"));

    assert_eq!(
        pm.launch("Nope", json!({})).await.unwrap_err(),
        ProcessError::PackageNotFound("Nope".into())
    );
    assert!(pm.launch("Manifest", json!({})).await.is_err());

    packages.set_blacklist(vec!["Writer".to_string()]);
    assert!(matches!(
        pm.launch("Writer", json!({})).await,
        Err(ProcessError::PackageNotFound(_))
    ));
    assert_eq!(pm.count(), 0);
}

#[tokio::test]
async fn test_group_restricted_package() {
    let (pm, packages) = manager();
    install(
        &packages,
        PackageMetadata::new("Admin", "Admin").with_groups(&["admin"]),
        RecorderSpec::default(),
    );
    assert!(pm.launch("Admin", json!({})).await.is_err());

    packages.set_user_groups(vec!["admin".to_string()]);
    assert!(pm.launch("Admin", json!({})).await.is_ok());
}

#[tokio::test]
async fn test_singular_relaunch_sends_attention() {
    let (pm, packages) = manager();
    let log = install(
        &packages,
        PackageMetadata::new("Settings", "Settings").singular(),
        RecorderSpec::default(),
    );

    let first = pm.launch("Settings", json!({})).await.unwrap();
    let second = pm.launch("Settings", json!({"tab": "theme"})).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(pm.count(), 1);
    let received = log.messages.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].name, messages::ATTENTION);
    assert_eq!(received[0].payload, json!({"tab": "theme"}));
}

#[tokio::test]
async fn test_failed_init_stays_initializing() {
    let (pm, packages) = manager();
    let log = install(
        &packages,
        PackageMetadata::new("Broken", "Broken"),
        RecorderSpec {
            fail: true,
            ..RecorderSpec::default()
        },
    );
    let mut events = pm.subscribe();

    let err = pm.launch("Broken", json!({})).await.unwrap_err();
    let (pid, reason) = match err {
        ProcessError::InitFailed { pid, reason } => (pid, reason),
        other => panic!("expected InitFailed, got {:?}", other),
    };
    assert!(reason.contains("refused"));
    assert_eq!(pm.state(pid), Some(ProcessState::Initializing));

    let failed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e, LifecycleEvent::StateChanged { failed: true, .. }));
    assert!(failed);

    // The broken instance can still be discarded
    pm.kill(pid).unwrap();
    assert_eq!(pm.count(), 0);
    assert_eq!(log.destroy_count(), 1);
}

#[tokio::test]
async fn test_service_runs_without_windows() {
    let (pm, packages) = manager();
    install(
        &packages,
        PackageMetadata::new("Sync", "Sync").with_type(PackageType::Service),
        RecorderSpec {
            windows: 0,
            ..RecorderSpec::default()
        },
    );

    let pid = pm.launch("Sync", json!({})).await.unwrap();
    assert_eq!(pm.state(pid), Some(ProcessState::Running));
    assert!(pm.get(pid).unwrap().windows.is_empty());
}

#[tokio::test]
async fn test_windowless_application_waits_for_window() {
    let (pm, packages) = manager();
    install(
        &packages,
        PackageMetadata::new("Lazy", "Lazy"),
        RecorderSpec {
            windows: 0,
            ..RecorderSpec::default()
        },
    );

    let pid = pm.launch("Lazy", json!({})).await.unwrap();
    assert_eq!(pm.state(pid), Some(ProcessState::Initializing));

    let window = pm.add_window(pid, WindowSpec::new("main", "Lazy")).unwrap();
    assert_eq!(pm.state(pid), Some(ProcessState::Running));
    assert_eq!(pm.get(pid).unwrap().main_window, Some(window));
}

#[tokio::test]
async fn test_closing_last_window_destroys_process() {
    let (pm, packages) = manager();
    let log = install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());

    let pid = pm.launch("Writer", json!({})).await.unwrap();
    let window = pm.get(pid).unwrap().windows[0].id;

    assert!(pm.destroy_window(pid, window).unwrap());
    assert!(pm.get(pid).is_none());
    assert_eq!(log.names(), vec![messages::DESTROY_WINDOW]);
    assert_eq!(log.destroy_count(), 1);
}

#[tokio::test]
async fn test_closing_main_window() {
    let (pm, packages) = manager();
    install(
        &packages,
        PackageMetadata::new("Two", "Two"),
        RecorderSpec {
            windows: 2,
            ..RecorderSpec::default()
        },
    );
    install(
        &packages,
        PackageMetadata::new("Keep", "Keep"),
        RecorderSpec {
            windows: 2,
            options: ProcessOptions {
                close_with_main: false,
                close_on_empty: true,
            },
            ..RecorderSpec::default()
        },
    );

    let two = pm.launch("Two", json!({})).await.unwrap();
    let main = pm.get(two).unwrap().main_window.unwrap();
    assert!(pm.destroy_window(two, main).unwrap());
    assert!(pm.get(two).is_none());

    let keep = pm.launch("Keep", json!({})).await.unwrap();
    let windows: Vec<_> = pm.get(keep).unwrap().windows.iter().map(|w| w.id).collect();
    assert!(!pm.destroy_window(keep, windows[0]).unwrap());
    assert_eq!(pm.state(keep), Some(ProcessState::Running));
    assert!(pm.destroy_window(keep, windows[1]).unwrap());
    assert!(pm.get(keep).is_none());
}

/// Records observer callbacks in call order
#[derive(Default)]
struct Closures {
    seen: Mutex<Vec<String>>,
}

impl LifecycleObserver for Closures {
    fn window_closed(&self, pid: Pid, window: WindowId) {
        self.seen.lock().push(format!("window {}:{}", pid, window));
    }

    fn process_exited(&self, pid: Pid) {
        self.seen.lock().push(format!("process {}", pid));
    }
}

#[tokio::test]
async fn test_observers_see_closed_windows_before_exit() {
    let (pm, packages) = manager();
    install(
        &packages,
        PackageMetadata::new("Two", "Two"),
        RecorderSpec {
            windows: 2,
            options: ProcessOptions {
                close_with_main: false,
                close_on_empty: true,
            },
            ..RecorderSpec::default()
        },
    );
    let closures = Arc::new(Closures::default());
    pm.add_observer(closures.clone());

    let pid = pm.launch("Two", json!({})).await.unwrap();
    let windows: Vec<_> = pm.get(pid).unwrap().windows.iter().map(|w| w.id).collect();

    assert!(!pm.destroy_window(pid, windows[1]).unwrap());
    assert_eq!(
        *closures.seen.lock(),
        vec![format!("window {}:{}", pid, windows[1])]
    );

    pm.kill(pid).unwrap();
    assert_eq!(
        *closures.seen.lock(),
        vec![
            format!("window {}:{}", pid, windows[1]),
            format!("window {}:{}", pid, windows[0]),
            format!("process {}", pid),
        ]
    );
}

#[tokio::test]
async fn test_unknown_window() {
    let (pm, packages) = manager();
    install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());
    let pid = pm.launch("Writer", json!({})).await.unwrap();

    assert_eq!(
        pm.destroy_window(pid, 999).unwrap_err(),
        ProcessError::WindowNotFound { pid, window: 999 }
    );
    assert_eq!(
        pm.destroy_window(pid + 100, 1).unwrap_err(),
        ProcessError::NotFound(pid + 100)
    );
}

#[tokio::test]
async fn test_kill_all_by_name() {
    let (pm, packages) = manager();
    let writer = install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());
    install(&packages, PackageMetadata::new("Clock", "Clock"), RecorderSpec::default());

    pm.launch("Writer", json!({})).await.unwrap();
    pm.launch("Writer", json!({})).await.unwrap();
    let clock = pm.launch("Clock", json!({})).await.unwrap();

    assert_eq!(pm.find_by_name("Writer").len(), 2);
    assert_eq!(pm.kill_all(Some("Writer")), 2);
    assert_eq!(writer.destroy_count(), 2);
    assert_eq!(pm.list().iter().map(|p| p.pid).collect::<Vec<_>>(), vec![clock]);

    assert_eq!(pm.kill_all(None), 1);
    assert_eq!(pm.count(), 0);
}

#[tokio::test]
async fn test_kill_twice() {
    let (pm, packages) = manager();
    install(&packages, PackageMetadata::new("Writer", "Writer"), RecorderSpec::default());
    let pid = pm.launch("Writer", json!({})).await.unwrap();

    pm.kill(pid).unwrap();
    assert_eq!(pm.kill(pid).unwrap_err(), ProcessError::NotFound(pid));
}
