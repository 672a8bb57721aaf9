/*!
 * Observable VFS - Watch Notifications
 * Path watches notified after mutating operations complete
 */

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

use super::types::VfsMethod;
use crate::core::traits::LifecycleObserver;
use crate::core::types::{Origin, Pid, WindowId};

/// Path(s) touched by a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WatchTarget {
    Path(String),
    Move { source: String, destination: String },
}

impl WatchTarget {
    /// Pick the target from positional path arguments of a completed request
    ///
    /// `move` carries both paths, `copy` its destination (index 1), every
    /// other method its first argument. `None` for non-mutating methods or
    /// missing arguments.
    pub fn from_args(method: VfsMethod, args: &[&str]) -> Option<Self> {
        if !method.is_mutating() {
            return None;
        }
        match method {
            VfsMethod::Move => Some(WatchTarget::Move {
                source: args.first()?.to_string(),
                destination: args.get(1)?.to_string(),
            }),
            VfsMethod::Copy => Some(WatchTarget::Path(args.get(1)?.to_string())),
            _ => Some(WatchTarget::Path(args.first()?.to_string())),
        }
    }

    /// Paths to test against watches, destination first
    pub fn paths(&self) -> Vec<&str> {
        match self {
            WatchTarget::Path(path) => vec![path.as_str()],
            WatchTarget::Move {
                source,
                destination,
            } => vec![destination.as_str(), source.as_str()],
        }
    }
}

/// A completed mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub method: VfsMethod,
    pub target: WatchTarget,
    pub origin: Origin,
}

impl WatchEvent {
    /// Message name forwarded to processes (`vfs:write`, ...)
    pub fn message_name(&self) -> String {
        format!("vfs:{}", self.method)
    }
}

/// How a watch matches paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    /// Everything below the path (prefix match)
    Dir,
    /// Exactly the path
    File,
}

impl WatchKind {
    #[inline]
    fn matches(self, watched: &str, path: &str) -> bool {
        match self {
            WatchKind::Dir => path.starts_with(watched),
            WatchKind::File => path == watched,
        }
    }
}

/// Handle returned by `watch`, used to unwatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchId(pub u64);

struct Subscriber {
    id: WatchId,
    path: String,
    kind: WatchKind,
    owner: Origin,
    sender: mpsc::UnboundedSender<WatchEvent>,
}

impl Subscriber {
    fn is_origin(&self, origin: &Origin) -> bool {
        origin.window.is_some() && self.owner == *origin
    }
}

/// Watch registry and event fan-out
///
/// Delivery happens synchronously inside `emit`, in registration order.
/// Subscribers whose receiver was dropped are removed silently.
#[derive(Clone)]
pub struct WatchHub {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
    // Unfiltered feed of every event, for observers that don't watch paths
    sender: Arc<broadcast::Sender<WatchEvent>>,
}

impl WatchHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            sender: Arc::new(sender),
        }
    }

    /// Watch a path; events arrive on the returned receiver
    pub fn watch(
        &self,
        path: impl Into<String>,
        kind: WatchKind,
        owner: Origin,
    ) -> (WatchId, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let path = path.into();

        trace!(id = id.0, path = %path, ?kind, %owner, "Watch added");
        self.subscribers.write().push(Subscriber {
            id,
            path,
            kind,
            owner,
            sender: tx,
        });
        (id, rx)
    }

    /// Remove a watch; returns whether it existed
    pub fn unwatch(&self, id: WatchId) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        before != subs.len()
    }

    /// Remove every watch owned by a process; returns how many were removed
    pub fn unwatch_process(&self, pid: Pid) -> usize {
        self.remove_where(|owner| owner.pid == Some(pid))
    }

    /// Remove every watch owned by one window of a process
    pub fn unwatch_window(&self, pid: Pid, window: WindowId) -> usize {
        self.remove_where(|owner| *owner == Origin::window(pid, window))
    }

    fn remove_where(&self, owned: impl Fn(&Origin) -> bool) -> usize {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|s| !owned(&s.owner));
        let removed = before - subs.len();
        if removed > 0 {
            trace!(removed, "Watches released with their owner");
        }
        removed
    }

    /// Deliver an event to every matching watch except the origin's own
    ///
    /// Returns the number of watches notified.
    pub fn emit(&self, event: &WatchEvent) -> usize {
        let _ = self.sender.send(event.clone());

        let paths = event.target.paths();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for sub in self.subscribers.read().iter() {
            if !paths.iter().any(|p| sub.kind.matches(&sub.path, p)) {
                continue;
            }
            if sub.is_origin(&event.origin) {
                continue;
            }
            if sub.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(sub.id);
            }
        }

        if !dead.is_empty() {
            trace!(count = dead.len(), "Dropping closed watches");
            self.subscribers.write().retain(|s| !dead.contains(&s.id));
        }
        delivered
    }

    /// Subscribe to every event regardless of path
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    pub fn watch_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl LifecycleObserver for WatchHub {
    fn window_closed(&self, pid: Pid, window: WindowId) {
        self.unwatch_window(pid, window);
    }

    fn process_exited(&self, pid: Pid) {
        self.unwatch_process(pid);
    }
}

impl Default for WatchHub {
    fn default() -> Self {
        Self::new(crate::core::limits::LIFECYCLE_EVENT_CAPACITY)
    }
}
