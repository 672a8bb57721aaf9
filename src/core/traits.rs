/*!
 * Core Traits
 * Seams shared between kernel subsystems
 */

use super::types::{Pid, WindowId};
use serde_json::Value;

/// Receiver of broadcast messages (`vfs:write`, `vfs:mount`, `attention`, ...)
///
/// The VFS forwards completed operations through this trait so it does not
/// depend on the process manager directly.
pub trait MessageSink: Send + Sync {
    /// Deliver `name` with `payload` to every process except `source`
    ///
    /// Returns the number of processes reached.
    fn broadcast(&self, name: &str, payload: Value, source: Option<Pid>) -> usize;
}

/// Sink that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn broadcast(&self, _name: &str, _payload: Value, _source: Option<Pid>) -> usize {
        0
    }
}

/// Notified synchronously when windows close and processes exit
///
/// Lets subsystems holding per-window state (watches) release it before
/// the next request can reach a closed window.
pub trait LifecycleObserver: Send + Sync {
    fn window_closed(&self, pid: Pid, window: WindowId);

    fn process_exited(&self, pid: Pid);
}
