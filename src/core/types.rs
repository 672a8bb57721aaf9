/*!
 * Core Types
 * Common types used across the kernel
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// Window ID type (unique across all processes)
pub type WindowId = u32;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// The window (and owning process) a request or message came from
///
/// Used to keep a window from being notified about its own changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pid: Option<Pid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub window: Option<WindowId>,
}

impl Origin {
    /// Request issued by the system itself (no process, no window)
    pub const fn system() -> Self {
        Self {
            pid: None,
            window: None,
        }
    }

    /// Request issued by a process without a specific window
    pub const fn process(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            window: None,
        }
    }

    /// Request issued from a window of a process
    pub const fn window(pid: Pid, window: WindowId) -> Self {
        Self {
            pid: Some(pid),
            window: Some(window),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pid, self.window) {
            (Some(pid), Some(wid)) => write!(f, "pid {} window {}", pid, wid),
            (Some(pid), None) => write!(f, "pid {}", pid),
            (None, Some(wid)) => write!(f, "window {}", wid),
            (None, None) => write!(f, "system"),
        }
    }
}
