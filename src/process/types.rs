/*!
 * Process Types
 * Common types for process management
 */

use crate::core::serde::is_false;
use crate::core::types::{Pid, WindowId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

use super::window::WindowInfo;
use crate::packages::PackageMetadata;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(process::not_found),
        help("The process may have terminated or never existed. Check PID validity.")
    )]
    NotFound(Pid),

    #[error("Package not found: {0}")]
    #[diagnostic(
        code(process::package_not_found),
        help("The package is not installed, or it is blacklisted for this user.")
    )]
    PackageNotFound(String),

    #[error("Process {pid} failed to initialize: {reason}")]
    #[diagnostic(
        code(process::init_failed),
        help("The process stays in the initializing state. Kill it to discard the instance.")
    )]
    InitFailed { pid: Pid, reason: String },

    #[error("Process {pid} cannot {operation} while {state}")]
    #[diagnostic(
        code(process::invalid_state),
        help("Operation cannot be performed in current process state.")
    )]
    InvalidState {
        pid: Pid,
        state: ProcessState,
        operation: String,
    },

    #[error("Window {window} not found in process {pid}")]
    #[diagnostic(code(process::window_not_found))]
    WindowNotFound { pid: Pid, window: WindowId },

    /// Raised by application code
    #[error("{0}")]
    #[diagnostic(code(process::application))]
    Application(String),
}

/// Process state
///
/// `Created → Initializing → Running → Destroying → Destroyed`. A process
/// whose `init` failed stays `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Created,
    Initializing,
    Running,
    Destroying,
    Destroyed,
}

impl ProcessState {
    /// Whether moving to `next` is a legal transition
    pub const fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Created, Initializing)
                | (Initializing, Running)
                | (Created, Destroying)
                | (Initializing, Destroying)
                | (Running, Destroying)
                | (Destroying, Destroyed)
        )
    }

    /// Whether windows can be attached
    pub const fn accepts_windows(self) -> bool {
        matches!(self, ProcessState::Initializing | ProcessState::Running)
    }

    pub const fn is_alive(self) -> bool {
        !matches!(self, ProcessState::Destroying | ProcessState::Destroyed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Created => "created",
            ProcessState::Initializing => "initializing",
            ProcessState::Running => "running",
            ProcessState::Destroying => "destroying",
            ProcessState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Per-process behaviour when windows close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Destroy the process when its main window closes
    pub close_with_main: bool,
    /// Destroy the process when its last window closes
    pub close_on_empty: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            close_with_main: true,
            close_on_empty: true,
        }
    }
}

/// Snapshot of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub args: Value,
    pub metadata: PackageMetadata,
    pub windows: Vec<WindowInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_window: Option<WindowId>,
    pub options: ProcessOptions,
    #[serde(with = "time::serde::rfc3339")]
    pub started: OffsetDateTime,
}

/// Well-known message names
pub mod messages {
    pub const ATTENTION: &str = "attention";
    pub const DESTROY_WINDOW: &str = "destroyWindow";
    pub const VFS_PREFIX: &str = "vfs:";
}

/// A message delivered to processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<Pid>,
}

impl Message {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            source: None,
        }
    }

    /// `vfs:*` messages
    pub fn is_vfs(&self) -> bool {
        self.name.starts_with(messages::VFS_PREFIX)
    }
}

/// Delivery options for `ProcessManager::message`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOptions {
    /// Skipped process (usually the sender)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<Pid>,
    /// Only processes with this name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filter: Option<String>,
}

/// Lifecycle notifications broadcast by the process manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    ProcessStarted { pid: Pid, name: String },
    ProcessDestroyed { pid: Pid, name: String },
    WindowAdded { pid: Pid, window: WindowId },
    WindowDestroyed { pid: Pid, window: WindowId },
    StateChanged {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
        #[serde(skip_serializing_if = "is_false", default)]
        failed: bool,
    },
}
