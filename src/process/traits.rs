/*!
 * Process Traits
 * Capabilities an application implements
 */

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::types::*;
use super::window::WindowSpec;
use crate::core::types::Pid;
use crate::packages::PackageMetadata;

/// Everything an application sees while it initializes
#[derive(Debug)]
pub struct InitContext {
    pub pid: Pid,
    pub args: Value,
    pub metadata: PackageMetadata,
    pub options: ProcessOptions,
    windows: Vec<WindowSpec>,
}

impl InitContext {
    pub(crate) fn new(pid: Pid, args: Value, metadata: PackageMetadata) -> Self {
        Self {
            pid,
            args,
            metadata,
            options: ProcessOptions::default(),
            windows: Vec::new(),
        }
    }

    /// Open a window; it is attached once `init` returns successfully.
    /// The first window opened becomes the main window.
    pub fn add_window(&mut self, spec: WindowSpec) {
        self.windows.push(spec);
    }

    pub(crate) fn into_windows(self) -> (ProcessOptions, Vec<WindowSpec>) {
        (self.options, self.windows)
    }
}

/// Runs once after the process is created
#[async_trait]
pub trait Initializable: Send + Sync {
    async fn init(&self, ctx: &mut InitContext) -> ProcessResult<()>;
}

/// Runs once while the process is being destroyed
pub trait Destroyable: Send + Sync {
    fn destroy(&self) {}
}

/// Receives broadcast and lifecycle messages
pub trait MessageReceiver: Send + Sync {
    fn on_message(&self, message: &Message) {
        let _ = message;
    }
}

/// A launchable application
pub trait Application: Initializable + Destroyable + MessageReceiver {}

impl<T> Application for T where T: Initializable + Destroyable + MessageReceiver {}

/// Creates a fresh application instance per launch
pub type ApplicationFactory = Arc<dyn Fn() -> Arc<dyn Application> + Send + Sync>;
