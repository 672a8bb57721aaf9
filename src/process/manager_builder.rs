/*!
 * Process Manager Builder
 * Builder pattern for ProcessManager construction
 */

use super::manager::ProcessManager;
use crate::core::limits::LIFECYCLE_EVENT_CAPACITY;
use crate::packages::PackageRegistry;
use std::sync::Arc;
use tracing::info;

/// Builder for ProcessManager
pub struct ProcessManagerBuilder {
    packages: Option<Arc<PackageRegistry>>,
    event_capacity: usize,
}

impl ProcessManagerBuilder {
    pub fn new() -> Self {
        Self {
            packages: None,
            event_capacity: LIFECYCLE_EVENT_CAPACITY,
        }
    }

    /// Use a shared package registry
    pub fn with_packages(mut self, packages: Arc<PackageRegistry>) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Buffered lifecycle events per subscriber
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> ProcessManager {
        let packages = self.packages.unwrap_or_default();

        info!(
            packages = packages.len(),
            event_capacity = self.event_capacity,
            "Process manager initialized"
        );

        ProcessManager::from_parts(packages, self.event_capacity)
    }
}

impl Default for ProcessManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessManager {
    pub fn builder() -> ProcessManagerBuilder {
        ProcessManagerBuilder::new()
    }
}
