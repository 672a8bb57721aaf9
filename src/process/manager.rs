/*!
 * Process Management
 * Handles application launch, window ownership, and lifecycle
 */

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::traits::{Application, InitContext};
use super::types::*;
use super::window::{WindowInfo, WindowSpec};
use crate::core::traits::{LifecycleObserver, MessageSink};
use crate::core::types::{Pid, WindowId};
use crate::monitoring::span_operation;
use crate::packages::{PackageMetadata, PackageRegistry, PackageType};

/// Internal process record
struct ProcessRecord {
    pid: Pid,
    name: String,
    args: Value,
    metadata: PackageMetadata,
    state: ProcessState,
    windows: Vec<WindowInfo>,
    main_window: Option<WindowId>,
    options: ProcessOptions,
    started: OffsetDateTime,
    /// `init` returned successfully
    initialized: bool,
    app: Arc<dyn Application>,
}

impl ProcessRecord {
    fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            name: self.name.clone(),
            state: self.state,
            args: self.args.clone(),
            metadata: self.metadata.clone(),
            windows: self.windows.clone(),
            main_window: self.main_window,
            options: self.options,
            started: self.started,
        }
    }
}

/// Tracks running applications and their windows
///
/// Application callbacks (`init`, `destroy`, `on_message`) are never invoked
/// while a process record is locked, so applications may call back into the
/// manager.
pub struct ProcessManager {
    processes: Arc<DashMap<Pid, ProcessRecord, RandomState>>,
    next_pid: AtomicU32,
    next_window: AtomicU32,
    packages: Arc<PackageRegistry>,
    events: broadcast::Sender<LifecycleEvent>,
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
}

impl ProcessManager {
    pub(super) fn from_parts(packages: Arc<PackageRegistry>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            processes: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_pid: AtomicU32::new(1),
            next_window: AtomicU32::new(1),
            packages,
            events,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn packages(&self) -> &Arc<PackageRegistry> {
        &self.packages
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Register an observer called inline when windows close and processes exit
    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.write().push(observer);
    }

    fn window_closed(&self, pid: Pid, window: WindowId) {
        for observer in self.observers.read().iter() {
            observer.window_closed(pid, window);
        }
        self.emit(LifecycleEvent::WindowDestroyed { pid, window });
    }

    fn transition(&self, pid: Pid, to: ProcessState) -> ProcessResult<ProcessState> {
        let from = {
            let mut record = self
                .processes
                .get_mut(&pid)
                .ok_or(ProcessError::NotFound(pid))?;
            let from = record.state;
            if !from.can_transition_to(to) {
                return Err(ProcessError::InvalidState {
                    pid,
                    state: from,
                    operation: format!("become {}", to),
                });
            }
            record.state = to;
            from
        };

        debug!(pid, %from, %to, "Process state changed");
        self.emit(LifecycleEvent::StateChanged {
            pid,
            from,
            to,
            failed: false,
        });
        Ok(from)
    }

    // =========================================================================
    // Launch
    // =========================================================================

    /// Launch a package by id
    ///
    /// A singular package that is already running gets an `attention`
    /// message with `args` and its pid is returned instead.
    pub async fn launch(&self, name: &str, args: Value) -> ProcessResult<Pid> {
        let span = span_operation("launch");

        let (metadata, factory) = self
            .packages
            .launchable(name)
            .ok_or_else(|| ProcessError::PackageNotFound(name.to_string()))?;

        if metadata.singular {
            if let Some(running) = self.find_by_name(name).into_iter().next() {
                info!(pid = running.pid, name, "Singular application already running");
                self.send(running.pid, &Message::new(messages::ATTENTION, args))?;
                span.record_result(true);
                return Ok(running.pid);
            }
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let app = factory();
        self.processes.insert(
            pid,
            ProcessRecord {
                pid,
                name: name.to_string(),
                args: args.clone(),
                metadata: metadata.clone(),
                state: ProcessState::Created,
                windows: Vec::new(),
                main_window: None,
                options: ProcessOptions::default(),
                started: OffsetDateTime::now_utc(),
                initialized: false,
                app: Arc::clone(&app),
            },
        );
        self.transition(pid, ProcessState::Initializing)?;
        info!(pid, name, "Launching application");

        let mut ctx = InitContext::new(pid, args, metadata.clone());
        if let Err(e) = app.init(&mut ctx).await {
            warn!(pid, name, error = %e, "Application init failed");
            span.record_error(&e.to_string());
            self.emit(LifecycleEvent::StateChanged {
                pid,
                from: ProcessState::Initializing,
                to: ProcessState::Initializing,
                failed: true,
            });
            return Err(ProcessError::InitFailed {
                pid,
                reason: e.to_string(),
            });
        }

        let (options, windows) = ctx.into_windows();
        {
            let mut record = self
                .processes
                .get_mut(&pid)
                .ok_or(ProcessError::NotFound(pid))?;
            record.options = options;
            record.initialized = true;
        }
        self.emit(LifecycleEvent::ProcessStarted {
            pid,
            name: name.to_string(),
        });

        for spec in windows {
            self.add_window(pid, spec)?;
        }

        // Services have no windows and run as soon as init succeeds
        if metadata.package_type == PackageType::Service
            && self.state(pid) == Some(ProcessState::Initializing)
        {
            self.transition(pid, ProcessState::Running)?;
        }

        span.record_result(true);
        Ok(pid)
    }

    // =========================================================================
    // Windows
    // =========================================================================

    /// Attach a window to a process
    ///
    /// The first window becomes the main window. An initialized process that
    /// had no window yet becomes `Running`.
    pub fn add_window(&self, pid: Pid, spec: WindowSpec) -> ProcessResult<WindowId> {
        let id = self.next_window.fetch_add(1, Ordering::SeqCst);

        let promote = {
            let mut record = self
                .processes
                .get_mut(&pid)
                .ok_or(ProcessError::NotFound(pid))?;
            if !record.state.accepts_windows() {
                return Err(ProcessError::InvalidState {
                    pid,
                    state: record.state,
                    operation: "add a window".into(),
                });
            }
            record.windows.push(WindowInfo::from_spec(id, spec));
            if record.main_window.is_none() {
                record.main_window = Some(id);
            }
            record.initialized && record.state == ProcessState::Initializing
        };

        debug!(pid, window = id, "Window added");
        self.emit(LifecycleEvent::WindowAdded { pid, window: id });

        if promote {
            self.transition(pid, ProcessState::Running)?;
        }
        Ok(id)
    }

    /// Close a window
    ///
    /// The owning process is told with a `destroyWindow` message. When the
    /// last window closes (`close_on_empty`) or the main window closes
    /// (`close_with_main`) the process is destroyed. Returns whether that
    /// happened.
    pub fn destroy_window(&self, pid: Pid, window: WindowId) -> ProcessResult<bool> {
        let (removed, close, app) = {
            let mut record = self
                .processes
                .get_mut(&pid)
                .ok_or(ProcessError::NotFound(pid))?;
            if !record.state.is_alive() {
                return Err(ProcessError::InvalidState {
                    pid,
                    state: record.state,
                    operation: "destroy a window".into(),
                });
            }
            let idx = record
                .windows
                .iter()
                .position(|w| w.id == window)
                .ok_or(ProcessError::WindowNotFound { pid, window })?;

            let removed = record.windows.remove(idx);
            let was_main = record.main_window == Some(window);
            let close = (record.options.close_on_empty && record.windows.is_empty())
                || (was_main && record.options.close_with_main);
            (removed, close, Arc::clone(&record.app))
        };

        debug!(pid, window, "Window destroyed");
        self.window_closed(pid, window);
        app.on_message(&Message::new(
            messages::DESTROY_WINDOW,
            json!({"id": removed.id, "name": removed.name}),
        ));

        if close {
            info!(pid, "Last or main window closed, destroying application");
            self.kill(pid)?;
        }
        Ok(close)
    }

    // =========================================================================
    // Termination
    // =========================================================================

    /// Destroy a process and all its windows
    pub fn kill(&self, pid: Pid) -> ProcessResult<()> {
        let span = span_operation("kill");
        self.transition(pid, ProcessState::Destroying)?;

        let (app, windows, name) = {
            let mut record = self
                .processes
                .get_mut(&pid)
                .ok_or(ProcessError::NotFound(pid))?;
            let windows: Vec<WindowId> = record.windows.drain(..).map(|w| w.id).collect();
            (Arc::clone(&record.app), windows, record.name.clone())
        };

        for window in windows {
            self.window_closed(pid, window);
        }
        app.destroy();

        self.transition(pid, ProcessState::Destroyed)?;
        self.processes.remove(&pid);

        info!(pid, name = %name, "Process destroyed");
        for observer in self.observers.read().iter() {
            observer.process_exited(pid);
        }
        self.emit(LifecycleEvent::ProcessDestroyed { pid, name });
        span.record_result(true);
        Ok(())
    }

    /// Kill every process, or every process with the given name
    ///
    /// Returns the number of processes destroyed.
    pub fn kill_all(&self, name: Option<&str>) -> usize {
        let mut pids: Vec<Pid> = self
            .processes
            .iter()
            .filter(|r| r.state.is_alive())
            .filter(|r| name.map_or(true, |n| r.name == n))
            .map(|r| r.pid)
            .collect();
        pids.sort_unstable();

        pids.into_iter()
            .filter(|pid| match self.kill(*pid) {
                Ok(()) => true,
                Err(e) => {
                    warn!(pid, error = %e, "Failed to kill process");
                    false
                }
            })
            .count()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, pid: Pid) -> Option<ProcessInfo> {
        self.processes.get(&pid).map(|r| r.info())
    }

    pub fn state(&self, pid: Pid) -> Option<ProcessState> {
        self.processes.get(&pid).map(|r| r.state)
    }

    /// Live processes with a name, oldest first
    pub fn find_by_name(&self, name: &str) -> Vec<ProcessInfo> {
        let mut found: Vec<ProcessInfo> = self
            .processes
            .iter()
            .filter(|r| r.name == name && r.state.is_alive())
            .map(|r| r.info())
            .collect();
        found.sort_by_key(|p| p.pid);
        found
    }

    /// All processes ordered by pid
    pub fn list(&self) -> Vec<ProcessInfo> {
        let mut list: Vec<ProcessInfo> = self.processes.iter().map(|r| r.info()).collect();
        list.sort_by_key(|p| p.pid);
        list
    }

    pub fn count(&self) -> usize {
        self.processes.len()
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Deliver a message to one process
    pub fn send(&self, pid: Pid, message: &Message) -> ProcessResult<()> {
        let app = self
            .processes
            .get(&pid)
            .filter(|r| r.state.is_alive())
            .map(|r| Arc::clone(&r.app))
            .ok_or(ProcessError::NotFound(pid))?;
        app.on_message(message);
        Ok(())
    }

    /// Deliver a message to every live process except `opts.source`
    ///
    /// Returns the number of processes reached.
    pub fn message(&self, message: &Message, opts: &MessageOptions) -> usize {
        let mut targets: Vec<(Pid, Arc<dyn Application>)> = self
            .processes
            .iter()
            .filter(|r| r.state.is_alive())
            .filter(|r| opts.source != Some(r.pid))
            .filter(|r| opts.filter.as_ref().map_or(true, |f| &r.name == f))
            .map(|r| (r.pid, Arc::clone(&r.app)))
            .collect();
        targets.sort_by_key(|(pid, _)| *pid);

        debug!(name = %message.name, count = targets.len(), "Broadcasting message");
        for (_, app) in &targets {
            app.on_message(message);
        }
        targets.len()
    }
}

impl MessageSink for ProcessManager {
    fn broadcast(&self, name: &str, payload: Value, source: Option<Pid>) -> usize {
        let message = Message {
            name: name.to_string(),
            payload,
            source,
        };
        self.message(
            &message,
            &MessageOptions {
                source,
                filter: None,
            },
        )
    }
}
