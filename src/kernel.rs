/*!
 * Kernel Context
 * The process-wide context built once at boot
 */

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{Credentials, HandlerRegistry, Handlers, LoginResponse};
use crate::config::{KernelConfig, MountConfig, TransportKind};
use crate::connection::{Connection, HttpConnection};
use crate::core::limits::APPLICATION_MIME;
use crate::core::traits::MessageSink;
use crate::core::types::{KernelResult, Pid};
use crate::packages::PackageRegistry;
use crate::process::{ProcessError, ProcessManager};
use crate::vfs::mount::{MountOptions, MountRegistry, Mountpoint};
use crate::vfs::paths;
use crate::vfs::transports::{
    ApplicationsTransport, HttpTransport, JsonFileStore, KeyValueStore, LocalStorageTransport,
    MemoryStore, WebTransport,
};
use crate::vfs::{FileMetadata, RequestHooks, Vfs, VfsError, VfsResult};

/// Everything a running desktop shares
///
/// Built by [`KernelBuilder`]; cheap to share behind an `Arc`.
pub struct Kernel {
    config: KernelConfig,
    packages: Arc<PackageRegistry>,
    processes: Arc<ProcessManager>,
    vfs: Vfs,
    handlers: Handlers,
}

impl Kernel {
    pub fn builder(config: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn packages(&self) -> &Arc<PackageRegistry> {
        &self.packages
    }

    pub fn processes(&self) -> &Arc<ProcessManager> {
        &self.processes
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Log in and apply the user's package blacklist and groups
    pub async fn login(&self, credentials: &Credentials) -> KernelResult<LoginResponse> {
        let response = self.handlers.authenticator.login(credentials).await?;

        self.packages
            .set_blacklist(response.blacklisted_packages.iter().cloned());
        self.packages
            .set_user_groups(response.user_data.groups.iter().cloned());

        info!(
            user = %response.user_data.username,
            blacklisted = response.blacklisted_packages.len(),
            "User logged in"
        );
        Ok(response)
    }

    /// Log out and stop every process
    pub async fn logout(&self) -> KernelResult<()> {
        self.handlers.authenticator.logout().await?;
        let killed = self.processes.kill_all(None);
        self.packages.set_blacklist(Vec::new());
        self.packages.set_user_groups(Vec::new());
        info!(killed, "User logged out");
        Ok(())
    }

    // =========================================================================
    // Launching
    // =========================================================================

    /// Open a file with the application that handles it
    ///
    /// Application entries (`applications:///<id>`) launch the package
    /// itself. Other files launch the first package accepting their mime,
    /// with the file passed as `args.file`.
    pub async fn open(&self, file: &FileMetadata, args: Value) -> KernelResult<Pid> {
        if file.mime.as_deref() == Some(APPLICATION_MIME) {
            let id = paths::basename(&file.path);
            return Ok(self.processes.launch(&id, args).await?);
        }

        let mime = file
            .mime
            .clone()
            .unwrap_or_else(|| paths::guess_mime(&file.path).to_string());
        let candidates = self.packages.by_mime(&mime);
        let Some(id) = candidates.first() else {
            return Err(ProcessError::PackageNotFound(format!(
                "no application opens {}",
                mime
            ))
            .into());
        };

        let mut args = match args {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        args.insert("file".into(), serde_json::to_value(file).unwrap_or(Value::Null));

        info!(path = %file.path, mime = %mime, package = %id, "Opening file");
        Ok(self.processes.launch(id, Value::Object(args)).await?)
    }

    /// Stop every process
    pub fn shutdown(&self) -> usize {
        let killed = self.processes.kill_all(None);
        info!(killed, "Kernel shut down");
        killed
    }
}

/// Builder wiring packages, processes, VFS and handlers together
pub struct KernelBuilder {
    config: KernelConfig,
    connection: Option<Arc<dyn Connection>>,
    handlers: HandlerRegistry,
    packages: Option<Arc<PackageRegistry>>,
    store: Option<Arc<dyn KeyValueStore>>,
    hooks: Vec<Arc<dyn RequestHooks>>,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            connection: None,
            handlers: HandlerRegistry::default(),
            packages: None,
            store: None,
            hooks: Vec::new(),
        }
    }

    /// Replace the reqwest connection (tests, alternative servers)
    pub fn with_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Use a registry that already holds application factories
    pub fn with_packages(mut self, packages: Arc<PackageRegistry>) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Store behind local storage mounts, instead of `vfs.storage_path`
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RequestHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn build(self) -> KernelResult<Kernel> {
        let config = self.config;
        config.validate()?;

        let packages = self.packages.unwrap_or_default();
        for package in &config.packages {
            packages.install(package.clone());
        }

        let processes = Arc::new(ProcessManager::builder().with_packages(packages.clone()).build());
        let handlers = self
            .handlers
            .create(&config.auth.handler, &config.storage.handler)?;

        let connection: Arc<dyn Connection> = match self.connection {
            Some(connection) => connection,
            None => Arc::new(HttpConnection::new(&config.connection.url)?),
        };

        let sink: Arc<dyn MessageSink> = processes.clone();
        let mut vfs = Vfs::new(MountRegistry::new()).with_message_sink(sink);
        for hooks in self.hooks {
            vfs = vfs.with_hooks(hooks);
        }
        processes.add_observer(Arc::new(vfs.watches().clone()));

        vfs.mount(ApplicationsTransport::mountpoint(packages.clone()))?;

        let mut store = self.store;
        for mount in config.vfs.mountpoints.iter().filter(|m| m.enabled) {
            let built = build_mountpoint(mount, &config, &connection, &mut store)
                .and_then(|mountpoint| vfs.mount(mountpoint));
            if let Err(e) = built {
                warn!(mount = %mount.name, error = %e, "Skipping mountpoint");
            }
        }

        info!(
            mounts = vfs.mounts().len(),
            packages = packages.len(),
            authenticator = handlers.authenticator.name(),
            "Kernel initialized"
        );

        Ok(Kernel {
            config,
            packages,
            processes,
            vfs,
            handlers,
        })
    }
}

/// Turn one configuration entry into a mountpoint
fn build_mountpoint(
    mount: &MountConfig,
    config: &KernelConfig,
    connection: &Arc<dyn Connection>,
    store: &mut Option<Arc<dyn KeyValueStore>>,
) -> VfsResult<Mountpoint> {
    let pattern = match &mount.pattern {
        Some(p) => Some(
            regex_lite::Regex::new(p)
                .map_err(|e| VfsError::InvalidArgument(format!("pattern: {}", e)))?,
        ),
        None => None,
    };

    let mountpoint = match mount.transport {
        TransportKind::Http => {
            let transport = HttpTransport::new(connection.clone(), &config.connection.fs_uri)
                .with_max_upload_size(config.vfs.max_upload_size);
            Mountpoint::new(&mount.name, Arc::new(transport))
        }
        TransportKind::LocalStorage => {
            let store = match store {
                Some(store) => store.clone(),
                None => {
                    let opened: Arc<dyn KeyValueStore> = match &config.vfs.storage_path {
                        Some(path) => Arc::new(JsonFileStore::open(path)?),
                        None => Arc::new(MemoryStore::new()),
                    };
                    *store = Some(opened.clone());
                    opened
                }
            };
            let namespace = format!("webtop/vfs/{}", crate::vfs::mount::mount_name(&mount.name));
            let transport = LocalStorageTransport::with_namespace(store, namespace);
            Mountpoint::new(&mount.name, Arc::new(transport))
        }
        TransportKind::Web => match &mount.base_url {
            Some(base) => Mountpoint::new(
                &mount.name,
                Arc::new(WebTransport::with_base(connection.clone(), base)),
            ),
            None => {
                let mut mountpoint = WebTransport::mountpoint(connection.clone())?;
                mountpoint.name = crate::vfs::mount::mount_name(&mount.name);
                mountpoint
            }
        },
    };

    let defaults = mountpoint.options.clone();
    let mut mountpoint = mountpoint.with_options(MountOptions {
        // web mounts are read-only whatever the configuration says
        read_only: mount.read_only || mount.transport == TransportKind::Web,
        searchable: mount.searchable,
        special: defaults.special,
        visible: mount.visible,
        enabled: mount.enabled,
        dynamic: false,
        pattern: pattern.or(defaults.pattern),
        description: mount.description.clone().or(defaults.description),
    });
    if let Some(root) = &mount.root {
        mountpoint = mountpoint.with_root(root.clone());
    }
    Ok(mountpoint)
}
