/*!
 * Kernel Configuration
 * JSON configuration with environment overrides
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::limits::{DEFAULT_FS_URI, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_SERVER_URL};
use crate::core::serde::{default_true, is_false};
use crate::packages::PackageMetadata;

/// Path of the JSON configuration file
pub const ENV_CONFIG: &str = "WEBTOP_CONFIG";
/// Overrides `connection.url`
pub const ENV_SERVER_URL: &str = "WEBTOP_SERVER_URL";
/// Overrides `vfs.storage_path`
pub const ENV_STORAGE_PATH: &str = "WEBTOP_STORAGE_PATH";

/// Configuration result
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read {path}: {reason}")]
    #[diagnostic(
        code(config::read_failed),
        help("Check that WEBTOP_CONFIG points to a readable file.")
    )]
    Read { path: PathBuf, reason: String },

    #[error("Cannot parse {path}: {reason}")]
    #[diagnostic(code(config::parse_failed), help("The file must be a JSON object."))]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(config::invalid))]
    Invalid(String),
}

/// Server endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// API endpoint receiving `{method, args}` requests
    pub url: String,
    /// Base URL files are served from
    pub fs_uri: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            fs_uri: DEFAULT_FS_URI.to_string(),
        }
    }
}

/// Backend a configured mountpoint uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Server `FS:` API
    Http,
    /// Key-value backed local storage
    #[serde(alias = "local")]
    LocalStorage,
    /// Plain HTTP resources
    Web,
}

/// One entry of `vfs.mountpoints`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub name: String,
    pub transport: TransportKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false", default)]
    pub read_only: bool,
    #[serde(skip_serializing_if = "is_false", default)]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Custom match expression, replaces the literal root prefix
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pattern: Option<String>,
    /// Web mounts: URL the mount root maps to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub base_url: Option<String>,
}

impl MountConfig {
    pub fn new(name: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            name: name.into(),
            transport,
            root: None,
            description: None,
            read_only: false,
            searchable: false,
            visible: true,
            enabled: true,
            pattern: None,
            base_url: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }
}

/// Filesystem settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Largest accepted upload in bytes (0 = unlimited)
    pub max_upload_size: u64,
    /// File backing local storage mounts; in-memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// Mounted in order; earlier entries win prefix ties
    pub mountpoints: Vec<MountConfig>,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            storage_path: None,
            mountpoints: vec![
                MountConfig::new("osjs", TransportKind::Http)
                    .with_description("OS.js")
                    .read_only(),
                MountConfig::new("home", TransportKind::Http)
                    .with_description("Home")
                    .searchable(),
                MountConfig::new("local", TransportKind::LocalStorage)
                    .with_description("Local Storage"),
                MountConfig::new("web", TransportKind::Web).with_description("Web"),
            ],
        }
    }
}

/// Name of a registered handler factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub handler: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            handler: "demo".to_string(),
        }
    }
}

/// Complete kernel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub connection: ConnectionConfig,
    pub vfs: VfsConfig,
    pub auth: HandlerConfig,
    pub storage: HandlerConfig,
    /// Packages installed at boot
    pub packages: Vec<PackageMetadata>,
}

impl KernelConfig {
    /// Load from `WEBTOP_CONFIG` (defaults when unset), then apply env overrides
    pub fn load() -> ConfigResult<Self> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), mounts = config.vfs.mountpoints.len(), "Configuration loaded");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.is_empty()) {
            debug!(url = %url, "Server URL overridden");
            self.connection.url = url;
        }
        if let Some(path) = lookup(ENV_STORAGE_PATH).filter(|v| !v.is_empty()) {
            debug!(path = %path, "Storage path overridden");
            self.vfs.storage_path = Some(PathBuf::from(path));
        }
    }

    /// Mount names must be present and unique, patterns must compile
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for mount in &self.vfs.mountpoints {
            let name = crate::vfs::mount::mount_name(&mount.name);
            if name.is_empty() {
                return Err(ConfigError::Invalid("mountpoint without a name".into()));
            }
            if !seen.insert(name.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "mountpoint '{}' configured twice",
                    name
                )));
            }
            if let Some(pattern) = &mount.pattern {
                regex_lite::Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!("mountpoint '{}' pattern: {}", name, e))
                })?;
            }
        }
        if self.auth.handler.is_empty() || self.storage.handler.is_empty() {
            return Err(ConfigError::Invalid("handler names cannot be empty".into()));
        }
        Ok(())
    }
}
