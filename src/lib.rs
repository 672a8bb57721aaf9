/*!
 * Webtop Kernel Library
 * Core of a web desktop exposed as a library
 *
 * - Virtual filesystem: mount registry, transports, request facade, watches
 * - Process and window lifecycle
 * - Package registry
 * - Pluggable authentication and settings storage
 */

pub mod auth;
pub mod config;
pub mod connection;
pub mod core;
pub mod kernel;
pub mod monitoring;
pub mod packages;
pub mod process;
pub mod vfs;

// Re-exports
pub use auth::{Authenticator, Credentials, HandlerRegistry, LoginResponse, StorageHandler};
pub use config::{ConfigError, KernelConfig, MountConfig, TransportKind};
pub use connection::{Connection, HttpConnection};
pub use core::{KernelError, KernelResult, Origin, Pid, WindowId};
pub use kernel::{Kernel, KernelBuilder};
pub use monitoring::init_tracing;
pub use packages::{PackageMetadata, PackageRegistry, PackageType};
pub use process::{Application, ProcessManager, ProcessState};
pub use vfs::{FileMetadata, Mountpoint, Transport, Vfs, VfsError, VfsRequest};
