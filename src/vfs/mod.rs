/*!
 * Virtual File System Module
 * Mount registry, transports, and the request facade
 */

pub mod encoding;
pub mod facade;
pub mod mount;
pub mod observable;
pub mod paths;
pub mod traits;
pub mod transports;
pub mod types;

// Re-exports
pub use facade::{RequestHooks, Vfs};
pub use mount::{MountFilter, MountOptions, MountRegistry, Mountpoint};
pub use observable::{WatchEvent, WatchHub, WatchId, WatchKind, WatchTarget};
pub use traits::Transport;
pub use types::{
    mime_matches, FileMetadata, FileType, FindQuery, ScandirOptions, VfsError, VfsMethod,
    VfsRequest, VfsResponse, VfsResult,
};
