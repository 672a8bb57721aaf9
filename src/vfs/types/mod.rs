/*!
 * VFS Types
 * Shared types for filesystem operations with serde support
 */

mod errors;
mod file_type;
mod metadata;
mod method;
mod request;

pub use errors::{VfsError, VfsResult};
pub use file_type::FileType;
pub use metadata::FileMetadata;
pub use method::VfsMethod;
pub use request::{mime_matches, FindQuery, ScandirOptions, VfsRequest, VfsResponse};
pub(crate) use request::upload_target;
