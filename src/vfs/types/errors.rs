/*!
 * VFS Error Types
 * Structured, type-safe error handling for filesystem operations
 */

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// VFS operation result
///
/// # Must Use
/// VFS operations can fail and must be handled to prevent data loss
#[must_use = "VFS operations can fail and must be handled"]
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS errors with structured, type-safe error handling
///
/// All error variants include context strings that should be non-empty.
/// Serialization uses tagged enum pattern for type safety.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum VfsError {
    /// No registered mount matches the path
    #[error("No mountpoint found for: {0}")]
    NoSuchMount(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    /// Mutating operation on a read-only mount
    #[error("Mountpoint is read-only: {0}")]
    ReadOnly(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    /// Method name is not a VFS operation
    #[error("Unsupported VFS method: {0}")]
    UnsupportedMethod(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    /// Transport does not implement the capability
    #[error("Not available: {0}")]
    Unavailable(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    /// Backend failure, message passed through verbatim
    #[error("{0}")]
    Transport(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Mountpoint already mounted: {0}")]
    AlreadyMounted(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Mountpoint not mounted: {0}")]
    NotMounted(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Not found: {0}")]
    NotFound(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Already exists: {0}")]
    AlreadyExists(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Storage quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded { used: u64, quota: u64 },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[serde(deserialize_with = "deserialize_nonempty_string")] String),
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        VfsError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for VfsError {
    fn from(err: reqwest::Error) -> Self {
        VfsError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for VfsError {
    fn from(err: serde_json::Error) -> Self {
        VfsError::InvalidArgument(err.to_string())
    }
}

/// Deserialize and validate non-empty string for error messages
pub(super) fn deserialize_nonempty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::custom("error message must not be empty"));
    }
    Ok(s)
}
