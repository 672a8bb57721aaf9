/*!
 * VFS File Metadata
 * The file descriptor object passed between applications and transports
 */

use super::errors::VfsError;
use super::file_type::FileType;
use crate::vfs::paths;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata describing one VFS entry
///
/// Identity is the `path`. Values are never mutated in place: a refresh
/// produces a new `FileMetadata`. Backend specific fields (`exif`, `id`, ...)
/// are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub filename: String,
    #[serde(rename = "type", default)]
    pub file_type: FileType,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
    /// Backend formatted timestamp (ISO string, unix seconds, ...)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mtime: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileMetadata {
    /// Create metadata for a path; filename and mime are derived from it
    pub fn new(path: impl Into<String>, file_type: FileType) -> Self {
        let path = path.into();
        let filename = paths::basename(&path);
        let mime = match file_type {
            FileType::File => Some(paths::guess_mime(&path).to_string()),
            FileType::Directory | FileType::Application => None,
        };
        Self {
            path,
            filename,
            file_type,
            mime,
            size: None,
            mtime: None,
            extra: Map::new(),
        }
    }

    /// Shorthand for a file entry
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, FileType::File)
    }

    /// Shorthand for a directory entry
    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, FileType::Directory)
    }

    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Parse metadata from a backend JSON object, validating the required fields
    pub fn from_value(value: Value) -> Result<Self, VfsError> {
        let meta: FileMetadata = serde_json::from_value(value)?;
        if meta.path.is_empty() {
            return Err(VfsError::InvalidArgument("metadata path cannot be empty".into()));
        }
        Ok(meta)
    }

    #[inline]
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }

    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }

    /// Parent directory path
    pub fn dirname(&self) -> String {
        paths::dirname(&self.path)
    }
}

impl From<&str> for FileMetadata {
    fn from(path: &str) -> Self {
        if path.ends_with('/') {
            FileMetadata::directory(path)
        } else {
            FileMetadata::file(path)
        }
    }
}
