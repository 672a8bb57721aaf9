/*!
 * VFS File Type Enum
 * Defines the type of filesystem objects
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// File type enumeration
///
/// Directories are written as `"dir"` on the wire; `"directory"` is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    File,
    #[serde(rename = "dir", alias = "directory")]
    Directory,
    Application,
}

impl Default for FileType {
    fn default() -> Self {
        Self::File
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileType::File => write!(f, "file"),
            FileType::Directory => write!(f, "dir"),
            FileType::Application => write!(f, "application"),
        }
    }
}
