/*!
 * VFS Methods
 * The closed set of operations a mount can be asked to perform
 */

use super::errors::VfsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognized VFS operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VfsMethod {
    Scandir,
    Read,
    Write,
    Upload,
    Copy,
    Move,
    Unlink,
    Mkdir,
    Exists,
    Fileinfo,
    Url,
    Find,
    FreeSpace,
}

impl VfsMethod {
    pub const ALL: [VfsMethod; 13] = [
        VfsMethod::Scandir,
        VfsMethod::Read,
        VfsMethod::Write,
        VfsMethod::Upload,
        VfsMethod::Copy,
        VfsMethod::Move,
        VfsMethod::Unlink,
        VfsMethod::Mkdir,
        VfsMethod::Exists,
        VfsMethod::Fileinfo,
        VfsMethod::Url,
        VfsMethod::Find,
        VfsMethod::FreeSpace,
    ];

    /// Wire name of the method
    pub const fn as_str(&self) -> &'static str {
        match self {
            VfsMethod::Scandir => "scandir",
            VfsMethod::Read => "read",
            VfsMethod::Write => "write",
            VfsMethod::Upload => "upload",
            VfsMethod::Copy => "copy",
            VfsMethod::Move => "move",
            VfsMethod::Unlink => "unlink",
            VfsMethod::Mkdir => "mkdir",
            VfsMethod::Exists => "exists",
            VfsMethod::Fileinfo => "fileinfo",
            VfsMethod::Url => "url",
            VfsMethod::Find => "find",
            VfsMethod::FreeSpace => "freeSpace",
        }
    }

    /// Methods that change storage; rejected on read-only mounts and followed by a watch event
    #[inline]
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            VfsMethod::Write
                | VfsMethod::Upload
                | VfsMethod::Copy
                | VfsMethod::Move
                | VfsMethod::Unlink
                | VfsMethod::Mkdir
        )
    }
}

impl fmt::Display for VfsMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VfsMethod {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VfsMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                VfsError::UnsupportedMethod(if s.is_empty() { "<empty>".into() } else { s.into() })
            })
    }
}
