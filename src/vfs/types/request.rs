/*!
 * VFS Requests and Responses
 * Typed arguments for every VFS method, plus parsing from the untyped wire form
 */

use super::errors::{VfsError, VfsResult};
use super::file_type::FileType;
use super::metadata::FileMetadata;
use super::method::VfsMethod;
use crate::core::serde::{default_true, is_empty_vec};
use crate::vfs::{encoding, paths};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Listing filters applied after a transport returns a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScandirOptions {
    #[serde(default = "default_true")]
    pub show_hidden_files: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_filter: Option<FileType>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub mime_filter: Vec<String>,
}

impl Default for ScandirOptions {
    fn default() -> Self {
        Self {
            show_hidden_files: true,
            type_filter: None,
            mime_filter: Vec::new(),
        }
    }
}

impl ScandirOptions {
    /// Drop `..`, hidden files, and entries rejected by the type/mime filters
    pub fn apply(&self, list: Vec<FileMetadata>) -> Vec<FileMetadata> {
        list.into_iter()
            .filter(|iter| iter.filename != "..")
            .filter(|iter| self.type_filter.map_or(true, |t| iter.file_type == t))
            .filter(|iter| self.show_hidden_files || !is_hidden(&iter.filename))
            .filter(|iter| !iter.is_file() || self.accepts_mime(iter.mime.as_deref()))
            .collect()
    }

    fn accepts_mime(&self, mime: Option<&str>) -> bool {
        match mime {
            Some(mime) if !self.mime_filter.is_empty() => {
                self.mime_filter.iter().any(|m| mime_matches(m, mime))
            }
            _ => true,
        }
    }
}

fn is_hidden(filename: &str) -> bool {
    let mut chars = filename.chars();
    chars.next() == Some('.') && chars.next().map_or(false, |c| c.is_alphanumeric() || c == '_')
}

/// Match a mime pattern (`text/plain`, `text/*`, `*`) against a mime type
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    if pattern == "*" || pattern == "*/*" || pattern == mime {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(major) => mime.split('/').next() == Some(major),
        None => false,
    }
}

/// Search parameters for `find`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub recursive: bool,
}

/// A fully typed VFS request
#[derive(Debug, Clone, PartialEq)]
pub enum VfsRequest {
    Scandir {
        dir: FileMetadata,
        options: ScandirOptions,
    },
    Read {
        file: FileMetadata,
    },
    Write {
        file: FileMetadata,
        data: Bytes,
    },
    Upload {
        dest: FileMetadata,
        filename: String,
        data: Bytes,
    },
    Copy {
        src: FileMetadata,
        dest: FileMetadata,
    },
    Move {
        src: FileMetadata,
        dest: FileMetadata,
    },
    Unlink {
        file: FileMetadata,
    },
    Mkdir {
        dir: FileMetadata,
    },
    Exists {
        file: FileMetadata,
    },
    Fileinfo {
        file: FileMetadata,
    },
    Url {
        file: FileMetadata,
    },
    Find {
        dir: FileMetadata,
        query: FindQuery,
    },
    FreeSpace {
        root: String,
    },
}

impl VfsRequest {
    pub fn method(&self) -> VfsMethod {
        match self {
            VfsRequest::Scandir { .. } => VfsMethod::Scandir,
            VfsRequest::Read { .. } => VfsMethod::Read,
            VfsRequest::Write { .. } => VfsMethod::Write,
            VfsRequest::Upload { .. } => VfsMethod::Upload,
            VfsRequest::Copy { .. } => VfsMethod::Copy,
            VfsRequest::Move { .. } => VfsMethod::Move,
            VfsRequest::Unlink { .. } => VfsMethod::Unlink,
            VfsRequest::Mkdir { .. } => VfsMethod::Mkdir,
            VfsRequest::Exists { .. } => VfsMethod::Exists,
            VfsRequest::Fileinfo { .. } => VfsMethod::Fileinfo,
            VfsRequest::Url { .. } => VfsMethod::Url,
            VfsRequest::Find { .. } => VfsMethod::Find,
            VfsRequest::FreeSpace { .. } => VfsMethod::FreeSpace,
        }
    }

    /// Path used to pick the mount (the source for two-path methods)
    pub fn path(&self) -> &str {
        match self {
            VfsRequest::Scandir { dir, .. }
            | VfsRequest::Mkdir { dir }
            | VfsRequest::Find { dir, .. } => &dir.path,
            VfsRequest::Read { file }
            | VfsRequest::Write { file, .. }
            | VfsRequest::Unlink { file }
            | VfsRequest::Exists { file }
            | VfsRequest::Fileinfo { file }
            | VfsRequest::Url { file } => &file.path,
            VfsRequest::Upload { dest, .. } => &dest.path,
            VfsRequest::Copy { src, .. } | VfsRequest::Move { src, .. } => &src.path,
            VfsRequest::FreeSpace { root } => root,
        }
    }

    /// Destination path of two-path methods
    pub fn destination(&self) -> Option<&str> {
        match self {
            VfsRequest::Copy { dest, .. } | VfsRequest::Move { dest, .. } => Some(&dest.path),
            _ => None,
        }
    }

    /// The positional path arguments, without payloads
    pub fn path_args(&self) -> Vec<&str> {
        match self {
            VfsRequest::Copy { src, dest } | VfsRequest::Move { src, dest } => {
                vec![src.path.as_str(), dest.path.as_str()]
            }
            other => vec![other.path()],
        }
    }

    /// Positional wire arguments, in the order the `FS:` API expects them
    pub fn wire_args(&self) -> Vec<Value> {
        match self {
            VfsRequest::Write { file, data } => {
                let mime = file.mime.as_deref().unwrap_or("application/octet-stream");
                vec![
                    Value::String(file.path.clone()),
                    Value::String(encoding::to_data_url(data, mime)),
                ]
            }
            VfsRequest::Upload {
                dest,
                filename,
                data,
            } => vec![
                Value::String(dest.path.clone()),
                Value::String(filename.clone()),
                Value::String(encoding::encode_base64(data)),
            ],
            VfsRequest::Copy { src, dest } | VfsRequest::Move { src, dest } => vec![
                Value::String(src.path.clone()),
                Value::String(dest.path.clone()),
            ],
            VfsRequest::Scandir { dir, .. } => vec![Value::String(dir.path.clone())],
            VfsRequest::Find { dir, query } => vec![
                Value::String(dir.path.clone()),
                serde_json::to_value(query).unwrap_or(Value::Null),
            ],
            other => vec![Value::String(other.path().to_string())],
        }
    }

    /// Build a request from a method name and untyped positional arguments
    ///
    /// Path arguments may be strings or metadata objects; data arguments may be
    /// `data:` URLs, plain strings, or byte arrays.
    pub fn from_wire(method: &str, args: Vec<Value>) -> VfsResult<Self> {
        let method: VfsMethod = method.parse()?;
        let mut args = args.into_iter();
        let mut next = |what: &str| {
            args.next().ok_or_else(|| {
                VfsError::InvalidArgument(format!("{} expects argument '{}'", method, what))
            })
        };

        let request = match method {
            VfsMethod::Scandir => VfsRequest::Scandir {
                dir: metadata_arg(next("dir")?, FileType::Directory)?,
                options: ScandirOptions::default(),
            },
            VfsMethod::Read => VfsRequest::Read {
                file: metadata_arg(next("file")?, FileType::File)?,
            },
            VfsMethod::Write => {
                let file = metadata_arg(next("file")?, FileType::File)?;
                let data = data_arg(next("data")?)?;
                VfsRequest::Write { file, data }
            }
            VfsMethod::Upload => {
                let dest = metadata_arg(next("dest")?, FileType::Directory)?;
                let filename = string_arg(next("filename")?, "filename")?;
                let data = data_arg(next("data")?)?;
                VfsRequest::Upload {
                    dest,
                    filename,
                    data,
                }
            }
            VfsMethod::Copy => VfsRequest::Copy {
                src: metadata_arg(next("src")?, FileType::File)?,
                dest: metadata_arg(next("dest")?, FileType::File)?,
            },
            VfsMethod::Move => VfsRequest::Move {
                src: metadata_arg(next("src")?, FileType::File)?,
                dest: metadata_arg(next("dest")?, FileType::File)?,
            },
            VfsMethod::Unlink => VfsRequest::Unlink {
                file: metadata_arg(next("file")?, FileType::File)?,
            },
            VfsMethod::Mkdir => VfsRequest::Mkdir {
                dir: metadata_arg(next("dir")?, FileType::Directory)?,
            },
            VfsMethod::Exists => VfsRequest::Exists {
                file: metadata_arg(next("file")?, FileType::File)?,
            },
            VfsMethod::Fileinfo => VfsRequest::Fileinfo {
                file: metadata_arg(next("file")?, FileType::File)?,
            },
            VfsMethod::Url => VfsRequest::Url {
                file: metadata_arg(next("file")?, FileType::File)?,
            },
            VfsMethod::Find => {
                let dir = metadata_arg(next("dir")?, FileType::Directory)?;
                let query = match next("query")? {
                    Value::String(query) => FindQuery {
                        query,
                        ..FindQuery::default()
                    },
                    value => serde_json::from_value(value)?,
                };
                VfsRequest::Find { dir, query }
            }
            VfsMethod::FreeSpace => VfsRequest::FreeSpace {
                root: string_arg(next("root")?, "root")?,
            },
        };
        Ok(request)
    }
}

fn metadata_arg(value: Value, fallback: FileType) -> VfsResult<FileMetadata> {
    match value {
        Value::String(path) if !path.is_empty() => Ok(FileMetadata::new(path, fallback)),
        Value::Object(_) => FileMetadata::from_value(value),
        other => Err(VfsError::InvalidArgument(format!(
            "expected a path or file metadata, got {}",
            other
        ))),
    }
}

fn string_arg(value: Value, what: &str) -> VfsResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(VfsError::InvalidArgument(format!(
            "expected string for '{}', got {}",
            what, other
        ))),
    }
}

fn data_arg(value: Value) -> VfsResult<Bytes> {
    match value {
        Value::String(s) if s.starts_with("data:") => encoding::from_data_url(&s),
        Value::String(s) => Ok(Bytes::from(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| VfsError::InvalidArgument("byte array expected".into()))
            })
            .collect::<VfsResult<Vec<u8>>>()
            .map(Bytes::from),
        Value::Null => Ok(Bytes::new()),
        other => Err(VfsError::InvalidArgument(format!(
            "expected file data, got {}",
            other
        ))),
    }
}

/// Result of a VFS request
#[derive(Debug, Clone, PartialEq)]
pub enum VfsResponse {
    Listing(Vec<FileMetadata>),
    Data(Bytes),
    Metadata(FileMetadata),
    Url(String),
    Exists(bool),
    /// Remaining bytes; `None` when the backend has no quota
    FreeSpace(Option<u64>),
    Done,
}

impl VfsResponse {
    /// Untyped form for the wire (`{result}` payload)
    pub fn into_value(self) -> Value {
        match self {
            VfsResponse::Listing(list) => serde_json::to_value(list).unwrap_or(Value::Null),
            VfsResponse::Data(data) => Value::String(encoding::encode_base64(&data)),
            VfsResponse::Metadata(meta) => serde_json::to_value(meta).unwrap_or(Value::Null),
            VfsResponse::Url(url) => Value::String(url),
            VfsResponse::Exists(exists) => Value::Bool(exists),
            VfsResponse::FreeSpace(Some(n)) => Value::from(n),
            VfsResponse::FreeSpace(None) => Value::from(-1),
            VfsResponse::Done => Value::Bool(true),
        }
    }

    pub fn into_listing(self) -> VfsResult<Vec<FileMetadata>> {
        match self {
            VfsResponse::Listing(list) => Ok(list),
            other => Err(unexpected("listing", &other)),
        }
    }

    pub fn into_data(self) -> VfsResult<Bytes> {
        match self {
            VfsResponse::Data(data) => Ok(data),
            other => Err(unexpected("data", &other)),
        }
    }

    pub fn into_metadata(self) -> VfsResult<FileMetadata> {
        match self {
            VfsResponse::Metadata(meta) => Ok(meta),
            other => Err(unexpected("metadata", &other)),
        }
    }

    pub fn into_url(self) -> VfsResult<String> {
        match self {
            VfsResponse::Url(url) => Ok(url),
            other => Err(unexpected("url", &other)),
        }
    }

    pub fn into_bool(self) -> VfsResult<bool> {
        match self {
            VfsResponse::Exists(b) => Ok(b),
            other => Err(unexpected("boolean", &other)),
        }
    }

    pub fn into_free_space(self) -> VfsResult<Option<u64>> {
        match self {
            VfsResponse::FreeSpace(n) => Ok(n),
            other => Err(unexpected("free space", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &VfsResponse) -> VfsError {
    VfsError::Transport(format!("expected {} response, got {:?}", expected, got))
}

/// Upload destination as a file path
pub(crate) fn upload_target(dest: &FileMetadata, filename: &str) -> String {
    paths::join(&dest.path, filename)
}
