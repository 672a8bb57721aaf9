/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::process::ProcessError;
use crate::vfs::VfsError;

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("VFS error: {0}")]
    #[diagnostic(
        code(kernel::vfs_error),
        help("The filesystem request failed. Check the mountpoint and path.")
    )]
    Vfs(#[from] VfsError),

    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Auth error: {0}")]
    #[diagnostic(
        code(kernel::auth_error),
        help("Login or session handling failed. Check the configured handlers.")
    )]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(kernel::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),
}

impl From<String> for KernelError {
    fn from(msg: String) -> Self {
        KernelError::Internal(msg)
    }
}

impl From<&str> for KernelError {
    fn from(msg: &str) -> Self {
        KernelError::Internal(msg.to_string())
    }
}

/// Serializable error representation for API responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
}

impl SerializableError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl From<&KernelError> for SerializableError {
    fn from(err: &KernelError) -> Self {
        let error_type = match err {
            KernelError::Vfs(_) => "vfs",
            KernelError::Process(_) => "process",
            KernelError::Auth(_) => "auth",
            KernelError::Configuration(_) => "configuration",
            KernelError::Internal(_) => "internal",
        };
        Self::new(error_type, err.to_string())
    }
}
