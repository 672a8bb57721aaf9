/*!
 * Windows
 * Window records owned by processes
 */

use crate::core::types::WindowId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Presentation state of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub focused: bool,
    pub minimized: bool,
    pub maximized: bool,
}

/// What an application asks for when opening a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub name: String,
    pub title: String,
    /// Declarative UI definition, passed through untouched
    #[serde(default)]
    pub scheme: Value,
}

impl WindowSpec {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            scheme: Value::Null,
        }
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: Value) -> Self {
        self.scheme = scheme;
        self
    }
}

/// A window attached to a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub scheme: Value,
    #[serde(default)]
    pub state: WindowState,
}

impl WindowInfo {
    pub(crate) fn from_spec(id: WindowId, spec: WindowSpec) -> Self {
        Self {
            id,
            name: spec.name,
            title: spec.title,
            scheme: spec.scheme,
            state: WindowState::default(),
        }
    }
}
