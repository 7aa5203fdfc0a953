//! Interfaces to the layers around the runtime: UI reactivity, the
//! persistence repository and the remote-call transport. Nothing here is
//! implemented by this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::Change;
use crate::model::Model;

pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Wraps instances so later mutations are observed externally.
pub trait Reactivity: Send + Sync {
    fn add_reactivity(&self, model: Model) -> Model;

    /// Called after every write through [`Model::set`] or a refresh.
    fn notify(&self, model: &Model, attribute: &str, changes: &[Change]);
}

/// Options of [`Repository::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Validate before handing the instance over
    pub validate: bool,
    /// Clear change logs after a successful save
    pub clear_changes: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            validate: true,
            clear_changes: true,
        }
    }
}

pub trait Repository: Send + Sync {
    fn save(&self, model: &Model, options: &SaveOptions) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum RequestTarget {
    Attribute(String),
    Action(String),
}

/// Remote request keyed by collection and member name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub collection: String,
    /// Instance the call targets; `None` for static actions
    pub instance: Option<u64>,
    pub target: RequestTarget,
    pub payload: Value,
}

pub trait Transport: Send + Sync {
    fn dispatch(&self, request: Request) -> Result<Value, CollaboratorError>;
}
