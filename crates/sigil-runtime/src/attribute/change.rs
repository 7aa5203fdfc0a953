use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Starting value
    Init,
    Add,
    Remove,
    Change,
}

/// One change log entry. `path` addresses the touched position inside the
/// attribute value; an empty path is the value itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: Vec<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub previous_value: Value,
}

impl Change {
    pub fn init(value: Value) -> Self {
        Self {
            kind: ChangeKind::Init,
            path: Vec::new(),
            value,
            previous_value: Value::Null,
        }
    }

    pub fn add(path: Vec<String>, value: Value) -> Self {
        Self {
            kind: ChangeKind::Add,
            path,
            value,
            previous_value: Value::Null,
        }
    }

    pub fn remove(path: Vec<String>, previous_value: Value) -> Self {
        Self {
            kind: ChangeKind::Remove,
            path,
            value: Value::Null,
            previous_value,
        }
    }

    pub fn change(path: Vec<String>, value: Value, previous_value: Value) -> Self {
        Self {
            kind: ChangeKind::Change,
            path,
            value,
            previous_value,
        }
    }

    /// `path` joined with dots, for messages and logs
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }

    /// Apply this entry to `target`.
    pub fn apply(&self, target: &mut Value) -> Result<(), ChangeError> {
        match self.kind {
            ChangeKind::Init | ChangeKind::Change => {
                let slot = resolve_mut(target, &self.path)?;
                *slot = self.value.clone();
                Ok(())
            }
            ChangeKind::Add => {
                let (parent, last) = self.split()?;
                match resolve_mut(target, parent)? {
                    Value::Array(items) => {
                        let index = self.index(last)?;
                        if index > items.len() {
                            return Err(ChangeError::IndexOutOfBounds {
                                index,
                                len: items.len(),
                            });
                        }
                        items.insert(index, self.value.clone());
                    }
                    Value::Object(map) => {
                        map.insert(last.to_string(), self.value.clone());
                    }
                    _ => return Err(self.invalid()),
                }
                Ok(())
            }
            ChangeKind::Remove => {
                let (parent, last) = self.split()?;
                match resolve_mut(target, parent)? {
                    Value::Array(items) => {
                        let index = self.index(last)?;
                        if index >= items.len() {
                            return Err(ChangeError::IndexOutOfBounds {
                                index,
                                len: items.len(),
                            });
                        }
                        items.remove(index);
                    }
                    Value::Object(map) => {
                        if map.remove(last).is_none() {
                            return Err(self.invalid());
                        }
                    }
                    _ => return Err(self.invalid()),
                }
                Ok(())
            }
        }
    }

    /// The entry that reverts this one. `Init` has no inverse.
    pub fn inverse(&self) -> Option<Change> {
        let path = self.path.clone();
        match self.kind {
            ChangeKind::Init => None,
            ChangeKind::Change => Some(Change::change(
                path,
                self.previous_value.clone(),
                self.value.clone(),
            )),
            ChangeKind::Add => Some(Change::remove(path, self.value.clone())),
            ChangeKind::Remove => Some(Change::add(path, self.previous_value.clone())),
        }
    }

    fn split(&self) -> Result<(&[String], &str), ChangeError> {
        match self.path.split_last() {
            Some((last, parent)) => Ok((parent, last.as_str())),
            None => Err(self.invalid()),
        }
    }

    fn index(&self, segment: &str) -> Result<usize, ChangeError> {
        segment.parse().map_err(|_| self.invalid())
    }

    fn invalid(&self) -> ChangeError {
        ChangeError::InvalidPath {
            path: self.path_string(),
        }
    }
}

/// Walk `path` from `root`.
fn resolve_mut<'a>(root: &'a mut Value, path: &[String]) -> Result<&'a mut Value, ChangeError> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let next = match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            Value::Object(map) => map.get_mut(segment),
            _ => None,
        };
        current = next.ok_or_else(|| ChangeError::InvalidPath {
            path: path[..=depth].join("."),
        })?;
    }
    Ok(current)
}

/// Apply `changes` in order.
pub fn apply_all(target: &mut Value, changes: &[Change]) -> Result<(), ChangeError> {
    for change in changes {
        change.apply(target)?;
    }
    Ok(())
}
