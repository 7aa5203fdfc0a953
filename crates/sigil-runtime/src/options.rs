//! Declaration options
//!
//! Options are the JSON object passed as the leading argument of a
//! declaration's annotation call, e.g. `@Attr({ min: 0, index: true })`.
//! Redeclarations merge into the options they override.

use serde_json::{Map, Value};

/// Merge `patch` into `target`. Objects merge key by key; arrays and
/// scalars in `patch` replace what was there.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Read helpers over an options object.
pub trait OptionsExt {
    fn flag(&self, key: &str) -> bool;
    fn number(&self, key: &str) -> Option<f64>;
    fn text(&self, key: &str) -> Option<&str>;
}

impl OptionsExt for Value {
    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl OptionsExt for Map<String, Value> {
    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// An empty options object.
pub fn empty() -> Value {
    Value::Object(Map::new())
}
