//! Engine configuration (`[engine]` section of `sigil.toml`)

use serde::{Deserialize, Serialize};

/// Names and limits the classifier and emitter work with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Decorator marking model classes (default: "Model")
    pub model_decorator: String,

    /// Decorator marking attributes (default: "Attr")
    pub attribute_decorator: String,

    /// Decorator marking action methods (default: "Action")
    pub action_decorator: String,

    /// Decorator marking action arguments (default: "Arg")
    pub argument_decorator: String,

    /// Deferred-value wrapper type (default: "Lazy")
    pub lazy_wrapper: String,

    /// Doc tag marking a type alias as a custom type (default: "customType")
    pub custom_type_tag: String,

    /// Names treated as model classes even when declared elsewhere
    pub known_models: Vec<String>,

    /// Maximum classifier recursion depth
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    32
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_decorator: "Model".to_string(),
            attribute_decorator: "Attr".to_string(),
            action_decorator: "Action".to_string(),
            argument_decorator: "Arg".to_string(),
            lazy_wrapper: "Lazy".to_string(),
            custom_type_tag: "customType".to_string(),
            known_models: Vec::new(),
            max_depth: default_max_depth(),
        }
    }
}

impl EngineConfig {
    /// Add names to `known_models`.
    pub fn with_known_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_models.extend(models.into_iter().map(Into::into));
        self
    }

    pub fn is_known_model(&self, name: &str) -> bool {
        self.known_models.iter().any(|m| m == name)
    }
}
