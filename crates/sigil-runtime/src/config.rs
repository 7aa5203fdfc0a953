//! Project configuration (sigil.toml)
//!
//! ```toml
//! [engine]
//! model_decorator = "Model"
//! known_models = ["Account"]
//! max_depth = 32
//!
//! [runtime]
//! strict_objects = true
//! diff_matrix_limit = 250000
//! ```

use serde::{Deserialize, Serialize};
use sigil_engine::EngineConfig;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// File name looked up by [`SigilConfig::discover`].
pub const CONFIG_FILE: &str = "sigil.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SigilConfig {
    /// Classifier and emitter settings
    pub engine: EngineConfig,

    /// Store, validator and change tracking settings
    pub runtime: RuntimeConfig,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Report object keys no schema declares as `inexistent`
    pub strict_objects: bool,

    /// Largest `old.len() * new.len()` diffed with a full LCS table
    pub diff_matrix_limit: usize,
}

fn default_diff_matrix_limit() -> usize {
    250_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strict_objects: true,
            diff_matrix_limit: default_diff_matrix_limit(),
        }
    }
}

impl SigilConfig {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SigilConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find `sigil.toml` in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::from_file(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }
        Ok(None)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        let decorators = [
            ("model_decorator", &engine.model_decorator),
            ("attribute_decorator", &engine.attribute_decorator),
            ("action_decorator", &engine.action_decorator),
            ("argument_decorator", &engine.argument_decorator),
        ];

        for (i, (field, name)) in decorators.iter().enumerate() {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "engine.{} must be an identifier, got `{}`",
                    field, name
                )));
            }
            if let Some((other, _)) = decorators[..i].iter().find(|(_, n)| n == name) {
                return Err(ConfigError::Invalid(format!(
                    "engine.{} and engine.{} are both `{}`",
                    other, field, name
                )));
            }
        }

        if !is_identifier(&engine.lazy_wrapper) {
            return Err(ConfigError::Invalid(format!(
                "engine.lazy_wrapper must be an identifier, got `{}`",
                engine.lazy_wrapper
            )));
        }
        if engine.max_depth == 0 {
            return Err(ConfigError::Invalid("engine.max_depth must be at least 1".to_string()));
        }
        if self.runtime.diff_matrix_limit == 0 {
            return Err(ConfigError::Invalid(
                "runtime.diff_matrix_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
