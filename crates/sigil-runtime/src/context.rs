//! Application context: one store, its configuration and the optional
//! reactivity layer, with entry points for loading and instantiating.

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::collaborators::Reactivity;
use crate::config::SigilConfig;
use crate::error::RuntimeError;
use crate::loader::Loader;
use crate::model::Model;
use crate::schema::Schema;
use crate::store::MetadataStore;

pub struct AppContext {
    store: Arc<MetadataStore>,
    config: SigilConfig,
    reactivity: Option<Arc<dyn Reactivity>>,
}

impl AppContext {
    pub fn new(config: SigilConfig) -> Self {
        Self {
            store: MetadataStore::with_config(config.runtime.clone()),
            config,
            reactivity: None,
        }
    }

    /// Context configured from the nearest `sigil.toml` above `dir`, or
    /// defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, RuntimeError> {
        let config = match SigilConfig::discover(dir)? {
            Some((path, config)) => {
                tracing::info!(config = %path.display(), "loaded configuration");
                config
            }
            None => SigilConfig::default(),
        };
        Ok(Self::new(config))
    }

    /// Wrap every instance created from now on with `reactivity`.
    pub fn with_reactivity(mut self, reactivity: Arc<dyn Reactivity>) -> Self {
        self.reactivity = Some(reactivity);
        self
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn config(&self) -> &SigilConfig {
        &self.config
    }

    pub fn loader(&self) -> Loader {
        Loader::new(self.store.clone(), self.config.engine.clone())
    }

    /// Load `(name, source)` pairs, then construct. Every source must be
    /// loaded before construction so cross-file references resolve.
    pub fn load_sources<'s, I>(&self, sources: I) -> Result<Vec<String>, RuntimeError>
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let loader = self.loader();
        let rewritten = sources
            .into_iter()
            .map(|(name, source)| loader.load_source(name, source))
            .collect::<Result<Vec<_>, _>>()?;
        loader.finish()?;
        Ok(rewritten)
    }

    /// New live instance of `class`. Unknown keys in `values` are rejected.
    pub fn instantiate(&self, class: &str, values: Map<String, Value>) -> Result<Model, RuntimeError> {
        let schema = self
            .store
            .get_model_schema(class)
            .ok_or_else(|| RuntimeError::UnknownModel(class.to_string()))?;
        if schema.is_abstract() {
            return Err(RuntimeError::AbstractModel(class.to_string()));
        }
        schema.await_construction()?;

        let names = schema.attribute_names()?;
        if let Some(unknown) = values.keys().find(|key| !names.contains(key)) {
            return Err(RuntimeError::UnknownAttribute {
                model: class.to_string(),
                name: unknown.clone(),
            });
        }

        Model::create(&self.store, schema, values, self.reactivity.clone())
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(SigilConfig::default())
    }
}
