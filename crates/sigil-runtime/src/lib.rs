//! Sigil Runtime
//!
//! Consumes the metadata emitted by `sigil-engine`:
//! - **Store**: schemas and live instances keyed by (kind, owner, name),
//!   resolved along the class hierarchy (`store` module)
//! - **Schemas**: model, attribute, argument and action schemas with lazily
//!   built validators (`schema`, `validator` modules)
//! - **Persistence**: column and relation declarations (`persistence` module)
//! - **Attributes**: change-tracked attribute values (`attribute` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_runtime::{Access, AppContext};
//! use serde_json::{json, Map};
//!
//! let context = AppContext::default();
//! context.load_sources([("user.ts", "@Model() class User { @Attr() name: string; }")])?;
//!
//! let user = context.instantiate("User", Map::new())?;
//! user.set("name", json!("Ada"))?;
//! assert!(user.validate(Access::External)?.success);
//! ```

#![warn(rust_2018_idioms)]

// ============================================================================
// Modules
// ============================================================================

pub mod attribute;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod model;
pub mod options;
pub mod persistence;
pub mod schema;
pub mod store;
pub mod validator;

// ============================================================================
// Re-exports
// ============================================================================

pub use attribute::{Attribute, AttributeState, Change, ChangeKind};
pub use collaborators::{CollaboratorError, Reactivity, Repository, Request, RequestTarget, SaveOptions, Transport};
pub use config::{RuntimeConfig, SigilConfig, CONFIG_FILE};
pub use context::AppContext;
pub use error::{ChangeError, ConfigError, RuntimeError, SchemaError};
pub use loader::Loader;
pub use model::Model;
pub use persistence::{
    Cardinality, ColumnDeclaration, ColumnType, GenerationStrategy, PersistenceDeclaration, RelationDeclaration,
};
pub use schema::{ActionSchema, AnySchema, ArgumentSchema, AttributeSchema, ModelSchema, Schema};
pub use store::{InstanceOwner, MetadataStore};
pub use validator::{Access, IssueKind, ValidationIssue, ValidationResult, Validator};
