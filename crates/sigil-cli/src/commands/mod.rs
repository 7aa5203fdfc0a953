//! Subcommand implementations.

pub mod emit;
pub mod files;
pub mod inspect;
pub mod validate;
