//! # ormforge Core
//!
//! Core types, traits, and error handling for ormforge.
//!
//! This crate provides the foundational building blocks used throughout
//! the workspace, including:
//!
//! - **Types**: Node identifiers, configuration source ranks, data types
//! - **Traits**: `Validatable`
//! - **Errors**: Unified error handling with `ModelError` and `ModelResult`
//!

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ModelError, ModelResult, ResultExt};
pub use traits::Validatable;
pub use types::{
    ComplexPropertyId, ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ForeignKeyId,
    IndexId, KeyId, PropertyId, SkipNavigationId, ValueGenerated,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
