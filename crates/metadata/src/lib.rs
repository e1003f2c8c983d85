//! # ormforge Metadata
//!
//! The metadata graph of an ORM model and the machinery that builds it.
//!
//! ## Core Concepts
//!
//! - **Model**: Entity types, properties, keys, foreign keys, navigations and
//!   indexes, all addressed by stable identifiers
//! - **Configuration source**: Every configurable fact remembers who set it
//!   (Convention, DataAnnotation or Explicit); weaker sources cannot
//!   override stronger ones
//! - **Conventions**: Rules reacting to model changes, dispatched in
//!   registration order; nested batches defer dispatch until the outermost
//!   batch ends
//! - **Shapes**: Descriptions of mapped types that conventions discover
//!   properties, keys and relationships from
//!
//! ```
//! use ormforge_core::{ConfigurationSource, DataType};
//! use ormforge_metadata::{ModelBuilder, TypeShape};
//!
//! let mut builder = ModelBuilder::new();
//! builder.register_shape(
//!     TypeShape::new("Blog")
//!         .scalar("Id", DataType::Int32)
//!         .collection("Posts", "Post"),
//! )?;
//! builder.register_shape(
//!     TypeShape::new("Post")
//!         .scalar("Id", DataType::Int32)
//!         .reference("Blog", "Blog"),
//! )?;
//! builder.entity("Blog", ConfigurationSource::Explicit)?;
//!
//! let model = builder.finalize()?;
//! let post = model.find_entity_type("Post").unwrap().id();
//! assert_eq!(model.foreign_keys_of(post).len(), 1);
//! # Ok::<(), ormforge_core::ModelError>(())
//! ```

// Module declarations
pub mod builder;
pub mod config;
pub mod conventions;
pub mod definition;
pub mod graph;
pub mod ledger;
pub mod naming;
pub mod shape;
pub mod snapshot;
pub mod validation;

// Re-export commonly used types at crate root
pub use builder::{
    ConventionBatch, EntityTypeBuilder, Handle, ModelBuilder, OwnershipSpec, RelationshipKind,
    RelationshipSpec,
};
pub use config::{BuilderConfig, ConventionToggles};
pub use conventions::{Convention, ConventionContext, ConventionEvent, ConventionSet, EventKind};
pub use definition::{EntityDefinition, ModelDefinition};
pub use graph::{
    AnnotatableId, Annotation, Annotations, ComplexProperty, EntityType, ForeignKey, Index, Key,
    Model, Navigation, Property, SkipNavigation,
};
pub use ledger::{SetOutcome, Sourced};
pub use shape::{Mapped, Marker, MemberInfo, MemberKind, ShapeRegistry, TypeShape};
pub use snapshot::ModelSnapshot;
pub use validation::{ValidationResult, ValidationRule, Validator};

// Re-export core types that are commonly used with the graph
pub use ormforge_core::{
    ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ForeignKeyId, ModelError,
    ModelResult, PropertyId, ValueGenerated,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        // Re-exported from core
        ConfigurationSource,
        DataType,
        DeleteBehavior,
        // Building
        EntityTypeBuilder,
        Mapped,
        // Reading
        Model,
        ModelBuilder,
        ModelDefinition,
        ModelError,
        ModelResult,
        RelationshipSpec,
        TypeShape,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_conventions_registered() {
        let builder = ModelBuilder::new();
        assert_eq!(builder.conventions().len(), 12);
        assert!(builder.conventions().names().contains(&"model_version"));
    }
}
