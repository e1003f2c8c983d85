//! Metadata graph
//!
//! Nodes live in the [`Model`] arena and refer to each other by identifier.
//! Navigations are views over foreign keys rather than nodes of their own.

mod annotation;
mod entity_type;
mod foreign_key;
mod key;
mod model;
mod navigation;
mod property;

pub use annotation::{AnnotatableId, Annotation, Annotations};
pub use entity_type::EntityType;
pub use foreign_key::ForeignKey;
pub use key::{Index, Key};
pub use model::Model;
pub use navigation::{Navigation, SkipNavigation};
pub use property::{ComplexMember, ComplexProperty, Property};
