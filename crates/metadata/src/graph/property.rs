//! Scalar and complex property nodes

use crate::graph::Annotations;
use crate::ledger::Sourced;
use ormforge_core::{
    ComplexPropertyId, ConfigurationSource, DataType, EntityTypeId, PropertyId, ValueGenerated,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Property
// ============================================================================

/// A scalar property
///
/// A property without a backing member is a shadow property: its value
/// lives only in tracked state.
#[derive(Debug, Clone, Hash)]
pub struct Property {
    pub(crate) id: PropertyId,
    pub(crate) entity_type: EntityTypeId,
    pub(crate) name: String,
    pub(crate) member: Option<String>,
    pub(crate) source: ConfigurationSource,
    pub(crate) data_type: Sourced<DataType>,
    pub(crate) nullable: Sourced<bool>,
    pub(crate) value_generated: Sourced<ValueGenerated>,
    pub(crate) annotations: Annotations,
}

impl Property {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Declaring entity type
    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing member on the mapped type, if any
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn is_shadow(&self) -> bool {
        self.member.is_none()
    }

    /// Shadow property a convention created, as opposed to one configured
    /// through the builder
    pub fn is_convention_shadow(&self) -> bool {
        self.is_shadow() && self.source == ConfigurationSource::Convention
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    /// Declared type, without the nullable wrapper
    pub fn data_type(&self) -> &DataType {
        self.data_type.get()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.value()
    }

    pub fn nullability_source(&self) -> Option<ConfigurationSource> {
        self.nullable.source()
    }

    pub fn value_generated(&self) -> ValueGenerated {
        self.value_generated.value()
    }

    pub fn value_generated_source(&self) -> Option<ConfigurationSource> {
        self.value_generated.source()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

// ============================================================================
// ComplexProperty
// ============================================================================

/// A scalar member of a complex property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComplexMember {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// A structurally nested property whose members are stored with the owner
#[derive(Debug, Clone, Hash)]
pub struct ComplexProperty {
    pub(crate) id: ComplexPropertyId,
    pub(crate) entity_type: EntityTypeId,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) is_collection: bool,
    pub(crate) source: ConfigurationSource,
    pub(crate) nullable: Sourced<bool>,
    pub(crate) members: Vec<ComplexMember>,
    pub(crate) annotations: Annotations,
}

impl ComplexProperty {
    pub fn id(&self) -> ComplexPropertyId {
        self.id
    }

    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.value()
    }

    pub fn members(&self) -> &[ComplexMember] {
        &self.members
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}
