//! Key and index nodes

use crate::graph::Annotations;
use crate::ledger::Sourced;
use ormforge_core::{ConfigurationSource, EntityTypeId, IndexId, KeyId, PropertyId};

/// An ordered, duplicate-free list of properties uniquely identifying rows
#[derive(Debug, Clone, Hash)]
pub struct Key {
    pub(crate) id: KeyId,
    pub(crate) entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

impl Key {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

/// An index over properties of one entity type
#[derive(Debug, Clone, Hash)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) entity_type: EntityTypeId,
    pub(crate) name: Option<String>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) is_unique: Sourced<bool>,
    pub(crate) annotations: Annotations,
}

impl Index {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    /// Name of a named index
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique.value()
    }

    pub fn uniqueness_source(&self) -> Option<ConfigurationSource> {
        self.is_unique.source()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}
