//! Entity type nodes
//!
//! An entity type is a mapped shape. It owns the identifiers of its declared
//! members; the members themselves live in the model's arenas.

use crate::graph::Annotations;
use crate::ledger::Sourced;
use ormforge_core::{
    ComplexPropertyId, ConfigurationSource, EntityTypeId, ForeignKeyId, IndexId, KeyId,
    PropertyId, SkipNavigationId,
};
use std::collections::BTreeMap;

/// A mapped entity type
#[derive(Debug, Clone, Hash)]
pub struct EntityType {
    pub(crate) id: EntityTypeId,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) source: ConfigurationSource,
    pub(crate) base_type: Sourced<Option<EntityTypeId>>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) complex_properties: Vec<ComplexPropertyId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) primary_key: Sourced<Option<KeyId>>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) skip_navigations: Vec<SkipNavigationId>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) ignored: BTreeMap<String, ConfigurationSource>,
    pub(crate) annotations: Annotations,
}

impl EntityType {
    pub(crate) fn new(
        id: EntityTypeId,
        name: impl Into<String>,
        type_name: impl Into<String>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            type_name: type_name.into(),
            source,
            base_type: Sourced::new(None),
            properties: Vec::new(),
            complex_properties: Vec::new(),
            keys: Vec::new(),
            primary_key: Sourced::new(None),
            foreign_keys: Vec::new(),
            skip_navigations: Vec::new(),
            indexes: Vec::new(),
            ignored: BTreeMap::new(),
            annotations: Annotations::default(),
        }
    }

    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    /// Unique name of the entity type within the model
    ///
    /// Equal to the type name for shared types; owned types get a name
    /// scoped to the navigation path that owns them.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the mapped type shape
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rank of the strongest configuration that added the entity type
    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type.value()
    }

    pub fn base_type_source(&self) -> Option<ConfigurationSource> {
        self.base_type.source()
    }

    /// Declared properties (excluding inherited ones)
    pub fn property_ids(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn complex_property_ids(&self) -> &[ComplexPropertyId] {
        &self.complex_properties
    }

    /// Declared keys, including the primary key
    pub fn key_ids(&self) -> &[KeyId] {
        &self.keys
    }

    /// Declared primary key (derived types have none of their own)
    pub fn primary_key_id(&self) -> Option<KeyId> {
        self.primary_key.value()
    }

    pub fn primary_key_source(&self) -> Option<ConfigurationSource> {
        self.primary_key.source()
    }

    /// Foreign keys declared with this entity type as dependent
    pub fn foreign_key_ids(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    pub fn skip_navigation_ids(&self) -> &[SkipNavigationId] {
        &self.skip_navigations
    }

    pub fn index_ids(&self) -> &[IndexId] {
        &self.indexes
    }

    /// Rank at which a member name was ignored
    pub fn ignored_source(&self, member: &str) -> Option<ConfigurationSource> {
        self.ignored.get(member).copied()
    }

    /// Ignored member names
    pub fn ignored_members(&self) -> impl Iterator<Item = &str> {
        self.ignored.keys().map(String::as_str)
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}
