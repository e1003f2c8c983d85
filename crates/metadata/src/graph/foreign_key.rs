//! Foreign key nodes
//!
//! A foreign key is the directed edge between a dependent and a principal
//! entity type. Navigations are not separate nodes: they are the two
//! optional names stored on the foreign key they travel along.

use crate::graph::Annotations;
use crate::ledger::Sourced;
use ormforge_core::{
    ConfigurationSource, DeleteBehavior, EntityTypeId, ForeignKeyId, KeyId, PropertyId,
};

/// A relationship between a dependent and a principal entity type
#[derive(Debug, Clone, Hash)]
pub struct ForeignKey {
    pub(crate) id: ForeignKeyId,
    pub(crate) dependent: EntityTypeId,
    pub(crate) principal: EntityTypeId,
    pub(crate) source: ConfigurationSource,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) properties_source: Option<ConfigurationSource>,
    pub(crate) principal_key: KeyId,
    pub(crate) principal_key_source: Option<ConfigurationSource>,
    pub(crate) is_unique: Sourced<bool>,
    pub(crate) is_required: Sourced<bool>,
    pub(crate) is_ownership: Sourced<bool>,
    pub(crate) delete_behavior: Sourced<DeleteBehavior>,
    pub(crate) dependent_to_principal: Sourced<Option<String>>,
    pub(crate) principal_to_dependent: Sourced<Option<String>>,
    pub(crate) annotations: Annotations,
}

impl ForeignKey {
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn dependent(&self) -> EntityTypeId {
        self.dependent
    }

    pub fn principal(&self) -> EntityTypeId {
        self.principal
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    /// Ordered dependent properties
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// `None` while the dependent properties are inferred
    pub fn properties_source(&self) -> Option<ConfigurationSource> {
        self.properties_source
    }

    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    pub fn principal_key_source(&self) -> Option<ConfigurationSource> {
        self.principal_key_source
    }

    /// One-to-one when true, one-to-many otherwise
    pub fn is_unique(&self) -> bool {
        self.is_unique.value()
    }

    pub fn uniqueness_source(&self) -> Option<ConfigurationSource> {
        self.is_unique.source()
    }

    pub fn is_required(&self) -> bool {
        self.is_required.value()
    }

    pub fn requiredness_source(&self) -> Option<ConfigurationSource> {
        self.is_required.source()
    }

    /// Whether the dependent is owned through this relationship
    pub fn is_ownership(&self) -> bool {
        self.is_ownership.value()
    }

    pub fn delete_behavior(&self) -> DeleteBehavior {
        self.delete_behavior.value()
    }

    pub fn delete_behavior_source(&self) -> Option<ConfigurationSource> {
        self.delete_behavior.source()
    }

    /// Navigation declared on the dependent, pointing at the principal
    pub fn dependent_to_principal(&self) -> Option<&str> {
        self.dependent_to_principal.get().as_deref()
    }

    /// Navigation declared on the principal, pointing at dependents
    pub fn principal_to_dependent(&self) -> Option<&str> {
        self.principal_to_dependent.get().as_deref()
    }

    /// Navigation name on one side
    pub fn navigation(&self, on_dependent: bool) -> Option<&str> {
        if on_dependent {
            self.dependent_to_principal()
        } else {
            self.principal_to_dependent()
        }
    }

    pub fn navigation_source(&self, on_dependent: bool) -> Option<ConfigurationSource> {
        if on_dependent {
            self.dependent_to_principal.source()
        } else {
            self.principal_to_dependent.source()
        }
    }

    /// Whether both ends are the same entity type
    pub fn is_self_referencing(&self) -> bool {
        self.dependent == self.principal
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub(crate) fn navigation_slot(&mut self, on_dependent: bool) -> &mut Sourced<Option<String>> {
        if on_dependent {
            &mut self.dependent_to_principal
        } else {
            &mut self.principal_to_dependent
        }
    }
}
