//! Navigations and skip navigations

use crate::graph::{Annotations, ForeignKey};
use ormforge_core::{ConfigurationSource, EntityTypeId, ForeignKeyId, SkipNavigationId};

// ============================================================================
// Navigation
// ============================================================================

/// A read view of one navigation of a foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub foreign_key: ForeignKeyId,
    pub declaring_entity_type: EntityTypeId,
    pub target_entity_type: EntityTypeId,
    pub name: String,
    /// Declared on the dependent, pointing at the principal
    pub on_dependent: bool,
    pub is_collection: bool,
    pub source: Option<ConfigurationSource>,
}

impl Navigation {
    pub(crate) fn from_foreign_key(fk: &ForeignKey, on_dependent: bool) -> Option<Self> {
        let name = fk.navigation(on_dependent)?.to_string();
        let (declaring, target) = if on_dependent {
            (fk.dependent, fk.principal)
        } else {
            (fk.principal, fk.dependent)
        };
        Some(Self {
            foreign_key: fk.id,
            declaring_entity_type: declaring,
            target_entity_type: target,
            name,
            on_dependent,
            is_collection: !on_dependent && !fk.is_unique(),
            source: fk.navigation_source(on_dependent),
        })
    }
}

// ============================================================================
// SkipNavigation
// ============================================================================

/// A many-to-many navigation traversing an implicit join entity type
#[derive(Debug, Clone, Hash)]
pub struct SkipNavigation {
    pub(crate) id: SkipNavigationId,
    pub(crate) declaring: EntityTypeId,
    pub(crate) target: EntityTypeId,
    pub(crate) name: String,
    pub(crate) foreign_key: ForeignKeyId,
    pub(crate) inverse: Option<SkipNavigationId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

impl SkipNavigation {
    pub fn id(&self) -> SkipNavigationId {
        self.id
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring
    }

    pub fn target_entity_type(&self) -> EntityTypeId {
        self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Foreign key from the join entity type to the declaring entity type
    pub fn foreign_key(&self) -> ForeignKeyId {
        self.foreign_key
    }

    pub fn inverse(&self) -> Option<SkipNavigationId> {
        self.inverse
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}
