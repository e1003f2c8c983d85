//! Conventions
//!
//! A convention reacts to graph mutation events and may perform further
//! mutations through the [`ModelBuilder`], always at the rank its inference
//! deserves (usually [`ConfigurationSource::Convention`]). Conventions run in
//! registration order; the dispatcher lives in [`dispatcher`].
//!
//! [`ConfigurationSource::Convention`]: ormforge_core::ConfigurationSource::Convention

pub(crate) mod dispatcher;

mod cascade_delete;
mod data_annotations;
mod foreign_key_deduplication;
mod foreign_key_index;
mod foreign_key_property_discovery;
mod foreign_key_requiredness;
mod key_discovery;
mod model_version;
mod principal_key_retarget;
mod property_discovery;
mod relationship_discovery;
mod value_generation;

pub use cascade_delete::CascadeDelete;
pub use data_annotations::DataAnnotations;
pub use foreign_key_deduplication::ForeignKeyDeduplication;
pub use foreign_key_index::ForeignKeyIndex;
pub use foreign_key_property_discovery::ForeignKeyPropertyDiscovery;
pub use foreign_key_requiredness::ForeignKeyRequiredness;
pub use key_discovery::KeyDiscovery;
pub use model_version::{ModelVersion, PRODUCT_VERSION_ANNOTATION};
pub use principal_key_retarget::PrincipalKeyRetarget;
pub use property_discovery::PropertyDiscovery;
pub use relationship_discovery::{AMBIGUOUS_NAVIGATIONS_ANNOTATION, RelationshipDiscovery};
pub use value_generation::ValueGeneration;

use crate::ModelBuilder;
use crate::config::BuilderConfig;
use crate::graph::{AnnotatableId, Model};
use ormforge_core::{
    ComplexPropertyId, EntityTypeId, ForeignKeyId, IndexId, KeyId, ModelResult, PropertyId,
    SkipNavigationId,
};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Events
// ============================================================================

/// A graph mutation conventions can react to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConventionEvent {
    EntityTypeAdded {
        entity_type: EntityTypeId,
    },
    EntityTypeRemoved {
        entity_type: EntityTypeId,
        name: String,
    },
    EntityTypeBaseTypeChanged {
        entity_type: EntityTypeId,
    },
    EntityTypeMemberIgnored {
        entity_type: EntityTypeId,
        name: String,
    },
    PropertyAdded {
        property: PropertyId,
    },
    PropertyRemoved {
        entity_type: EntityTypeId,
        property: PropertyId,
        name: String,
    },
    PropertyNullabilityChanged {
        property: PropertyId,
    },
    ComplexPropertyAdded {
        complex_property: ComplexPropertyId,
    },
    KeyAdded {
        key: KeyId,
    },
    KeyRemoved {
        entity_type: EntityTypeId,
        key: KeyId,
    },
    PrimaryKeyChanged {
        entity_type: EntityTypeId,
        previous: Option<KeyId>,
    },
    ForeignKeyAdded {
        foreign_key: ForeignKeyId,
    },
    ForeignKeyRemoved {
        foreign_key: ForeignKeyId,
        dependent: EntityTypeId,
        principal: EntityTypeId,
    },
    ForeignKeyPropertiesChanged {
        foreign_key: ForeignKeyId,
    },
    ForeignKeyUniquenessChanged {
        foreign_key: ForeignKeyId,
    },
    ForeignKeyRequirednessChanged {
        foreign_key: ForeignKeyId,
    },
    ForeignKeyOwnershipChanged {
        foreign_key: ForeignKeyId,
    },
    NavigationAdded {
        foreign_key: ForeignKeyId,
        on_dependent: bool,
    },
    NavigationRemoved {
        foreign_key: ForeignKeyId,
        entity_type: EntityTypeId,
        name: String,
    },
    SkipNavigationAdded {
        skip_navigation: SkipNavigationId,
    },
    IndexAdded {
        index: IndexId,
    },
    IndexRemoved {
        entity_type: EntityTypeId,
        index: IndexId,
    },
    IndexUniquenessChanged {
        index: IndexId,
    },
    AnnotationChanged {
        target: AnnotatableId,
        name: String,
    },
    ModelFinalizing,
}

/// Discriminant of a [`ConventionEvent`], used for registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EntityTypeAdded,
    EntityTypeRemoved,
    EntityTypeBaseTypeChanged,
    EntityTypeMemberIgnored,
    PropertyAdded,
    PropertyRemoved,
    PropertyNullabilityChanged,
    ComplexPropertyAdded,
    KeyAdded,
    KeyRemoved,
    PrimaryKeyChanged,
    ForeignKeyAdded,
    ForeignKeyRemoved,
    ForeignKeyPropertiesChanged,
    ForeignKeyUniquenessChanged,
    ForeignKeyRequirednessChanged,
    ForeignKeyOwnershipChanged,
    NavigationAdded,
    NavigationRemoved,
    SkipNavigationAdded,
    IndexAdded,
    IndexRemoved,
    IndexUniquenessChanged,
    AnnotationChanged,
    ModelFinalizing,
}

impl ConventionEvent {
    /// Kind of the event
    pub fn kind(&self) -> EventKind {
        match self {
            ConventionEvent::EntityTypeAdded { .. } => EventKind::EntityTypeAdded,
            ConventionEvent::EntityTypeRemoved { .. } => EventKind::EntityTypeRemoved,
            ConventionEvent::EntityTypeBaseTypeChanged { .. } => {
                EventKind::EntityTypeBaseTypeChanged
            }
            ConventionEvent::EntityTypeMemberIgnored { .. } => EventKind::EntityTypeMemberIgnored,
            ConventionEvent::PropertyAdded { .. } => EventKind::PropertyAdded,
            ConventionEvent::PropertyRemoved { .. } => EventKind::PropertyRemoved,
            ConventionEvent::PropertyNullabilityChanged { .. } => {
                EventKind::PropertyNullabilityChanged
            }
            ConventionEvent::ComplexPropertyAdded { .. } => EventKind::ComplexPropertyAdded,
            ConventionEvent::KeyAdded { .. } => EventKind::KeyAdded,
            ConventionEvent::KeyRemoved { .. } => EventKind::KeyRemoved,
            ConventionEvent::PrimaryKeyChanged { .. } => EventKind::PrimaryKeyChanged,
            ConventionEvent::ForeignKeyAdded { .. } => EventKind::ForeignKeyAdded,
            ConventionEvent::ForeignKeyRemoved { .. } => EventKind::ForeignKeyRemoved,
            ConventionEvent::ForeignKeyPropertiesChanged { .. } => {
                EventKind::ForeignKeyPropertiesChanged
            }
            ConventionEvent::ForeignKeyUniquenessChanged { .. } => {
                EventKind::ForeignKeyUniquenessChanged
            }
            ConventionEvent::ForeignKeyRequirednessChanged { .. } => {
                EventKind::ForeignKeyRequirednessChanged
            }
            ConventionEvent::ForeignKeyOwnershipChanged { .. } => {
                EventKind::ForeignKeyOwnershipChanged
            }
            ConventionEvent::NavigationAdded { .. } => EventKind::NavigationAdded,
            ConventionEvent::NavigationRemoved { .. } => EventKind::NavigationRemoved,
            ConventionEvent::SkipNavigationAdded { .. } => EventKind::SkipNavigationAdded,
            ConventionEvent::IndexAdded { .. } => EventKind::IndexAdded,
            ConventionEvent::IndexRemoved { .. } => EventKind::IndexRemoved,
            ConventionEvent::IndexUniquenessChanged { .. } => EventKind::IndexUniquenessChanged,
            ConventionEvent::AnnotationChanged { .. } => EventKind::AnnotationChanged,
            ConventionEvent::ModelFinalizing => EventKind::ModelFinalizing,
        }
    }

    /// Foreign key the event is about, if any
    pub fn foreign_key(&self) -> Option<ForeignKeyId> {
        match self {
            ConventionEvent::ForeignKeyAdded { foreign_key }
            | ConventionEvent::ForeignKeyPropertiesChanged { foreign_key }
            | ConventionEvent::ForeignKeyUniquenessChanged { foreign_key }
            | ConventionEvent::ForeignKeyRequirednessChanged { foreign_key }
            | ConventionEvent::ForeignKeyOwnershipChanged { foreign_key }
            | ConventionEvent::NavigationAdded { foreign_key, .. } => Some(*foreign_key),
            _ => None,
        }
    }

    /// Whether conventions may still act on the event
    ///
    /// Removal events stay live while the node that contained the removed
    /// node exists.
    pub fn is_live(&self, model: &Model) -> bool {
        match self {
            ConventionEvent::EntityTypeAdded { entity_type }
            | ConventionEvent::EntityTypeBaseTypeChanged { entity_type }
            | ConventionEvent::EntityTypeMemberIgnored { entity_type, .. }
            | ConventionEvent::PropertyRemoved { entity_type, .. }
            | ConventionEvent::KeyRemoved { entity_type, .. }
            | ConventionEvent::PrimaryKeyChanged { entity_type, .. }
            | ConventionEvent::NavigationRemoved { entity_type, .. }
            | ConventionEvent::IndexRemoved { entity_type, .. } => {
                model.entity_type(*entity_type).is_some()
            }
            ConventionEvent::PropertyAdded { property }
            | ConventionEvent::PropertyNullabilityChanged { property } => {
                model.property(*property).is_some()
            }
            ConventionEvent::ComplexPropertyAdded { complex_property } => {
                model.complex_property(*complex_property).is_some()
            }
            ConventionEvent::KeyAdded { key } => model.key(*key).is_some(),
            ConventionEvent::ForeignKeyRemoved {
                dependent,
                principal,
                ..
            } => model.entity_type(*dependent).is_some() || model.entity_type(*principal).is_some(),
            ConventionEvent::SkipNavigationAdded { skip_navigation } => {
                model.skip_navigation(*skip_navigation).is_some()
            }
            ConventionEvent::IndexAdded { index }
            | ConventionEvent::IndexUniquenessChanged { index } => model.index(*index).is_some(),
            ConventionEvent::AnnotationChanged { target, .. } => {
                model.annotations_of(*target).is_some()
            }
            ConventionEvent::EntityTypeRemoved { .. } | ConventionEvent::ModelFinalizing => true,
            other => other
                .foreign_key()
                .is_some_and(|fk| model.foreign_key(fk).is_some()),
        }
    }

    /// Hash of the current state of the node the event targets
    ///
    /// Two dispatches of the same event with the same fingerprint mean the
    /// event was re-triggered without any progress on its input.
    pub(crate) fn fingerprint(&self, model: &Model) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            ConventionEvent::EntityTypeAdded { entity_type }
            | ConventionEvent::EntityTypeBaseTypeChanged { entity_type }
            | ConventionEvent::EntityTypeMemberIgnored { entity_type, .. }
            | ConventionEvent::PropertyRemoved { entity_type, .. }
            | ConventionEvent::KeyRemoved { entity_type, .. }
            | ConventionEvent::PrimaryKeyChanged { entity_type, .. }
            | ConventionEvent::NavigationRemoved { entity_type, .. }
            | ConventionEvent::IndexRemoved { entity_type, .. }
            | ConventionEvent::EntityTypeRemoved { entity_type, .. } => {
                model.entity_type(*entity_type).hash(&mut hasher)
            }
            ConventionEvent::PropertyAdded { property }
            | ConventionEvent::PropertyNullabilityChanged { property } => {
                model.property(*property).hash(&mut hasher)
            }
            ConventionEvent::ComplexPropertyAdded { complex_property } => {
                model.complex_property(*complex_property).hash(&mut hasher)
            }
            ConventionEvent::KeyAdded { key } => model.key(*key).hash(&mut hasher),
            ConventionEvent::ForeignKeyRemoved { dependent, .. } => {
                model.entity_type(*dependent).hash(&mut hasher)
            }
            ConventionEvent::SkipNavigationAdded { skip_navigation } => {
                model.skip_navigation(*skip_navigation).hash(&mut hasher)
            }
            ConventionEvent::IndexAdded { index }
            | ConventionEvent::IndexUniquenessChanged { index } => {
                model.index(*index).hash(&mut hasher)
            }
            ConventionEvent::AnnotationChanged { target, .. } => {
                model.annotations_of(*target).hash(&mut hasher)
            }
            ConventionEvent::ModelFinalizing => model.annotations().hash(&mut hasher),
            other => {
                if let Some(fk) = other.foreign_key() {
                    model.foreign_key(fk).hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}

impl fmt::Display for ConventionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConventionEvent::EntityTypeAdded { entity_type }
            | ConventionEvent::EntityTypeBaseTypeChanged { entity_type }
            | ConventionEvent::PrimaryKeyChanged { entity_type, .. } => {
                write!(f, "{:?}({})", self.kind(), entity_type)
            }
            ConventionEvent::EntityTypeRemoved { name, .. } => {
                write!(f, "EntityTypeRemoved({})", name)
            }
            ConventionEvent::EntityTypeMemberIgnored { entity_type, name } => {
                write!(f, "EntityTypeMemberIgnored({}.{})", entity_type, name)
            }
            ConventionEvent::PropertyAdded { property }
            | ConventionEvent::PropertyNullabilityChanged { property } => {
                write!(f, "{:?}({})", self.kind(), property)
            }
            ConventionEvent::PropertyRemoved { property, name, .. } => {
                write!(f, "PropertyRemoved({} '{}')", property, name)
            }
            ConventionEvent::ComplexPropertyAdded { complex_property } => {
                write!(f, "ComplexPropertyAdded({})", complex_property)
            }
            ConventionEvent::KeyAdded { key } | ConventionEvent::KeyRemoved { key, .. } => {
                write!(f, "{:?}({})", self.kind(), key)
            }
            ConventionEvent::ForeignKeyRemoved { foreign_key, .. } => {
                write!(f, "ForeignKeyRemoved({})", foreign_key)
            }
            ConventionEvent::NavigationRemoved {
                foreign_key, name, ..
            } => write!(f, "NavigationRemoved({} '{}')", foreign_key, name),
            ConventionEvent::SkipNavigationAdded { skip_navigation } => {
                write!(f, "SkipNavigationAdded({})", skip_navigation)
            }
            ConventionEvent::IndexAdded { index }
            | ConventionEvent::IndexRemoved { index, .. }
            | ConventionEvent::IndexUniquenessChanged { index } => {
                write!(f, "{:?}({})", self.kind(), index)
            }
            ConventionEvent::AnnotationChanged { target, name } => {
                write!(f, "AnnotationChanged({} '{}')", target, name)
            }
            ConventionEvent::ModelFinalizing => f.write_str("ModelFinalizing"),
            other => match other.foreign_key() {
                Some(fk) => write!(f, "{:?}({})", other.kind(), fk),
                None => write!(f, "{:?}", other.kind()),
            },
        }
    }
}

// ============================================================================
// Convention Trait
// ============================================================================

/// Per-dispatch state shared by the conventions handling one event
#[derive(Debug, Default)]
pub struct ConventionContext {
    stopped: bool,
}

impl ConventionContext {
    /// Prevent later conventions from seeing the current event
    pub fn stop_processing(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// A rule reacting to graph mutations
pub trait Convention: Send + Sync {
    /// Stable name, also used by [`ConventionToggles`](crate::config::ConventionToggles)
    fn name(&self) -> &'static str;

    /// Event kinds this convention is dispatched for
    fn handles(&self) -> &'static [EventKind];

    /// React to one event
    ///
    /// The event target is live when this is called. Mutations performed
    /// here are applied at once; the conventions they trigger are queued.
    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        context: &mut ConventionContext,
    ) -> ModelResult<()>;
}

// ============================================================================
// ConventionSet
// ============================================================================

/// Ordered set of conventions; registration order is dispatch order
#[derive(Clone, Default)]
pub struct ConventionSet {
    conventions: Vec<Arc<dyn Convention>>,
}

impl ConventionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The default conventions enabled in `config`, in their documented order
    pub fn with_defaults(config: &BuilderConfig) -> Self {
        let defaults: Vec<Arc<dyn Convention>> = vec![
            Arc::new(PropertyDiscovery),
            Arc::new(DataAnnotations),
            Arc::new(KeyDiscovery),
            Arc::new(ValueGeneration),
            Arc::new(RelationshipDiscovery),
            Arc::new(ForeignKeyPropertyDiscovery),
            Arc::new(PrincipalKeyRetarget),
            Arc::new(ForeignKeyRequiredness),
            Arc::new(CascadeDelete),
            Arc::new(ForeignKeyDeduplication),
            Arc::new(ForeignKeyIndex),
            Arc::new(ModelVersion),
        ];
        Self {
            conventions: defaults
                .into_iter()
                .filter(|c| config.conventions.is_enabled(c.name()))
                .collect(),
        }
    }

    /// Append a convention
    pub fn add(&mut self, convention: impl Convention + 'static) {
        self.conventions.push(Arc::new(convention));
    }

    /// Insert a convention before the named one (appends if absent)
    pub fn add_before(&mut self, name: &str, convention: impl Convention + 'static) {
        let position = self.position(name).unwrap_or(self.conventions.len());
        self.conventions.insert(position, Arc::new(convention));
    }

    /// Insert a convention after the named one (appends if absent)
    pub fn add_after(&mut self, name: &str, convention: impl Convention + 'static) {
        let position = self
            .position(name)
            .map(|p| p + 1)
            .unwrap_or(self.conventions.len());
        self.conventions.insert(position, Arc::new(convention));
    }

    /// Remove a convention by name
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.conventions.len();
        self.conventions.retain(|c| c.name() != name);
        before != self.conventions.len()
    }

    /// Names in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.conventions.iter().map(|c| c.name()).collect()
    }

    /// Conventions registered for an event kind, in dispatch order
    pub fn handling(&self, kind: EventKind) -> impl Iterator<Item = &Arc<dyn Convention>> {
        self.conventions
            .iter()
            .filter(move |c| c.handles().contains(&kind))
    }

    pub fn len(&self) -> usize {
        self.conventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conventions.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.conventions.iter().position(|c| c.name() == name)
    }
}

impl fmt::Debug for ConventionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConventionToggles;

    struct Noop(&'static str);

    impl Convention for Noop {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handles(&self) -> &'static [EventKind] {
            &[EventKind::KeyAdded]
        }

        fn apply(
            &self,
            _builder: &mut ModelBuilder,
            _event: &ConventionEvent,
            _context: &mut ConventionContext,
        ) -> ModelResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_order() {
        let set = ConventionSet::with_defaults(&BuilderConfig::default());
        assert_eq!(
            set.names(),
            vec![
                "property_discovery",
                "data_annotations",
                "key_discovery",
                "value_generation",
                "relationship_discovery",
                "foreign_key_property_discovery",
                "principal_key_retarget",
                "foreign_key_requiredness",
                "cascade_delete",
                "foreign_key_deduplication",
                "foreign_key_index",
                "model_version",
            ]
        );
    }

    #[test]
    fn test_toggles_filter_defaults() {
        let config = BuilderConfig {
            conventions: ConventionToggles {
                foreign_key_index: false,
                ..ConventionToggles::default()
            },
            ..BuilderConfig::default()
        };
        let set = ConventionSet::with_defaults(&config);
        assert!(!set.names().contains(&"foreign_key_index"));
        assert_eq!(set.len(), 11);
    }

    #[test]
    fn test_insert_relative() {
        let mut set = ConventionSet::new();
        set.add(Noop("a"));
        set.add(Noop("c"));
        set.add_before("c", Noop("b"));
        set.add_after("c", Noop("d"));
        assert_eq!(set.names(), vec!["a", "b", "c", "d"]);
        assert_eq!(set.handling(EventKind::KeyAdded).count(), 4);
        assert_eq!(set.handling(EventKind::IndexAdded).count(), 0);

        assert!(set.remove("b"));
        assert!(!set.remove("b"));
    }

    #[test]
    fn test_event_display() {
        let event = ConventionEvent::ForeignKeyUniquenessChanged {
            foreign_key: ForeignKeyId::from_raw(3),
        };
        assert_eq!(event.to_string(), "ForeignKeyUniquenessChanged(ForeignKey#3)");
        assert_eq!(event.kind(), EventKind::ForeignKeyUniquenessChanged);
    }

    #[test]
    fn test_removal_event_liveness() {
        let mut model = Model::new();
        let order =
            model.insert_entity_type("Order", "Order", ormforge_core::ConfigurationSource::Explicit);
        let event = ConventionEvent::KeyRemoved {
            entity_type: order,
            key: KeyId::from_raw(99),
        };
        assert!(event.is_live(&model));
        model.detach_entity_type(order);
        assert!(!event.is_live(&model));
        assert!(ConventionEvent::ModelFinalizing.is_live(&model));
    }
}
