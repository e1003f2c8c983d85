//! Model builder
//!
//! The [`ModelBuilder`] is the only path allowed to mutate the metadata graph.
//! Every mutation checks the configuration source ledger, applies the change
//! and queues the matching convention event. Precedence conflicts are not
//! errors: a mutation that loses returns `Ok(None)` or `Ok(false)`.
//!
//! The API is split by concern:
//! - this module: construction, entity types, inheritance, node removal
//! - [`members`]: properties, complex properties, annotations, ignore
//! - [`keys`]: primary keys, alternate keys, indexes
//! - [`relationship`]: relationships, ownership, many-to-many
//! - [`batch`]: convention batches and handle relocation
//! - [`fluent`]: typed wrapper at Explicit rank

mod batch;
mod fluent;
mod keys;
mod members;
mod relationship;

pub use batch::{ConventionBatch, Handle};
pub use fluent::EntityTypeBuilder;
pub use relationship::{OwnershipSpec, RelationshipKind, RelationshipSpec};

use crate::config::BuilderConfig;
use crate::conventions::dispatcher::Dispatcher;
use crate::conventions::{ConventionEvent, ConventionSet};
use crate::graph::{EntityType, Model};
use crate::naming::PROPERTY_BAG_TYPE;
use crate::shape::{Mapped, ShapeRegistry, TypeShape};
use crate::validation::{ValidationResult, Validator};
use ormforge_core::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, IndexId, KeyId, ModelError, ModelResult,
    PropertyId, SkipNavigationId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// ModelBuilder
// ============================================================================

/// Builds a [`Model`] under convention control
pub struct ModelBuilder {
    pub(crate) model: Model,
    pub(crate) conventions: Arc<ConventionSet>,
    pub(crate) shapes: ShapeRegistry,
    pub(crate) config: BuilderConfig,
    pub(crate) dispatcher: Dispatcher,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    /// Create a builder with the default configuration and conventions
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// Create a builder with the default conventions enabled in `config`
    pub fn with_config(config: BuilderConfig) -> Self {
        let conventions = ConventionSet::with_defaults(&config);
        Self::with_conventions(config, conventions)
    }

    /// Create a builder with a custom convention set
    pub fn with_conventions(config: BuilderConfig, conventions: ConventionSet) -> Self {
        debug!(conventions = ?conventions, "Creating model builder");
        Self {
            model: Model::new(),
            conventions: Arc::new(conventions),
            shapes: ShapeRegistry::new(),
            config,
            dispatcher: Dispatcher::default(),
        }
    }

    /// Create a builder without any conventions
    pub fn bare() -> Self {
        Self::with_conventions(BuilderConfig::default(), ConventionSet::new())
    }

    /// Read-only view of the graph
    ///
    /// Outside of an open batch this is always the settled state.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn conventions(&self) -> &ConventionSet {
        &self.conventions
    }

    pub fn shapes(&self) -> &ShapeRegistry {
        &self.shapes
    }

    /// Whether a convention batch is open
    pub fn is_batching(&self) -> bool {
        self.dispatcher.depth() > 0
    }

    /// Register the shape of a mapped type
    pub fn register_shape(&mut self, shape: TypeShape) -> ModelResult<()> {
        debug!(shape = %shape.name, members = shape.members.len(), "Registering type shape");
        self.shapes.register(shape)
    }

    /// Register the shape of a Rust type
    pub fn register<T: Mapped>(&mut self) -> ModelResult<()> {
        self.register_shape(T::shape())
    }

    pub(crate) fn require_entity(&self, id: EntityTypeId) -> ModelResult<&EntityType> {
        self.model
            .entity_type(id)
            .ok_or_else(|| ModelError::node_not_found(id))
    }

    pub(crate) fn entity_name(&self, id: EntityTypeId) -> String {
        self.model
            .entity_type(id)
            .map(|e| e.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    // ========================================================================
    // Entity Types
    // ========================================================================

    /// Add an entity type, or return the existing one with that name
    ///
    /// Returns `None` when the name was ignored at a stronger rank.
    pub fn entity(
        &mut self,
        name: &str,
        source: ConfigurationSource,
    ) -> ModelResult<Option<EntityTypeId>> {
        if name.trim().is_empty() {
            return Err(ModelError::invalid_configuration(
                "entity type name cannot be empty",
            ));
        }
        if let Some(ignored) = self.model.ignored_source(name) {
            if !source.overrides(Some(ignored)) {
                tracing::trace!(entity_type = name, %source, "Entity type is ignored");
                return Ok(None);
            }
            self.model.ignored.remove(name);
        }
        if let Some(id) = self.model.find_entity_type(name).map(|e| e.id()) {
            if let Some(entity) = self.model.entity_type_mut(id) {
                entity.source = source.max_with(Some(entity.source));
            }
            return Ok(Some(id));
        }

        self.run_batch(|b| {
            let id = b.model.insert_entity_type(name, name, source);
            debug!(entity_type = name, %source, "Entity type added");
            b.notify(ConventionEvent::EntityTypeAdded { entity_type: id });
            Ok(Some(id))
        })
    }

    /// Exclude a type from the model, removing it if present
    pub fn ignore_entity(&mut self, name: &str, source: ConfigurationSource) -> ModelResult<bool> {
        if let Some(entity) = self.model.find_entity_type(name) {
            if !source.overrides(Some(entity.source())) {
                return Ok(false);
            }
            let id = entity.id();
            self.run_batch(|b| b.remove_entity_type_node(id))?;
        }
        let entry = self.model.ignored.entry(name.to_string()).or_insert(source);
        *entry = source.max_with(Some(*entry));
        debug!(entity_type = name, %source, "Entity type ignored");
        Ok(true)
    }

    /// Remove an entity type with everything that depends on it
    pub fn remove_entity(
        &mut self,
        entity: EntityTypeId,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        if !source.overrides(Some(self.require_entity(entity)?.source())) {
            return Ok(false);
        }
        self.run_batch(|b| b.remove_entity_type_node(entity))?;
        Ok(true)
    }

    /// Set or clear the base type of an entity type
    ///
    /// Derived types share the key of their root; their own primary key and
    /// properties duplicated by the base are removed.
    pub fn has_base_type(
        &mut self,
        entity: EntityTypeId,
        base: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self.require_entity(entity)?;
        if current.base_type() == base {
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.base_type.raise_source(source);
            }
            return Ok(true);
        }
        if !source.overrides(current.base_type_source()) {
            return Ok(false);
        }

        if let Some(base) = base {
            self.require_entity(base)?;
            let problem = if self.model.base_chain(base).contains(&entity) {
                Some("the hierarchy would contain a cycle")
            } else if self.model.is_owned(entity) || self.model.is_owned(base) {
                Some("owned entity types cannot take part in inheritance")
            } else {
                None
            };
            if let Some(message) = problem {
                if source == ConfigurationSource::Explicit {
                    return Err(ModelError::InvalidBaseType {
                        entity_type: self.entity_name(entity),
                        base_type: self.entity_name(base),
                        message: message.to_string(),
                    });
                }
                return Ok(false);
            }
        }

        self.run_batch(|b| {
            if let Some(e) = b.model.entity_type_mut(entity) {
                e.base_type.try_set(base, source);
            }
            if let Some(base) = base {
                b.detach_own_primary_key(entity, source)?;
                let duplicates: Vec<PropertyId> = b
                    .model
                    .properties_of(entity)
                    .into_iter()
                    .filter(|p| source.overrides(Some(p.source())))
                    .filter(|p| b.model.find_property(base, p.name()).is_some())
                    .map(|p| p.id())
                    .collect();
                for property in duplicates {
                    b.remove_property_node(property)?;
                }
            }
            debug!(entity_type = %b.entity_name(entity), base = ?base, "Base type changed");
            b.notify(ConventionEvent::EntityTypeBaseTypeChanged {
                entity_type: entity,
            });
            Ok(true)
        })
    }

    fn detach_own_primary_key(
        &mut self,
        entity: EntityTypeId,
        source: ConfigurationSource,
    ) -> ModelResult<()> {
        let Some(key) = self.require_entity(entity)?.primary_key_id() else {
            return Ok(());
        };
        let removable = self
            .model
            .key(key)
            .is_some_and(|k| source.overrides(Some(k.source())))
            && !self.model.is_key_referenced(key);
        if removable {
            self.remove_key_node(key)
        } else {
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.primary_key.force(None, None);
            }
            self.notify(ConventionEvent::PrimaryKeyChanged {
                entity_type: entity,
                previous: Some(key),
            });
            Ok(())
        }
    }

    // ========================================================================
    // Finalization
    // ========================================================================

    /// Run the validation rules against the current graph
    pub fn validate(&self) -> ValidationResult {
        Validator::with_default_rules().validate(&self.model)
    }

    /// Settle the conventions, validate and return the read-only model
    pub fn finalize(mut self) -> ModelResult<Model> {
        if let Some(err) = self.dispatcher.pending_error.take() {
            return Err(err);
        }
        self.run_batch(|b| {
            b.notify(ConventionEvent::ModelFinalizing);
            Ok(())
        })?;

        let result = self.validate();
        for warning in &result.warnings {
            warn!("{}", warning);
        }
        result.into_result()?;

        self.model.mark_finalized();
        info!(
            entity_types = self.model.entity_type_count(),
            foreign_keys = self.model.foreign_keys().count(),
            "Model finalized"
        );
        Ok(self.model)
    }

    // ========================================================================
    // Node Removal
    // ========================================================================

    pub(crate) fn remove_entity_type_node(&mut self, id: EntityTypeId) -> ModelResult<()> {
        let Some(name) = self.model.entity_type(id).map(|e| e.name().to_string()) else {
            return Ok(());
        };

        let skips: Vec<SkipNavigationId> = self
            .model
            .skip_navigations
            .values()
            .filter(|s| s.declaring == id || s.target == id)
            .map(|s| s.id)
            .collect();
        for skip in skips {
            self.remove_skip_navigation_node(skip, true)?;
        }

        let foreign_keys: Vec<(ForeignKeyId, bool)> = self
            .model
            .foreign_keys()
            .filter(|fk| fk.dependent == id || fk.principal == id)
            .map(|fk| (fk.id, fk.dependent != id))
            .collect();
        for (fk, cascade_owned) in foreign_keys {
            self.remove_foreign_key_node(fk, cascade_owned)?;
        }

        let derived: Vec<EntityTypeId> = self
            .model
            .entity_types()
            .filter(|e| e.base_type() == Some(id))
            .map(|e| e.id())
            .collect();
        for derived in derived {
            if let Some(e) = self.model.entity_type_mut(derived) {
                e.base_type.force(None, None);
            }
            self.notify(ConventionEvent::EntityTypeBaseTypeChanged {
                entity_type: derived,
            });
        }

        if let Some(entity) = self.model.detach_entity_type(id) {
            for index in &entity.indexes {
                self.model.indexes.remove(index);
            }
            for key in &entity.keys {
                self.model.keys.remove(key);
            }
            for property in &entity.properties {
                self.model.properties.remove(property);
            }
            for complex in &entity.complex_properties {
                self.model.complex_properties.remove(complex);
            }
        }
        debug!(entity_type = %name, "Entity type removed");
        self.notify(ConventionEvent::EntityTypeRemoved {
            entity_type: id,
            name,
        });
        Ok(())
    }

    /// Remove a foreign key; `cascade_owned` also removes an owned dependent
    pub(crate) fn remove_foreign_key_node(
        &mut self,
        id: ForeignKeyId,
        cascade_owned: bool,
    ) -> ModelResult<()> {
        let Some(fk) = self.model.detach_foreign_key(id) else {
            return Ok(());
        };

        let skips: Vec<SkipNavigationId> = self
            .model
            .skip_navigations
            .values()
            .filter(|s| s.foreign_key == id)
            .map(|s| s.id)
            .collect();
        for skip in skips {
            self.remove_skip_navigation_node(skip, false)?;
        }

        for on_dependent in [true, false] {
            if let Some(name) = fk.navigation(on_dependent) {
                let entity_type = if on_dependent {
                    fk.dependent
                } else {
                    fk.principal
                };
                self.notify(ConventionEvent::NavigationRemoved {
                    foreign_key: id,
                    entity_type,
                    name: name.to_string(),
                });
            }
        }
        debug!(foreign_key = %id, "Foreign key removed");
        self.notify(ConventionEvent::ForeignKeyRemoved {
            foreign_key: id,
            dependent: fk.dependent,
            principal: fk.principal,
        });

        if fk.is_ownership() && cascade_owned {
            self.remove_entity_type_node(fk.dependent)
        } else {
            self.discard_shadow_properties(&fk.properties)
        }
    }

    pub(crate) fn remove_property_node(&mut self, id: PropertyId) -> ModelResult<()> {
        let Some((entity, name)) = self
            .model
            .property(id)
            .map(|p| (p.entity_type(), p.name().to_string()))
        else {
            return Ok(());
        };

        let keys: Vec<KeyId> = self
            .model
            .keys
            .values()
            .filter(|k| k.properties.contains(&id))
            .map(|k| k.id)
            .collect();
        for key in keys {
            self.remove_key_node(key)?;
        }
        let indexes: Vec<IndexId> = self
            .model
            .indexes
            .values()
            .filter(|i| i.properties.contains(&id))
            .map(|i| i.id)
            .collect();
        for index in indexes {
            self.remove_index_node(index)?;
        }
        let foreign_keys: Vec<ForeignKeyId> = self
            .model
            .foreign_keys_using(id)
            .into_iter()
            .map(|fk| fk.id)
            .collect();

        self.model.detach_property(id);
        self.notify(ConventionEvent::PropertyRemoved {
            entity_type: entity,
            property: id,
            name,
        });

        for fk in foreign_keys {
            self.reset_foreign_key_properties(fk)?;
        }
        Ok(())
    }

    pub(crate) fn remove_key_node(&mut self, id: KeyId) -> ModelResult<()> {
        let Some((key, was_primary)) = self.model.detach_key(id) else {
            return Ok(());
        };
        if was_primary {
            self.notify(ConventionEvent::PrimaryKeyChanged {
                entity_type: key.entity_type,
                previous: Some(id),
            });
        }
        self.notify(ConventionEvent::KeyRemoved {
            entity_type: key.entity_type,
            key: id,
        });

        let referencing: Vec<(ForeignKeyId, EntityTypeId)> = self
            .model
            .foreign_keys()
            .filter(|fk| fk.principal_key == id)
            .map(|fk| (fk.id, fk.principal))
            .collect();
        for (fk, principal) in referencing {
            let key = self.ensure_principal_key(principal)?;
            self.retarget_principal_key(fk, key)?;
        }
        Ok(())
    }

    pub(crate) fn remove_index_node(&mut self, id: IndexId) -> ModelResult<()> {
        if let Some(index) = self.model.detach_index(id) {
            self.notify(ConventionEvent::IndexRemoved {
                entity_type: index.entity_type,
                index: id,
            });
        }
        Ok(())
    }

    /// Remove a skip navigation; `cleanup_join` also removes its join type
    pub(crate) fn remove_skip_navigation_node(
        &mut self,
        id: SkipNavigationId,
        cleanup_join: bool,
    ) -> ModelResult<()> {
        let Some(skip) = self.model.detach_skip_navigation(id) else {
            return Ok(());
        };
        if cleanup_join {
            let join = self
                .model
                .foreign_key(skip.foreign_key)
                .map(|fk| fk.dependent)
                .filter(|join| {
                    self.model
                        .entity_type(*join)
                        .is_some_and(|e| e.type_name() == PROPERTY_BAG_TYPE)
                });
            if let Some(join) = join {
                self.remove_entity_type_node(join)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
