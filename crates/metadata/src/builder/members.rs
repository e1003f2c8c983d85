//! Properties, complex properties, annotations and ignored members

use crate::ModelBuilder;
use crate::conventions::ConventionEvent;
use crate::graph::{AnnotatableId, ComplexMember};
use crate::shape::{MemberKind, TypeShape};
use ormforge_core::{
    ComplexPropertyId, ConfigurationSource, DataType, EntityTypeId, ForeignKeyId, ModelError,
    ModelResult, PropertyId, ValueGenerated,
};
use serde_json::Value;
use tracing::debug;

impl ModelBuilder {
    /// Shape registered for the type an entity type maps
    pub(crate) fn shape_of(&self, entity: EntityTypeId) -> Option<&TypeShape> {
        let type_name = self.model.entity_type(entity)?.type_name();
        self.shapes.get(type_name)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Add or configure a scalar property
    ///
    /// Without an explicit type the property must be a scalar member of the
    /// registered shape; otherwise it is added as a shadow property.
    pub fn property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        data_type: Option<DataType>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<PropertyId>> {
        self.require_entity(entity)?;
        let member_type = self.shape_of(entity).and_then(|shape| {
            shape
                .scalars()
                .find(|(m, _)| m.name == name)
                .map(|(_, t)| t.clone())
        });
        let member = member_type.as_ref().map(|_| name.to_string());

        if let Some(existing) = self.model.find_property(entity, name).map(|p| p.id()) {
            return self.run_batch(|b| b.configure_property(existing, member, data_type, source));
        }
        let Some(data_type) = data_type.or(member_type) else {
            return Err(ModelError::invalid_configuration(format!(
                "property '{}.{}' has no type and no matching member",
                self.entity_name(entity),
                name
            )));
        };

        self.run_batch(|b| {
            if !b.clear_member_name(entity, name, source, None)? {
                return Ok(None);
            }
            // the same property on derived types moves up to this one
            let mut shadowed = Vec::new();
            for derived in b.model.derived_types(entity) {
                if let Some(p) = b.model.find_declared_property(derived, name) {
                    if !source.overrides(Some(p.source())) {
                        return Ok(None);
                    }
                    shadowed.push(p.id());
                }
            }
            for property in shadowed {
                b.remove_property_node(property)?;
            }

            let id = b
                .model
                .insert_property(entity, name, member, &data_type, source);
            debug!(
                entity_type = %b.entity_name(entity),
                property = name,
                %source,
                "Property added"
            );
            b.notify(ConventionEvent::PropertyAdded { property: id });
            Ok(Some(id))
        })
    }

    fn configure_property(
        &mut self,
        id: PropertyId,
        member: Option<String>,
        data_type: Option<DataType>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<PropertyId>> {
        let Some(property) = self.model.property_mut(id) else {
            return Ok(None);
        };
        property.source = source.max_with(Some(property.source));
        // a shadow property becomes mapped once its member is known
        if property.member.is_none() && member.is_some() {
            property.member = member;
        }
        let Some(data_type) = data_type else {
            return Ok(Some(id));
        };
        if !property
            .data_type
            .try_set(data_type.non_nullable().clone(), source)
            .is_accepted()
        {
            return Ok(None);
        }
        self.property_required(id, !data_type.is_nullable(), source)?;
        Ok(Some(id))
    }

    /// Set whether a property accepts null
    pub fn property_required(
        &mut self,
        property: PropertyId,
        required: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self
            .model
            .property(property)
            .ok_or_else(|| ModelError::node_not_found(property))?;
        if !required && self.is_key_property(property) {
            if source == ConfigurationSource::Explicit {
                return Err(ModelError::NullableKeyProperty {
                    entity_type: self.entity_name(current.entity_type()),
                    property: current.name().to_string(),
                });
            }
            return Ok(false);
        }

        self.run_batch(|b| {
            let Some(p) = b.model.property_mut(property) else {
                return Ok(false);
            };
            let outcome = p.nullable.try_set(!required, source);
            if outcome.is_applied() {
                b.notify(ConventionEvent::PropertyNullabilityChanged { property });
            }
            Ok(outcome.is_accepted())
        })
    }

    /// Nullability write that never fails, used to keep foreign key
    /// properties in line with the relationship's requiredness
    pub(crate) fn sync_property_nullability(
        &mut self,
        property: PropertyId,
        nullable: bool,
        source: ConfigurationSource,
    ) -> bool {
        if nullable && self.is_key_property(property) {
            return false;
        }
        let Some(p) = self.model.property_mut(property) else {
            return false;
        };
        let outcome = p.nullable.try_set(nullable, source);
        if outcome.is_applied() {
            self.notify(ConventionEvent::PropertyNullabilityChanged { property });
        }
        outcome.is_accepted()
    }

    pub(crate) fn is_key_property(&self, property: PropertyId) -> bool {
        self.model
            .keys
            .values()
            .any(|k| k.properties.contains(&property))
    }

    /// Configure when the store generates values for a property
    pub fn value_generated(
        &mut self,
        property: PropertyId,
        value_generated: ValueGenerated,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let p = self
            .model
            .property_mut(property)
            .ok_or_else(|| ModelError::node_not_found(property))?;
        Ok(p.value_generated.try_set(value_generated, source).is_accepted())
    }

    // ========================================================================
    // Complex Properties
    // ========================================================================

    /// Add a complex property whose members come from the registered shape
    pub fn complex_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        type_name: Option<&str>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ComplexPropertyId>> {
        self.require_entity(entity)?;
        if let Some(existing) = self.model.find_complex_property(entity, name).map(|c| c.id()) {
            if let Some(c) = self.model.complex_property_mut(existing) {
                c.source = source.max_with(Some(c.source));
            }
            return Ok(Some(existing));
        }

        let member_type = self.shape_of(entity).and_then(|shape| {
            shape.find_member(name).and_then(|m| match &m.kind {
                MemberKind::Complex(t) => Some(t.clone()),
                _ => None,
            })
        });
        let Some(type_name) = type_name.map(str::to_string).or(member_type) else {
            return Err(ModelError::invalid_configuration(format!(
                "complex property '{}.{}' has no type",
                self.entity_name(entity),
                name
            )));
        };
        let shape = self
            .shapes
            .get(&type_name)
            .ok_or_else(|| ModelError::ShapeNotFound(type_name.clone()))?;
        let members: Vec<ComplexMember> = shape
            .scalars()
            .map(|(m, data_type)| ComplexMember {
                name: m.name.clone(),
                data_type: data_type.non_nullable().clone(),
                nullable: data_type.is_nullable(),
            })
            .collect();

        self.run_batch(|b| {
            if !b.clear_member_name(entity, name, source, None)? {
                return Ok(None);
            }
            let id = b
                .model
                .insert_complex_property(entity, name, &type_name, false, members, source);
            debug!(
                entity_type = %b.entity_name(entity),
                complex_property = name,
                "Complex property added"
            );
            b.notify(ConventionEvent::ComplexPropertyAdded {
                complex_property: id,
            });
            Ok(Some(id))
        })
    }

    /// Set whether a complex property accepts null
    pub fn complex_property_required(
        &mut self,
        complex_property: ComplexPropertyId,
        required: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let c = self
            .model
            .complex_property_mut(complex_property)
            .ok_or_else(|| ModelError::node_not_found(complex_property))?;
        Ok(c.nullable.try_set(!required, source).is_accepted())
    }

    // ========================================================================
    // Ignored Members
    // ========================================================================

    /// Exclude a member name from an entity type
    ///
    /// Whatever currently uses the name is removed when the rank allows it.
    pub fn ignore(
        &mut self,
        entity: EntityTypeId,
        member: &str,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self.require_entity(entity)?.ignored_source(member);
        if let Some(ignored) = current {
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.ignored.insert(member.to_string(), source.max_with(Some(ignored)));
            }
            return Ok(true);
        }

        self.run_batch(|b| {
            if !b.clear_member_name(entity, member, source, None)? {
                return Ok(false);
            }
            for derived in b.model.derived_types(entity) {
                b.clear_member_name(derived, member, source, None)?;
            }
            if let Some(e) = b.model.entity_type_mut(entity) {
                e.ignored.insert(member.to_string(), source);
            }
            debug!(entity_type = %b.entity_name(entity), member, %source, "Member ignored");
            b.notify(ConventionEvent::EntityTypeMemberIgnored {
                entity_type: entity,
                name: member.to_string(),
            });
            Ok(true)
        })
    }

    /// Free a member name for a new use at `source`
    ///
    /// Returns false when a stronger configuration holds the name. A
    /// navigation of `keep` is left alone.
    pub(crate) fn clear_member_name(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        source: ConfigurationSource,
        keep: Option<ForeignKeyId>,
    ) -> ModelResult<bool> {
        if let Some(ignored) = self.require_entity(entity)?.ignored_source(name) {
            if !source.overrides(Some(ignored)) {
                return Ok(false);
            }
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.ignored.remove(name);
            }
        }

        if let Some(p) = self.model.find_declared_property(entity, name) {
            if !source.overrides(Some(p.source())) {
                return Ok(false);
            }
            let id = p.id();
            self.remove_property_node(id)?;
        }

        if let Some(c) = self.model.find_complex_property(entity, name) {
            if !source.overrides(Some(c.source())) {
                return Ok(false);
            }
            let id = c.id();
            self.model.detach_complex_property(id);
        }

        if let Some(navigation) = self.model.find_navigation(entity, name) {
            if Some(navigation.foreign_key) != keep {
                let fk_source = self
                    .model
                    .foreign_key(navigation.foreign_key)
                    .map(|fk| fk.source());
                if source.overrides(fk_source) {
                    self.remove_foreign_key_node(navigation.foreign_key, true)?;
                } else if source.overrides(navigation.source) {
                    if let Some(fk) = self.model.foreign_key_mut(navigation.foreign_key) {
                        fk.navigation_slot(navigation.on_dependent).force(None, None);
                    }
                    self.notify(ConventionEvent::NavigationRemoved {
                        foreign_key: navigation.foreign_key,
                        entity_type: entity,
                        name: name.to_string(),
                    });
                } else {
                    return Ok(false);
                }
            }
        }

        if let Some(skip) = self.model.find_skip_navigation(entity, name) {
            if !source.overrides(Some(skip.source())) {
                return Ok(false);
            }
            let id = skip.id();
            self.remove_skip_navigation_node(id, true)?;
        }
        Ok(true)
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    /// Set an annotation on any node
    pub fn has_annotation(
        &mut self,
        target: AnnotatableId,
        name: &str,
        value: Value,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        self.run_batch(|b| {
            let annotations = b
                .model
                .annotations_mut(target)
                .ok_or_else(|| ModelError::node_not_found(target))?;
            let outcome = annotations.try_set(name, value, source);
            if outcome.is_applied() {
                b.notify(ConventionEvent::AnnotationChanged {
                    target,
                    name: name.to_string(),
                });
            }
            Ok(outcome.is_accepted())
        })
    }

    /// Remove an annotation unless a stronger source set it
    pub fn remove_annotation(
        &mut self,
        target: AnnotatableId,
        name: &str,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        self.run_batch(|b| {
            let annotations = b
                .model
                .annotations_mut(target)
                .ok_or_else(|| ModelError::node_not_found(target))?;
            let outcome = annotations.try_remove(name, source);
            if outcome.is_applied() {
                b.notify(ConventionEvent::AnnotationChanged {
                    target,
                    name: name.to_string(),
                });
            }
            Ok(outcome.is_accepted())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
