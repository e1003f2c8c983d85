//! Primary key discovery

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::naming::{PROPERTY_BAG_TYPE, names_match};
use ormforge_core::{ConfigurationSource, DataType, EntityTypeId, ModelResult, PropertyId};
use tracing::trace;

/// Finds a primary key by name, or derives one from ownership
///
/// - regular types: the first property matching a configured key name
///   pattern (`Id`, `{type}Id`)
/// - owned references: the ownership foreign key properties
/// - owned collections: the ownership foreign key properties plus a
///   synthetic key property
#[derive(Debug, Default)]
pub struct KeyDiscovery;

impl KeyDiscovery {
    fn discover(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let Some(e) = builder.model().entity_type(entity) else {
            return Ok(());
        };
        if e.base_type().is_some() || e.type_name() == PROPERTY_BAG_TYPE {
            return Ok(());
        }
        if !ConfigurationSource::Convention.overrides(e.primary_key_source()) {
            return Ok(());
        }
        let type_name = e.type_name().to_string();

        let ownership = builder
            .model()
            .ownership(entity)
            .map(|fk| (fk.properties().to_vec(), fk.is_unique()));
        let properties = match ownership {
            Some((fk_properties, true)) => fk_properties,
            Some((mut fk_properties, false)) => {
                let Some(synthetic) = Self::synthetic_key(builder, entity, &fk_properties)? else {
                    return Ok(());
                };
                fk_properties.push(synthetic);
                fk_properties
            }
            None => {
                let candidates = builder.config().key_names_for(&type_name);
                let properties = builder.model().properties_of(entity);
                let found = candidates.iter().find_map(|candidate| {
                    properties
                        .iter()
                        .find(|p| names_match(p.name(), candidate) && !p.is_nullable())
                        .map(|p| p.id())
                });
                match found {
                    Some(property) => vec![property],
                    None => return Ok(()),
                }
            }
        };
        if properties.is_empty() {
            return Ok(());
        }

        trace!(entity_type = %entity, "Primary key discovered");
        builder.primary_key_properties(entity, properties, ConfigurationSource::Convention)?;
        Ok(())
    }

    /// Extra key property distinguishing the elements of an owned collection
    fn synthetic_key(
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        fk_properties: &[PropertyId],
    ) -> ModelResult<Option<PropertyId>> {
        let name = builder.config().owned_collection_key.clone();
        let existing = builder
            .model()
            .find_property(entity, &name)
            .filter(|p| !fk_properties.contains(&p.id()))
            .map(|p| p.id());
        if existing.is_some() {
            return Ok(existing);
        }
        builder.property(
            entity,
            &name,
            Some(DataType::Int32),
            ConfigurationSource::Convention,
        )
    }
}

impl Convention for KeyDiscovery {
    fn name(&self) -> &'static str {
        "key_discovery"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::EntityTypeAdded,
            EventKind::EntityTypeBaseTypeChanged,
            EventKind::PropertyAdded,
            EventKind::KeyRemoved,
            EventKind::ForeignKeyOwnershipChanged,
            EventKind::ForeignKeyUniquenessChanged,
            EventKind::ForeignKeyPropertiesChanged,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        let entity = match event {
            ConventionEvent::EntityTypeAdded { entity_type }
            | ConventionEvent::EntityTypeBaseTypeChanged { entity_type }
            | ConventionEvent::KeyRemoved { entity_type, .. } => Some(*entity_type),
            ConventionEvent::PropertyAdded { property } => {
                builder.model().property(*property).map(|p| p.entity_type())
            }
            other => other
                .foreign_key()
                .and_then(|fk| builder.model().foreign_key(fk))
                .filter(|fk| fk.is_ownership())
                .map(|fk| fk.dependent()),
        };
        match entity {
            Some(entity) => Self::discover(builder, entity),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{ConventionSet, PropertyDiscovery};
    use crate::shape::TypeShape;
    use crate::{BuilderConfig, OwnershipSpec};
    use ormforge_core::ConfigurationSource::Explicit;

    fn builder(config: BuilderConfig) -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(PropertyDiscovery);
        set.add(KeyDiscovery);
        ModelBuilder::with_conventions(config, set)
    }

    fn key_names(builder: &ModelBuilder, entity: EntityTypeId) -> Vec<String> {
        let model = builder.model();
        model
            .primary_key(entity)
            .map(|k| model.property_names(k.properties()))
            .unwrap_or_default()
    }

    #[test]
    fn test_id_and_type_id() {
        let mut builder = builder(BuilderConfig::default());
        builder
            .register_shape(TypeShape::new("Blog").scalar("BlogId", DataType::Int32))
            .unwrap();
        builder
            .register_shape(
                TypeShape::new("Post")
                    .scalar("PostId", DataType::Int32)
                    .scalar("Id", DataType::Int64),
            )
            .unwrap();
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        assert_eq!(key_names(&builder, blog), vec!["BlogId"]);
        // patterns are tried in order
        assert_eq!(key_names(&builder, post), vec!["Id"]);
    }

    #[test]
    fn test_custom_patterns() {
        let config = BuilderConfig::default().with_key_name_patterns(["Key"]);
        let mut builder = builder(config);
        builder
            .register_shape(
                TypeShape::new("Tag")
                    .scalar("Id", DataType::Int32)
                    .scalar("key", DataType::String),
            )
            .unwrap();
        let tag = builder.entity("Tag", Explicit).unwrap().unwrap();
        assert_eq!(key_names(&builder, tag), vec!["key"]);
    }

    #[test]
    fn test_explicit_key_not_replaced() {
        let mut builder = builder(BuilderConfig::default());
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Url", Some(DataType::String), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Url"], Explicit).unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        assert_eq!(key_names(&builder, blog), vec!["Url"]);
    }

    #[test]
    fn test_owned_keys() {
        let mut builder = builder(BuilderConfig::default());
        builder
            .register_shape(TypeShape::new("Customer").scalar("Id", DataType::Int32))
            .unwrap();
        builder
            .register_shape(TypeShape::new("Address").scalar("City", DataType::String))
            .unwrap();
        let customer = builder.entity("Customer", Explicit).unwrap().unwrap();

        let home = builder
            .has_ownership(customer, "Address", OwnershipSpec::one("Home"), Explicit)
            .unwrap()
            .unwrap();
        let others = builder
            .has_ownership(customer, "Address", OwnershipSpec::many("Others"), Explicit)
            .unwrap()
            .unwrap();

        let home = builder.model().foreign_key(home).unwrap().dependent();
        let others = builder.model().foreign_key(others).unwrap().dependent();
        assert_eq!(key_names(&builder, home), vec!["CustomerId"]);
        assert_eq!(key_names(&builder, others), vec!["CustomerId", "Id"]);
    }
}
