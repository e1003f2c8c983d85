//! Relationship discovery from navigation members

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::graph::AnnotatableId;
use crate::shape::{MemberInfo, TypeShape};
use crate::{OwnershipSpec, RelationshipSpec};
use ormforge_core::{ConfigurationSource, EntityTypeId, ModelResult};
use serde_json::{Map, Value};
use tracing::debug;

/// Entity type annotation listing navigations whose inverse could not be
/// chosen, as `{ navigation: [candidate inverses] }`
pub const AMBIGUOUS_NAVIGATIONS_ANNOTATION: &str = "ormforge:AmbiguousNavigations";

const RANK: ConfigurationSource = ConfigurationSource::Convention;

/// Pairs the navigation members of a new entity type with their inverses
/// and configures the relationships
///
/// A navigation with several inverse candidates is left alone and recorded
/// in [`AMBIGUOUS_NAVIGATIONS_ANNOTATION`]; validation reports it unless
/// the relationship is configured some other way.
#[derive(Debug, Default)]
pub struct RelationshipDiscovery;

impl RelationshipDiscovery {
    fn discover(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let Some(shape) = builder.shape_of(entity).cloned() else {
            return Ok(());
        };
        for member in shape.navigations() {
            if builder.model().entity_type(entity).is_none() {
                break;
            }
            Self::discover_navigation(builder, entity, &shape, member)?;
        }
        Ok(())
    }

    fn discover_navigation(
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        shape: &TypeShape,
        member: &MemberInfo,
    ) -> ModelResult<()> {
        let Some(target_type) = member.kind.target() else {
            return Ok(());
        };
        if member.is_not_mapped() || builder.model().is_member_name_taken(entity, &member.name) {
            return Ok(());
        }
        let Some(target_shape) = builder.shapes().get(target_type).cloned() else {
            return Ok(());
        };

        if target_shape.owned {
            let inverse = target_shape
                .navigations()
                .find(|m| !m.kind.is_collection() && m.kind.target() == Some(shape.name.as_str()))
                .map(|m| m.name.clone());
            let mut spec = if member.kind.is_collection() {
                OwnershipSpec::many(&member.name)
            } else {
                OwnershipSpec::one(&member.name)
            };
            spec.inverse = inverse;
            builder.has_ownership(entity, target_type, spec, RANK)?;
            return Ok(());
        }

        let existing_target = builder.model().find_entity_type(target_type).map(|e| e.id());
        let candidates: Vec<&MemberInfo> = target_shape
            .navigations()
            .filter(|m| m.kind.target() == Some(shape.name.as_str()) && !m.is_not_mapped())
            .filter(|m| !(target_type == shape.name && m.name == member.name))
            .filter(|m| {
                // an inverse already used by another relationship is taken
                existing_target.is_none_or(|target| {
                    builder
                        .model()
                        .find_navigation(target, &m.name)
                        .is_none_or(|n| n.target_entity_type == entity)
                })
            })
            .collect();

        if candidates.len() > 1 {
            let names: Vec<String> = candidates.iter().map(|m| m.name.clone()).collect();
            return Self::record_ambiguity(builder, entity, &member.name, names);
        }
        let inverse = candidates.first().copied();

        // the side whose shape names the foreign key is the dependent
        if let Some(inverse) = inverse {
            let one_to_one = !member.kind.is_collection() && !inverse.kind.is_collection();
            if one_to_one && Self::declares_foreign_key(&target_shape, &inverse.name) {
                let Some(target) = builder.entity(target_type, RANK)? else {
                    return Ok(());
                };
                let name = builder.entity_name(entity);
                let spec = RelationshipSpec::one_to_one()
                    .with_navigation(&inverse.name)
                    .with_inverse(&member.name);
                debug!(navigation = %inverse.name, target = %name, "Relationship discovered");
                builder.has_relationship(target, &name, spec, RANK)?;
                return Ok(());
            }
        }

        let spec = match (member.kind.is_collection(), inverse.map(|m| m.kind.is_collection())) {
            (false, Some(false)) => RelationshipSpec::one_to_one(),
            (false, _) => RelationshipSpec::many_to_one(),
            (true, Some(true)) => RelationshipSpec::many_to_many(),
            (true, _) => RelationshipSpec::one_to_many(),
        };
        let mut spec = spec.with_navigation(&member.name);
        if let Some(inverse) = inverse {
            spec = spec.with_inverse(&inverse.name);
        }
        debug!(navigation = %member.name, target = target_type, "Relationship discovered");
        builder.has_relationship(entity, target_type, spec, RANK)?;
        Ok(())
    }

    /// Whether a shape carries a `ForeignKey` marker for the navigation
    fn declares_foreign_key(shape: &TypeShape, navigation: &str) -> bool {
        shape.members.iter().any(|m| {
            (m.name == navigation && m.foreign_key_marker().is_some())
                || m.foreign_key_marker() == Some(navigation)
        })
    }

    fn record_ambiguity(
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        navigation: &str,
        candidates: Vec<String>,
    ) -> ModelResult<()> {
        let target = AnnotatableId::EntityType(entity);
        let mut recorded = builder
            .model()
            .annotations_of(target)
            .and_then(|a| a.value(AMBIGUOUS_NAVIGATIONS_ANNOTATION))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);
        recorded.insert(
            navigation.to_string(),
            Value::Array(candidates.into_iter().map(Value::String).collect()),
        );
        debug!(navigation, "Ambiguous navigation recorded");
        builder.has_annotation(
            target,
            AMBIGUOUS_NAVIGATIONS_ANNOTATION,
            Value::Object(recorded),
            RANK,
        )?;
        Ok(())
    }
}

impl Convention for RelationshipDiscovery {
    fn name(&self) -> &'static str {
        "relationship_discovery"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::EntityTypeAdded]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        match event {
            ConventionEvent::EntityTypeAdded { entity_type } => {
                Self::discover(builder, *entity_type)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuilderConfig;
    use crate::conventions::{ConventionSet, KeyDiscovery, PropertyDiscovery};
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::DataType;
    use serde_json::json;

    fn builder(shapes: Vec<TypeShape>) -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(PropertyDiscovery);
        set.add(KeyDiscovery);
        set.add(RelationshipDiscovery);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        for shape in shapes {
            builder.register_shape(shape).unwrap();
        }
        builder
    }

    #[test]
    fn test_inverse_pair_discovered() {
        let mut builder = builder(vec![
            TypeShape::new("Blog")
                .scalar("Id", DataType::Int32)
                .collection("Posts", "Post"),
            TypeShape::new("Post")
                .scalar("Id", DataType::Int32)
                .reference("Blog", "Blog"),
        ]);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        let model = builder.model();
        let post = model.find_entity_type("Post").unwrap().id();

        let posts = model.find_navigation(blog, "Posts").unwrap();
        assert!(posts.is_collection);
        let fk = model.foreign_key(posts.foreign_key).unwrap();
        assert_eq!(fk.dependent(), post);
        assert_eq!(fk.dependent_to_principal(), Some("Blog"));
        assert_eq!(fk.source(), ConfigurationSource::Convention);
        assert_eq!(model.property_names(fk.properties()), vec!["BlogId"]);
        assert_eq!(model.foreign_keys().count(), 1);
    }

    #[test]
    fn test_self_reference_pairs_distinct_members() {
        let mut builder = builder(vec![
            TypeShape::new("Employee")
                .scalar("Id", DataType::Int32)
                .reference("Manager", "Employee")
                .collection("Reports", "Employee"),
        ]);
        let employee = builder.entity("Employee", Explicit).unwrap().unwrap();
        let model = builder.model();
        let manager = model.find_navigation(employee, "Manager").unwrap();
        let fk = model.foreign_key(manager.foreign_key).unwrap();
        assert!(fk.is_self_referencing());
        assert_eq!(fk.principal_to_dependent(), Some("Reports"));
        assert_eq!(model.property_names(fk.properties()), vec!["ManagerId"]);
    }

    #[test]
    fn test_several_inverses_recorded_as_ambiguous() {
        let mut builder = builder(vec![
            TypeShape::new("Person")
                .scalar("Id", DataType::Int32)
                .collection("Authored", "Post")
                .collection("Edited", "Post"),
            TypeShape::new("Post")
                .scalar("Id", DataType::Int32)
                .reference("Author", "Person")
                .reference("Editor", "Person"),
        ]);
        let person = builder.entity("Person", Explicit).unwrap().unwrap();
        let model = builder.model();
        assert_eq!(model.foreign_keys().count(), 0);
        let recorded = model
            .entity_type(person)
            .unwrap()
            .annotations()
            .value(AMBIGUOUS_NAVIGATIONS_ANNOTATION)
            .cloned();
        assert_eq!(
            recorded,
            Some(json!({
                "Authored": ["Author", "Editor"],
                "Edited": ["Author", "Editor"],
            }))
        );
    }

    #[test]
    fn test_owned_target_becomes_ownership() {
        let mut builder = builder(vec![
            TypeShape::new("Customer")
                .scalar("Id", DataType::Int32)
                .reference("Address", "Address"),
            TypeShape::new("Address")
                .owned()
                .scalar("City", DataType::String),
        ]);
        let customer = builder.entity("Customer", Explicit).unwrap().unwrap();
        let model = builder.model();
        let ownership = model.find_navigation(customer, "Address").unwrap();
        let fk = model.foreign_key(ownership.foreign_key).unwrap();
        assert!(fk.is_ownership());
        assert!(fk.is_unique());
        let owned = model.entity_type(fk.dependent()).unwrap();
        assert_eq!(owned.name(), "Customer.Address#Address");
        assert!(model.find_property(owned.id(), "City").is_some());
    }
}
