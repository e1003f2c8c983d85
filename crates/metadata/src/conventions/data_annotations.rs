//! Applies member markers at DataAnnotation rank

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::graph::AnnotatableId;
use crate::shape::Marker;
use ormforge_core::{ConfigurationSource, EntityTypeId, ForeignKeyId, ModelResult, PropertyId};
use serde_json::json;

/// Annotation carrying a `MaxLength` marker
pub const MAX_LENGTH_ANNOTATION: &str = "MaxLength";

const RANK: ConfigurationSource = ConfigurationSource::DataAnnotation;

/// Turns `Key`, `Required`, `MaxLength` and `ForeignKey` markers into
/// configuration
#[derive(Debug, Default)]
pub struct DataAnnotations;

impl DataAnnotations {
    fn apply_key(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let Some(shape) = builder.shape_of(entity) else {
            return Ok(());
        };
        let names: Vec<String> = shape
            .scalars()
            .filter(|(m, _)| m.has_marker(&Marker::Key))
            .map(|(m, _)| m.name.clone())
            .collect();
        let all_mapped = names
            .iter()
            .all(|n| builder.model().find_property(entity, n).is_some());
        if names.is_empty() || !all_mapped {
            return Ok(());
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        builder.primary_key(entity, &names, RANK)?;
        Ok(())
    }

    fn apply_property(builder: &mut ModelBuilder, property: PropertyId) -> ModelResult<()> {
        let Some(p) = builder.model().property(property) else {
            return Ok(());
        };
        let (entity, Some(member)) = (p.entity_type(), p.member().map(str::to_string)) else {
            return Ok(());
        };
        let Some(info) = builder.shape_of(entity).and_then(|s| s.find_member(&member)) else {
            return Ok(());
        };
        let required = info.has_marker(&Marker::Required);
        let max_length = info.max_length();

        if required {
            builder.property_required(property, true, RANK)?;
        }
        if let Some(max_length) = max_length {
            builder.has_annotation(
                AnnotatableId::Property(property),
                MAX_LENGTH_ANNOTATION,
                json!(max_length),
                RANK,
            )?;
        }
        Ok(())
    }

    /// Markers on a navigation member and on scalars naming it
    fn apply_navigation(
        builder: &mut ModelBuilder,
        fk: ForeignKeyId,
        on_dependent: bool,
    ) -> ModelResult<()> {
        if !on_dependent {
            return Ok(());
        }
        let Some(f) = builder.model().foreign_key(fk) else {
            return Ok(());
        };
        let (dependent, Some(navigation)) =
            (f.dependent(), f.dependent_to_principal().map(str::to_string))
        else {
            return Ok(());
        };
        let Some(shape) = builder.shape_of(dependent) else {
            return Ok(());
        };

        let required = shape
            .find_member(&navigation)
            .is_some_and(|m| m.has_marker(&Marker::Required));
        // a marker on the navigation names the property, one on a scalar
        // names the navigation
        let mut names: Vec<String> = shape
            .find_member(&navigation)
            .and_then(|m| m.foreign_key_marker())
            .map(|list| list.split(',').map(|n| n.trim().to_string()).collect())
            .unwrap_or_default();
        if names.is_empty() {
            names = shape
                .scalars()
                .filter(|(m, _)| m.foreign_key_marker() == Some(navigation.as_str()))
                .map(|(m, _)| m.name.clone())
                .collect();
        }

        let mut fk = Some(fk);
        if !names.is_empty() {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            if let Some(current) = fk {
                fk = builder.has_foreign_key(current, &names, RANK)?;
            }
        }
        if let (true, Some(fk)) = (required, fk) {
            builder.foreign_key_required(fk, true, RANK)?;
        }
        Ok(())
    }
}

impl Convention for DataAnnotations {
    fn name(&self) -> &'static str {
        "data_annotations"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::EntityTypeAdded,
            EventKind::PropertyAdded,
            EventKind::NavigationAdded,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        match event {
            ConventionEvent::EntityTypeAdded { entity_type } => {
                Self::apply_key(builder, *entity_type)
            }
            ConventionEvent::PropertyAdded { property } => {
                Self::apply_property(builder, *property)?;
                let entity = builder.model().property(*property).map(|p| p.entity_type());
                match entity {
                    Some(entity) => Self::apply_key(builder, entity),
                    None => Ok(()),
                }
            }
            ConventionEvent::NavigationAdded {
                foreign_key,
                on_dependent,
            } => Self::apply_navigation(builder, *foreign_key, *on_dependent),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{ConventionSet, PropertyDiscovery};
    use crate::shape::{MemberInfo, TypeShape};
    use crate::{BuilderConfig, RelationshipSpec};
    use ormforge_core::ConfigurationSource::{Convention as ByConvention, Explicit};
    use ormforge_core::DataType;

    fn builder() -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(PropertyDiscovery);
        set.add(DataAnnotations);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        builder
            .register_shape(
                TypeShape::new("Book")
                    .member(MemberInfo::scalar("Isbn", DataType::String).with_marker(Marker::Key))
                    .member(
                        MemberInfo::scalar("Title", DataType::String.into_nullable())
                            .with_marker(Marker::Required)
                            .with_marker(Marker::MaxLength(200)),
                    )
                    .member(
                        MemberInfo::scalar("WriterRef", DataType::Int32.into_nullable())
                            .with_marker(Marker::ForeignKey("Author".to_string())),
                    )
                    .member(
                        MemberInfo::reference("Author", "Author").with_marker(Marker::Required),
                    ),
            )
            .unwrap();
        builder
            .register_shape(TypeShape::new("Author").scalar("Id", DataType::Int32))
            .unwrap();
        builder
    }

    #[test]
    fn test_property_markers() {
        let mut builder = builder();
        let book = builder.entity("Book", Explicit).unwrap().unwrap();
        let model = builder.model();

        let title = model.find_property(book, "Title").unwrap();
        assert!(!title.is_nullable());
        assert_eq!(title.nullability_source(), Some(RANK));
        assert_eq!(title.annotations().value(MAX_LENGTH_ANNOTATION), Some(&json!(200)));

        let key = model.primary_key(book).unwrap();
        assert_eq!(model.property_names(key.properties()), vec!["Isbn"]);
        assert_eq!(model.entity_type(book).unwrap().primary_key_source(), Some(RANK));
    }

    #[test]
    fn test_explicit_overrides_marker() {
        let mut builder = builder();
        let book = builder.entity("Book", Explicit).unwrap().unwrap();
        let title = builder.model().find_property(book, "Title").unwrap().id();
        assert!(builder.property_required(title, false, Explicit).unwrap());
        assert!(!builder.property_required(title, true, ByConvention).unwrap());
        assert!(builder.model().property(title).unwrap().is_nullable());
    }

    #[test]
    fn test_navigation_markers() {
        let mut builder = builder();
        let book = builder.entity("Book", Explicit).unwrap().unwrap();
        let author = builder.entity("Author", Explicit).unwrap().unwrap();
        builder.primary_key(author, &["Id"], Explicit).unwrap();
        let fk = builder
            .has_relationship(
                book,
                "Author",
                RelationshipSpec::many_to_one().with_navigation("Author"),
                Explicit,
            )
            .unwrap()
            .unwrap();

        let model = builder.model();
        let fk = model.foreign_key(fk).unwrap();
        assert_eq!(model.property_names(fk.properties()), vec!["WriterRef"]);
        assert_eq!(fk.properties_source(), Some(RANK));
        assert!(fk.is_required());
        assert!(!model.find_property(book, "WriterRef").unwrap().is_nullable());
        assert!(model.find_property(book, "AuthorId").is_none());
    }
}
