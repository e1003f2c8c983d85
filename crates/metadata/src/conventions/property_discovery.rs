//! Adds the scalar and complex members of a shape as properties

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::shape::MemberKind;
use ormforge_core::{ConfigurationSource, ModelResult};
use tracing::trace;

/// Maps every scalar member of a new entity type's shape; `NotMapped`
/// members are ignored at DataAnnotation rank
#[derive(Debug, Default)]
pub struct PropertyDiscovery;

impl Convention for PropertyDiscovery {
    fn name(&self) -> &'static str {
        "property_discovery"
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
        let ConventionEvent::EntityTypeAdded { entity_type } = event else {
            return Ok(());
        };
        let Some(shape) = builder.shape_of(*entity_type).cloned() else {
            return Ok(());
        };

        for member in &shape.members {
            if member.is_not_mapped() {
                builder.ignore(*entity_type, &member.name, ConfigurationSource::DataAnnotation)?;
                continue;
            }
            match &member.kind {
                MemberKind::Scalar(data_type) => {
                    builder.property(
                        *entity_type,
                        &member.name,
                        Some(data_type.clone()),
                        ConfigurationSource::Convention,
                    )?;
                }
                MemberKind::Complex(type_name) if builder.shapes().contains(type_name) => {
                    builder.complex_property(
                        *entity_type,
                        &member.name,
                        Some(type_name.as_str()),
                        ConfigurationSource::Convention,
                    )?;
                }
                MemberKind::Complex(type_name) => {
                    trace!(
                        member = %member.name,
                        type_name = %type_name,
                        "Complex member has no shape"
                    );
                }
                MemberKind::Reference(_) | MemberKind::Collection(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::ConventionSet;
    use crate::shape::{Marker, MemberInfo, TypeShape};
    use crate::BuilderConfig;
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::DataType;

    fn builder() -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(PropertyDiscovery);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        builder
            .register_shape(
                TypeShape::new("Blog")
                    .scalar("Id", DataType::Int32)
                    .scalar("Title", DataType::String.into_nullable())
                    .member(
                        MemberInfo::scalar("Cache", DataType::Bytes).with_marker(Marker::NotMapped),
                    )
                    .collection("Posts", "Post"),
            )
            .unwrap();
        builder
    }

    #[test]
    fn test_scalars_discovered() {
        let mut builder = builder();
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        let model = builder.model();

        let names: Vec<_> = model.properties_of(blog).iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Id", "Title"]);
        let title = model.find_property(blog, "Title").unwrap();
        assert!(title.is_nullable());
        assert_eq!(title.member(), Some("Title"));
        assert_eq!(title.source(), ConfigurationSource::Convention);
        assert_eq!(
            model.entity_type(blog).unwrap().ignored_source("Cache"),
            Some(ConfigurationSource::DataAnnotation)
        );
    }

    #[test]
    fn test_explicit_ignore_wins_over_discovery() {
        let mut builder = builder();
        builder
            .batch(|b| {
                let blog = b.entity("Blog", Explicit)?;
                if let Some(blog) = blog {
                    b.ignore(blog, "Title", Explicit)?;
                }
                Ok(())
            })
            .unwrap();
        let blog = builder.model().find_entity_type("Blog").unwrap().id();
        assert!(builder.model().find_property(blog, "Title").is_none());
    }
}
