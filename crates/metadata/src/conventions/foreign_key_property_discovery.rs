//! Foreign key property discovery

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::naming::{foreign_key_property_name, names_match};
use ormforge_core::{ForeignKeyId, ModelResult, PropertyId};
use tracing::trace;

/// Matches configured dependent properties against the names a foreign key
/// would give its shadow properties
///
/// Prefixes are tried in order: the dependent navigation name, then the
/// principal type name. `Blog` + `Id` matches `BlogId`, as does a principal
/// key already named `BlogId`. Properties of the dependent primary key are
/// only taken by one-to-one relationships. Foreign keys whose properties
/// were configured at any rank are left alone.
#[derive(Debug, Default)]
pub struct ForeignKeyPropertyDiscovery;

impl ForeignKeyPropertyDiscovery {
    fn discover(builder: &mut ModelBuilder, fk: ForeignKeyId) -> ModelResult<()> {
        let Some(f) = builder.model().foreign_key(fk) else {
            return Ok(());
        };
        if f.properties_source().is_some() {
            return Ok(());
        }

        match Self::find_candidate(builder, fk) {
            Some(properties) => {
                if properties != f.properties() {
                    trace!(foreign_key = %fk, "Foreign key properties discovered");
                }
                builder.replace_foreign_key_properties(fk, properties, None)?;
                builder.set_foreign_key_required_from_properties(fk);
            }
            None => {
                // a match made earlier no longer holds
                let configured = f
                    .properties()
                    .iter()
                    .filter_map(|p| builder.model().property(*p))
                    .any(|p| !p.is_convention_shadow());
                if configured || !builder.is_foreign_key_compatible(fk) {
                    trace!(foreign_key = %fk, "Foreign key properties reset");
                    builder.reset_foreign_key_properties(fk)?;
                }
            }
        }
        Ok(())
    }

    fn find_candidate(builder: &ModelBuilder, fk: ForeignKeyId) -> Option<Vec<PropertyId>> {
        let model = builder.model();
        let f = model.foreign_key(fk)?;
        let key = model.key(f.principal_key())?;
        let dependent_key: Vec<PropertyId> = model
            .primary_key(model.root_of(f.dependent()))
            .map(|k| k.properties().to_vec())
            .unwrap_or_default();

        let mut prefixes = Vec::with_capacity(2);
        if !f.is_ownership() {
            if let Some(navigation) = f.dependent_to_principal() {
                prefixes.push(navigation.to_string());
            }
        }
        prefixes.push(builder.type_name_of(f.principal()));

        let candidates = model.all_properties_of(f.dependent());
        prefixes.iter().find_map(|prefix| {
            let properties: Option<Vec<PropertyId>> = key
                .properties()
                .iter()
                .map(|principal| {
                    let principal = model.property(*principal)?;
                    let name = foreign_key_property_name(prefix, principal.name());
                    candidates
                        .iter()
                        .find(|p| {
                            !p.is_convention_shadow()
                                && names_match(p.name(), &name)
                                && p.data_type().is_compatible_with(principal.data_type())
                        })
                        .map(|p| p.id())
                })
                .collect();
            properties.filter(|properties| f.is_unique() || properties != &dependent_key)
        })
    }
}

impl Convention for ForeignKeyPropertyDiscovery {
    fn name(&self) -> &'static str {
        "foreign_key_property_discovery"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::ForeignKeyAdded,
            EventKind::ForeignKeyPropertiesChanged,
            EventKind::ForeignKeyUniquenessChanged,
            EventKind::NavigationAdded,
            EventKind::PropertyAdded,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        let foreign_keys = match event {
            ConventionEvent::PropertyAdded { property } => {
                let model = builder.model();
                match model.property(*property) {
                    Some(p) if !p.is_convention_shadow() => model
                        .foreign_keys_of(p.entity_type())
                        .iter()
                        .map(|fk| fk.id())
                        .collect(),
                    _ => Vec::new(),
                }
            }
            other => other.foreign_key().into_iter().collect::<Vec<_>>(),
        };
        for fk in foreign_keys {
            Self::discover(builder, fk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::ConventionSet;
    use crate::{BuilderConfig, RelationshipSpec};
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::{DataType, EntityTypeId};

    fn builder() -> (ModelBuilder, EntityTypeId) {
        let mut set = ConventionSet::new();
        set.add(ForeignKeyPropertyDiscovery);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        (builder, blog)
    }

    fn property_names(builder: &ModelBuilder, fk: ForeignKeyId) -> Vec<String> {
        let model = builder.model();
        model.property_names(model.foreign_key(fk).unwrap().properties())
    }

    #[test]
    fn test_principal_type_prefix() {
        let (mut builder, _) = builder();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        builder
            .property(post, "BlogId", Some(DataType::Int32), Explicit)
            .unwrap();
        let fk = builder
            .has_relationship(post, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();

        assert_eq!(property_names(&builder, fk), vec!["BlogId"]);
        let model = builder.model();
        assert!(model.foreign_key(fk).unwrap().is_required());
        assert_eq!(model.foreign_key(fk).unwrap().properties_source(), None);
        // the shadow property made first is gone
        assert_eq!(model.properties_of(post).len(), 1);
    }

    #[test]
    fn test_navigation_prefix_and_late_property() {
        let (mut builder, _) = builder();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(
                post,
                "Blog",
                RelationshipSpec::many_to_one().with_navigation("Owner"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        assert_eq!(property_names(&builder, fk), vec!["OwnerId"]);
        assert!(builder.model().find_property(post, "OwnerId").unwrap().is_shadow());

        // a mapped property added later replaces the shadow one
        builder
            .property(post, "ownerid", Some(DataType::Int32.into_nullable()), Explicit)
            .unwrap();
        assert_eq!(property_names(&builder, fk), vec!["ownerid"]);
        assert!(!builder.model().foreign_key(fk).unwrap().is_required());
        assert!(builder.model().find_property(post, "OwnerId").is_none());
    }

    #[test]
    fn test_dependent_key_only_for_one_to_one() {
        let (mut builder, _) = builder();
        let settings = builder.entity("Settings", Explicit).unwrap().unwrap();
        builder
            .property(settings, "BlogId", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(settings, &["BlogId"], Explicit).unwrap();

        let fk = builder
            .has_relationship(settings, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        assert_eq!(property_names(&builder, fk), vec!["BlogId1"]);

        builder.foreign_key_unique(fk, true, Explicit).unwrap();
        assert_eq!(property_names(&builder, fk), vec!["BlogId"]);
        assert!(builder.model().find_property(settings, "BlogId1").is_none());
    }

    #[test]
    fn test_configured_properties_kept() {
        let (mut builder, _) = builder();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        builder
            .property(post, "BlogId", Some(DataType::Int32), Explicit)
            .unwrap();
        builder
            .property(post, "BlogRef", Some(DataType::Int32), Explicit)
            .unwrap();
        let fk = builder
            .has_relationship(post, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        let fk = builder.has_foreign_key(fk, &["BlogRef"], Explicit).unwrap().unwrap();
        assert_eq!(property_names(&builder, fk), vec!["BlogRef"]);
    }
}
