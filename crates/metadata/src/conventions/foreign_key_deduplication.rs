//! Merges foreign keys that describe the same relationship

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::graph::ForeignKey;
use ormforge_core::{ConfigurationSource, ForeignKeyId, ModelResult};
use tracing::debug;

/// Two foreign keys between the same entity types over the same properties
/// and principal key, with navigations that do not contradict each other,
/// are one relationship
///
/// The foreign key configured at the stronger rank survives (the older one
/// on a tie) and takes over the navigations of the other.
#[derive(Debug, Default)]
pub struct ForeignKeyDeduplication;

impl ForeignKeyDeduplication {
    fn rank(fk: &ForeignKey) -> ConfigurationSource {
        fk.source().max_with(fk.properties_source())
    }

    fn is_duplicate(a: &ForeignKey, b: &ForeignKey) -> bool {
        let navigations_agree = [true, false].into_iter().all(|on_dependent| {
            match (a.navigation(on_dependent), b.navigation(on_dependent)) {
                (Some(x), Some(y)) => x == y,
                _ => true,
            }
        });
        a.id() != b.id()
            && a.dependent() == b.dependent()
            && a.principal() == b.principal()
            && a.principal_key() == b.principal_key()
            && !a.properties().is_empty()
            && a.properties() == b.properties()
            && a.is_ownership() == b.is_ownership()
            && navigations_agree
    }

    fn deduplicate(builder: &mut ModelBuilder, fk: ForeignKeyId) -> ModelResult<()> {
        let model = builder.model();
        let Some(current) = model.foreign_key(fk) else {
            return Ok(());
        };
        let Some(other) = model
            .foreign_keys_of(current.dependent())
            .into_iter()
            .find(|other| Self::is_duplicate(current, other))
        else {
            return Ok(());
        };

        let (winner, loser) = match Self::rank(current).cmp(&Self::rank(other)) {
            std::cmp::Ordering::Greater => (current, other),
            std::cmp::Ordering::Less => (other, current),
            std::cmp::Ordering::Equal if current.id() < other.id() => (current, other),
            std::cmp::Ordering::Equal => (other, current),
        };
        let (winner, loser_id) = (winner.id(), loser.id());
        let navigations: Vec<(String, bool, ConfigurationSource)> = [true, false]
            .into_iter()
            .filter_map(|on_dependent| {
                let name = loser.navigation(on_dependent)?;
                let source = loser
                    .navigation_source(on_dependent)
                    .unwrap_or(loser.source());
                Some((name.to_string(), on_dependent, source))
            })
            .collect();
        let source = loser.source();
        let properties_source = loser.properties_source();

        debug!(kept = %winner, removed = %loser_id, "Duplicate foreign key merged");
        builder.remove_foreign_key_node(loser_id, false)?;
        if let Some(f) = builder.model.foreign_key_mut(winner) {
            f.source = source.max_with(Some(f.source));
            if let Some(properties_source) = properties_source {
                f.properties_source = Some(properties_source.max_with(f.properties_source));
            }
        }
        for (name, on_dependent, source) in navigations {
            builder.set_navigation(winner, &name, on_dependent, source)?;
        }
        Ok(())
    }
}

impl Convention for ForeignKeyDeduplication {
    fn name(&self) -> &'static str {
        "foreign_key_deduplication"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::ForeignKeyAdded,
            EventKind::ForeignKeyPropertiesChanged,
            EventKind::NavigationRemoved,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        match event.foreign_key() {
            Some(fk) => Self::deduplicate(builder, fk),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::ConventionSet;
    use crate::{BuilderConfig, RelationshipSpec};
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::DataType;

    #[test]
    fn test_converging_foreign_keys_merged() {
        let mut set = ConventionSet::new();
        set.add(ForeignKeyDeduplication);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();

        let posts = builder
            .has_relationship(
                blog,
                "Post",
                RelationshipSpec::one_to_many().with_navigation("Posts"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        let featured = builder
            .has_relationship(
                post,
                "Blog",
                RelationshipSpec::many_to_one()
                    .with_navigation("Blog")
                    .with_inverse("Featured"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        assert_ne!(posts, featured);

        builder.has_navigation(featured, None, false, Explicit).unwrap();
        let shared = builder.model().property_names(
            builder.model().foreign_key(posts).unwrap().properties(),
        );
        let shared: Vec<&str> = shared.iter().map(String::as_str).collect();
        let merged = builder.has_foreign_key(featured, &shared, Explicit).unwrap();

        // the older foreign key survives and the handle follows it
        assert_eq!(merged, Some(posts));
        let model = builder.model();
        assert!(model.foreign_key(featured).is_none());
        let fk = model.foreign_key(posts).unwrap();
        assert_eq!(fk.dependent_to_principal(), Some("Blog"));
        assert_eq!(fk.principal_to_dependent(), Some("Posts"));
        assert_eq!(fk.properties_source(), Some(Explicit));
        assert_eq!(model.foreign_keys().count(), 1);
    }

    #[test]
    fn test_principal_key_retarget_follows_merge() {
        let mut set = ConventionSet::new();
        set.add(ForeignKeyDeduplication);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder
            .property(blog, "Code", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        builder
            .property(post, "BlogCode", Some(DataType::Int32), Explicit)
            .unwrap();

        let posts = builder
            .has_relationship(
                blog,
                "Post",
                RelationshipSpec::one_to_many().with_navigation("Posts"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        let posts = builder.has_foreign_key(posts, &["BlogCode"], Explicit).unwrap().unwrap();
        let posts = builder.has_principal_key(posts, &["Code"], Explicit).unwrap().unwrap();

        let featured = builder
            .has_relationship(
                post,
                "Blog",
                RelationshipSpec::many_to_one()
                    .with_navigation("Blog")
                    .with_inverse("Featured"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        assert_ne!(posts, featured);
        builder.has_navigation(featured, None, false, Explicit).unwrap();
        let featured = builder
            .has_foreign_key(featured, &["BlogCode"], Explicit)
            .unwrap()
            .unwrap();
        assert_eq!(builder.model().foreign_keys().count(), 2);

        // same properties and principal key once retargeted
        let merged = builder.has_principal_key(featured, &["Code"], Explicit).unwrap();

        assert_eq!(merged, Some(posts));
        let model = builder.model();
        assert!(model.foreign_key(featured).is_none());
        let fk = model.foreign_key(posts).unwrap();
        assert_eq!(fk.dependent_to_principal(), Some("Blog"));
        assert_eq!(fk.principal_to_dependent(), Some("Posts"));
        assert_eq!(model.foreign_keys().count(), 1);
    }
}
