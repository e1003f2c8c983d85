//! Indexes over foreign key properties

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use ormforge_core::{ConfigurationSource, EntityTypeId, IndexId, ModelResult, PropertyId};
use tracing::trace;

const RANK: ConfigurationSource = ConfigurationSource::Convention;

/// Every foreign key gets an index over its properties, unique for
/// one-to-one relationships
///
/// No index is added when the properties are a leading prefix of a key or
/// of an index configured above Convention rank. Convention indexes no
/// foreign key needs anymore are removed.
#[derive(Debug, Default)]
pub struct ForeignKeyIndex;

impl ForeignKeyIndex {
    fn update(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let model = builder.model();
        if model.entity_type(entity).is_none() {
            return Ok(());
        }
        let keys: Vec<Vec<PropertyId>> = model
            .keys_of(entity)
            .iter()
            .map(|k| k.properties().to_vec())
            .collect();
        let configured: Vec<Vec<PropertyId>> = model
            .indexes_of(entity)
            .iter()
            .filter(|i| i.source() != RANK)
            .map(|i| i.properties().to_vec())
            .collect();
        let covered = |properties: &[PropertyId]| {
            keys.iter()
                .chain(&configured)
                .any(|k| k.starts_with(properties))
        };

        let mut wanted: Vec<(Vec<PropertyId>, bool)> = Vec::new();
        for fk in model.foreign_keys_of(entity) {
            if fk.properties().is_empty() || covered(fk.properties()) {
                continue;
            }
            match wanted.iter_mut().find(|(p, _)| p == fk.properties()) {
                Some((_, unique)) => *unique |= fk.is_unique(),
                None => wanted.push((fk.properties().to_vec(), fk.is_unique())),
            }
        }
        let stale: Vec<IndexId> = model
            .indexes_of(entity)
            .iter()
            .filter(|i| i.source() == RANK && i.name().is_none())
            .filter(|i| !wanted.iter().any(|(p, _)| p == i.properties()))
            .map(|i| i.id())
            .collect();

        for index in stale {
            trace!(index = %index, "Foreign key index removed");
            builder.remove_index(index, RANK)?;
        }
        for (properties, unique) in wanted {
            if let Some(index) = builder.has_index_properties(entity, properties, None, RANK)? {
                builder.index_unique(index, unique, RANK)?;
            }
        }
        Ok(())
    }
}

impl Convention for ForeignKeyIndex {
    fn name(&self) -> &'static str {
        "foreign_key_index"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::ForeignKeyAdded,
            EventKind::ForeignKeyRemoved,
            EventKind::ForeignKeyPropertiesChanged,
            EventKind::ForeignKeyUniquenessChanged,
            EventKind::KeyAdded,
            EventKind::KeyRemoved,
            EventKind::IndexAdded,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        let model = builder.model();
        let entity = match event {
            ConventionEvent::ForeignKeyRemoved { dependent, .. } => Some(*dependent),
            ConventionEvent::KeyRemoved { entity_type, .. } => Some(*entity_type),
            ConventionEvent::KeyAdded { key } => model.key(*key).map(|k| k.entity_type()),
            ConventionEvent::IndexAdded { index } => model.index(*index).map(|i| i.entity_type()),
            other => other
                .foreign_key()
                .and_then(|fk| model.foreign_key(fk))
                .map(|fk| fk.dependent()),
        };
        match entity {
            Some(entity) => Self::update(builder, entity),
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

    fn builder() -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(ForeignKeyIndex);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        builder
    }

    #[test]
    fn test_index_follows_foreign_key() {
        let mut builder = builder();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(post, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();

        let properties = builder.model().foreign_key(fk).unwrap().properties().to_vec();
        let indexes = builder.model().indexes_of(post);
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].properties(), properties.as_slice());
        assert!(!indexes[0].is_unique());

        builder.foreign_key_unique(fk, true, Explicit).unwrap();
        assert!(builder.model().indexes_of(post)[0].is_unique());

        builder.remove_foreign_key(fk, Explicit).unwrap();
        assert!(builder.model().indexes_of(post).is_empty());
    }

    #[test]
    fn test_key_prefix_needs_no_index() {
        let mut builder = builder();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        builder
            .property(post, "BlogId", Some(DataType::Int32), Explicit)
            .unwrap();
        builder
            .property(post, "Number", Some(DataType::Int32), Explicit)
            .unwrap();
        builder
            .primary_key(post, &["BlogId", "Number"], Explicit)
            .unwrap();
        let fk = builder
            .has_relationship(post, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        builder.has_foreign_key(fk, &["BlogId"], Explicit).unwrap();
        assert!(builder.model().indexes_of(post).is_empty());
    }
}
