//! Primary keys, alternate keys and indexes

use crate::ModelBuilder;
use crate::conventions::ConventionEvent;
use ormforge_core::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, IndexId, KeyId, ModelError, ModelResult,
    PropertyId,
};
use std::collections::HashSet;
use tracing::debug;

impl ModelBuilder {
    /// Resolve property names against an entity type and its bases
    pub(crate) fn resolve_properties(
        &self,
        entity: EntityTypeId,
        names: &[&str],
    ) -> ModelResult<Vec<PropertyId>> {
        names
            .iter()
            .map(|name| {
                self.model
                    .find_property(entity, name)
                    .map(|p| p.id())
                    .ok_or_else(|| ModelError::property_not_found(self.entity_name(entity), *name))
            })
            .collect()
    }

    fn check_key_properties(
        &self,
        entity: EntityTypeId,
        properties: &[PropertyId],
    ) -> ModelResult<()> {
        if properties.is_empty() {
            return Err(ModelError::invalid_configuration(format!(
                "a key of '{}' needs at least one property",
                self.entity_name(entity)
            )));
        }
        let mut seen = HashSet::new();
        for property in properties {
            if self.model.property(*property).is_none() {
                return Err(ModelError::node_not_found(property));
            }
            if !seen.insert(property) {
                return Err(ModelError::invalid_configuration(format!(
                    "key of '{}' lists ({}) with duplicates",
                    self.entity_name(entity),
                    self.model.property_names(properties).join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Make key properties non-nullable; false when a stronger source keeps
    /// one of them nullable
    fn require_key_properties(
        &mut self,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        for property in properties {
            let Some(p) = self.model.property(*property) else {
                continue;
            };
            if p.is_nullable() && !p.nullable.can_set(&false, source) {
                if source == ConfigurationSource::Explicit {
                    return Err(ModelError::NullableKeyProperty {
                        entity_type: self.entity_name(p.entity_type()),
                        property: p.name().to_string(),
                    });
                }
                return Ok(false);
            }
        }
        for property in properties {
            self.sync_property_nullability(*property, false, source);
        }
        Ok(true)
    }

    fn check_root(&self, entity: EntityTypeId, source: ConfigurationSource) -> ModelResult<bool> {
        if self.require_entity(entity)?.base_type().is_none() {
            return Ok(true);
        }
        if source == ConfigurationSource::Explicit {
            return Err(ModelError::invalid_configuration(format!(
                "keys of '{}' must be configured on the root of its hierarchy",
                self.entity_name(entity)
            )));
        }
        Ok(false)
    }

    // ========================================================================
    // Primary Key
    // ========================================================================

    /// Set the primary key by property names
    pub fn primary_key(
        &mut self,
        entity: EntityTypeId,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<KeyId>> {
        let properties = self.resolve_properties(entity, names)?;
        self.primary_key_properties(entity, properties, source)
    }

    /// Set the primary key
    ///
    /// A weaker key is replaced; it is removed unless a foreign key still
    /// references it, in which case it stays as an alternate key.
    pub fn primary_key_properties(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<KeyId>> {
        self.check_key_properties(entity, &properties)?;
        if !self.check_root(entity, source)? {
            return Ok(None);
        }

        let current = self.require_entity(entity)?;
        let current_source = current.primary_key_source();
        let previous = current.primary_key_id();
        let current_key = previous
            .and_then(|k| self.model.key(k))
            .map(|k| (k.id(), k.properties().to_vec()));
        if let Some((key, key_properties)) = current_key {
            if key_properties == properties {
                if let Some(k) = self.model.key_mut(key) {
                    k.source = source.max_with(Some(k.source));
                }
                if let Some(e) = self.model.entity_type_mut(entity) {
                    e.primary_key.raise_source(source);
                }
                return Ok(previous);
            }
            if current_source == Some(ConfigurationSource::Explicit)
                && source == ConfigurationSource::Explicit
            {
                return Err(ModelError::ConflictingPrimaryKey {
                    entity_type: self.entity_name(entity),
                    existing: self.model.property_names(&key_properties).join(", "),
                    requested: self.model.property_names(&properties).join(", "),
                });
            }
        }
        if !source.overrides(current_source) {
            return Ok(None);
        }

        self.run_batch(|b| {
            if !b.require_key_properties(&properties, source)? {
                return Ok(None);
            }
            let key = b.find_or_add_key(entity, properties, source);
            if let Some(e) = b.model.entity_type_mut(entity) {
                e.primary_key.force(Some(key), Some(source));
            }
            if let Some(previous) = previous.filter(|p| *p != key) {
                let removable = b
                    .model
                    .key(previous)
                    .is_some_and(|k| source.overrides(Some(k.source())))
                    && !b.model.is_key_referenced(previous);
                if removable {
                    b.remove_key_node(previous)?;
                }
            }
            debug!(entity_type = %b.entity_name(entity), key = %key, %source, "Primary key set");
            b.notify(ConventionEvent::PrimaryKeyChanged {
                entity_type: entity,
                previous,
            });
            Ok(Some(key))
        })
    }

    fn find_or_add_key(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> KeyId {
        if let Some(existing) = self.model.find_key(entity, &properties).map(|k| k.id()) {
            if let Some(k) = self.model.key_mut(existing) {
                k.source = source.max_with(Some(k.source));
            }
            return existing;
        }
        let key = self.model.insert_key(entity, properties, source);
        self.notify(ConventionEvent::KeyAdded { key });
        key
    }

    // ========================================================================
    // Alternate Keys
    // ========================================================================

    /// Add an alternate key by property names
    pub fn has_key(
        &mut self,
        entity: EntityTypeId,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<KeyId>> {
        let properties = self.resolve_properties(entity, names)?;
        self.has_key_properties(entity, properties, source)
    }

    /// Add an alternate key, or return the existing one over these properties
    pub fn has_key_properties(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<KeyId>> {
        self.check_key_properties(entity, &properties)?;
        if !self.check_root(entity, source)? {
            return Ok(None);
        }
        self.run_batch(|b| {
            if b.model.find_key(entity, &properties).is_none()
                && !b.require_key_properties(&properties, source)?
            {
                return Ok(None);
            }
            Ok(Some(b.find_or_add_key(entity, properties, source)))
        })
    }

    /// Remove a key with the foreign keys that reference it
    pub fn remove_key(&mut self, key: KeyId, source: ConfigurationSource) -> ModelResult<bool> {
        let current = self
            .model
            .key(key)
            .ok_or_else(|| ModelError::node_not_found(key))?;
        if !source.overrides(Some(current.source())) {
            return Ok(false);
        }
        let referencing: Vec<&_> = self
            .model
            .foreign_keys()
            .filter(|fk| fk.principal_key() == key)
            .collect();
        if referencing.iter().any(|fk| !source.overrides(Some(fk.source()))) {
            return Ok(false);
        }
        let referencing: Vec<ForeignKeyId> = referencing.iter().map(|fk| fk.id()).collect();

        self.run_batch(|b| {
            for fk in referencing {
                b.remove_foreign_key_node(fk, true)?;
            }
            b.remove_key_node(key)?;
            Ok(true)
        })
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Add an unnamed index by property names
    pub fn has_index(
        &mut self,
        entity: EntityTypeId,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<IndexId>> {
        let properties = self.resolve_properties(entity, names)?;
        self.has_index_properties(entity, properties, None, source)
    }

    /// Add a named index by property names
    pub fn has_named_index(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<IndexId>> {
        let properties = self.resolve_properties(entity, names)?;
        self.has_index_properties(entity, properties, Some(name), source)
    }

    /// Add an index, or return the existing one
    ///
    /// A named index is identified by its name; redefining it over other
    /// properties needs a stronger source.
    pub fn has_index_properties(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        name: Option<&str>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<IndexId>> {
        self.check_key_properties(entity, &properties)?;

        let existing = self.model.indexes_of(entity).into_iter().find(|i| match name {
            Some(name) => i.name() == Some(name),
            None => i.name().is_none() && i.properties() == properties.as_slice(),
        });
        let mut replaced = None;
        if let Some(index) = existing {
            if index.properties() == properties.as_slice() {
                let id = index.id();
                if let Some(i) = self.model.index_mut(id) {
                    i.source = source.max_with(Some(i.source));
                }
                return Ok(Some(id));
            }
            if index.source() == ConfigurationSource::Explicit
                && source == ConfigurationSource::Explicit
            {
                return Err(ModelError::DuplicateIndex {
                    entity_type: self.entity_name(entity),
                    name: name.unwrap_or_default().to_string(),
                    existing: self.model.property_names(index.properties()).join(", "),
                    requested: self.model.property_names(&properties).join(", "),
                });
            }
            if !source.strictly_overrides(Some(index.source())) {
                return Ok(None);
            }
            replaced = Some(index.id());
        }

        self.run_batch(|b| {
            if let Some(replaced) = replaced {
                b.remove_index_node(replaced)?;
            }
            let index = b
                .model
                .insert_index(entity, name.map(str::to_string), properties, source);
            debug!(entity_type = %b.entity_name(entity), index = %index, %source, "Index added");
            b.notify(ConventionEvent::IndexAdded { index });
            Ok(Some(index))
        })
    }

    /// Set whether an index is unique
    pub fn index_unique(
        &mut self,
        index: IndexId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        self.run_batch(|b| {
            let i = b
                .model
                .index_mut(index)
                .ok_or_else(|| ModelError::node_not_found(index))?;
            let outcome = i.is_unique.try_set(unique, source);
            if outcome.is_applied() {
                b.notify(ConventionEvent::IndexUniquenessChanged { index });
            }
            Ok(outcome.is_accepted())
        })
    }

    /// Remove an index unless a stronger source added it
    pub fn remove_index(
        &mut self,
        index: IndexId,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self
            .model
            .index(index)
            .ok_or_else(|| ModelError::node_not_found(index))?;
        if !source.overrides(Some(current.source())) {
            return Ok(false);
        }
        self.run_batch(|b| b.remove_index_node(index))?;
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::ModelBuilder;
    use ormforge_core::ConfigurationSource::*;
    use ormforge_core::{DataType, EntityTypeId, ModelError};

    fn builder_with_blog() -> (ModelBuilder, EntityTypeId) {
        let mut builder = ModelBuilder::bare();
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Convention)
            .unwrap();
        builder
            .property(blog, "Url", Some(DataType::String), Convention)
            .unwrap();
        builder
            .property(blog, "Slug", Some(DataType::String.into_nullable()), Convention)
            .unwrap();
        (builder, blog)
    }

    #[test]
    fn test_explicit_key_over_convention_key() {
        let (mut builder, blog) = builder_with_blog();
        let by_convention = builder.primary_key(blog, &["Id"], Convention).unwrap();
        let explicit = builder.primary_key(blog, &["Id"], Explicit).unwrap();
        assert_eq!(by_convention, explicit);
        assert_eq!(
            builder.model().entity_type(blog).unwrap().primary_key_source(),
            Some(Explicit)
        );
    }

    #[test]
    fn test_explicit_key_replaces_convention_key() {
        let (mut builder, blog) = builder_with_blog();
        let old = builder.primary_key(blog, &["Id"], Convention).unwrap().unwrap();
        let new = builder.primary_key(blog, &["Url"], Explicit).unwrap().unwrap();
        assert_ne!(old, new);
        // unreferenced convention key is dropped
        assert!(builder.model().key(old).is_none());
        assert_eq!(builder.model().keys_of(blog).len(), 1);
    }

    #[test]
    fn test_conflicting_explicit_keys() {
        let (mut builder, blog) = builder_with_blog();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        let err = builder.primary_key(blog, &["Url"], Explicit).unwrap_err();
        assert!(matches!(err, ModelError::ConflictingPrimaryKey { .. }));

        // weaker sources are simply not applied
        assert_eq!(builder.primary_key(blog, &["Url"], Convention).unwrap(), None);
    }

    #[test]
    fn test_key_makes_properties_required() {
        let (mut builder, blog) = builder_with_blog();
        builder.has_key(blog, &["Slug"], Convention).unwrap().unwrap();
        let slug = builder.model().find_property(blog, "Slug").unwrap();
        assert!(!slug.is_nullable());
    }

    #[test]
    fn test_unknown_property_name() {
        let (mut builder, blog) = builder_with_blog();
        let err = builder.primary_key(blog, &["Missing"], Explicit).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_named_index_redefinition() {
        let (mut builder, blog) = builder_with_blog();
        let first = builder
            .has_named_index(blog, "IX_Blog_Url", &["Url"], Explicit)
            .unwrap()
            .unwrap();
        assert_eq!(
            builder
                .has_named_index(blog, "IX_Blog_Url", &["Url"], Convention)
                .unwrap(),
            Some(first)
        );
        let err = builder
            .has_named_index(blog, "IX_Blog_Url", &["Slug"], Explicit)
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateIndex { .. }));

        let convention = builder
            .has_named_index(blog, "IX_Blog_Slug", &["Slug"], Convention)
            .unwrap()
            .unwrap();
        let replaced = builder
            .has_named_index(blog, "IX_Blog_Slug", &["Url", "Slug"], DataAnnotation)
            .unwrap()
            .unwrap();
        assert_ne!(convention, replaced);
        assert!(builder.model().index(convention).is_none());
    }

    #[test]
    fn test_index_uniqueness_precedence() {
        let (mut builder, blog) = builder_with_blog();
        let index = builder.has_index(blog, &["Url"], Convention).unwrap().unwrap();
        assert!(builder.index_unique(index, true, Explicit).unwrap());
        assert!(!builder.index_unique(index, false, Convention).unwrap());
        assert!(builder.model().index(index).unwrap().is_unique());
        assert!(builder.remove_index(index, Explicit).unwrap());
    }

    #[test]
    fn test_removing_key_property_removes_key() {
        let (mut builder, blog) = builder_with_blog();
        let key = builder.primary_key(blog, &["Id"], Convention).unwrap().unwrap();
        builder.ignore(blog, "Id", Explicit).unwrap();
        assert!(builder.model().key(key).is_none());
        assert!(builder.model().primary_key(blog).is_none());
    }
}
