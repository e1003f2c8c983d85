//! Typed entity type configuration at Explicit rank

use crate::ModelBuilder;
use crate::builder::{OwnershipSpec, RelationshipSpec};
use crate::graph::AnnotatableId;
use crate::shape::Mapped;
use ormforge_core::{
    ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ForeignKeyId, ModelError,
    ModelResult, SkipNavigationId,
};
use serde_json::Value;

const RANK: ConfigurationSource = ConfigurationSource::Explicit;

impl ModelBuilder {
    /// Configure an entity type by name, adding it when missing
    pub fn entity_builder(&mut self, name: &str) -> ModelResult<EntityTypeBuilder<'_>> {
        let entity = self
            .entity(name, RANK)?
            .ok_or_else(|| ModelError::EntityTypeNotFound(name.to_string()))?;
        Ok(EntityTypeBuilder {
            builder: self,
            entity,
        })
    }

    /// Configure the entity type mapping `T`, registering its shape first
    pub fn entity_of<T: Mapped>(&mut self) -> ModelResult<EntityTypeBuilder<'_>> {
        let shape = T::shape();
        let name = shape.name.clone();
        if !self.shapes.contains(&name) {
            self.register_shape(shape)?;
        }
        self.entity_builder(&name)
    }
}

/// Explicit configuration of one entity type
///
/// ```
/// use ormforge_core::DataType;
/// use ormforge_metadata::ModelBuilder;
///
/// let mut builder = ModelBuilder::new();
/// builder
///     .entity_builder("Blog")?
///     .property("Id", DataType::Int32)?
///     .has_key(&["Id"])?;
/// builder
///     .entity_builder("Post")?
///     .property("Id", DataType::Int32)?
///     .has_key(&["Id"])?
///     .has_one("Blog", Some("Blog"), Some("Posts"))?;
/// let model = builder.finalize()?;
/// assert_eq!(model.foreign_keys().count(), 1);
/// # Ok::<(), ormforge_core::ModelError>(())
/// ```
pub struct EntityTypeBuilder<'a> {
    builder: &'a mut ModelBuilder,
    entity: EntityTypeId,
}

impl<'a> EntityTypeBuilder<'a> {
    pub fn id(&self) -> EntityTypeId {
        self.entity
    }

    /// The underlying builder, for configuration not covered here
    pub fn builder(&mut self) -> &mut ModelBuilder {
        self.builder
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub fn property(&mut self, name: &str, data_type: DataType) -> ModelResult<&mut Self> {
        self.builder
            .property(self.entity, name, Some(data_type), RANK)?;
        Ok(self)
    }

    /// Map a scalar member of the registered shape
    pub fn member(&mut self, name: &str) -> ModelResult<&mut Self> {
        self.builder.property(self.entity, name, None, RANK)?;
        Ok(self)
    }

    pub fn required(&mut self, name: &str, required: bool) -> ModelResult<&mut Self> {
        let property = self
            .builder
            .model()
            .find_property(self.entity, name)
            .map(|p| p.id())
            .ok_or_else(|| {
                ModelError::property_not_found(self.builder.entity_name(self.entity), name)
            })?;
        self.builder.property_required(property, required, RANK)?;
        Ok(self)
    }

    pub fn complex_property(&mut self, name: &str, type_name: &str) -> ModelResult<&mut Self> {
        self.builder
            .complex_property(self.entity, name, Some(type_name), RANK)?;
        Ok(self)
    }

    pub fn ignore(&mut self, name: &str) -> ModelResult<&mut Self> {
        self.builder.ignore(self.entity, name, RANK)?;
        Ok(self)
    }

    pub fn annotation(&mut self, name: &str, value: Value) -> ModelResult<&mut Self> {
        self.builder
            .has_annotation(AnnotatableId::EntityType(self.entity), name, value, RANK)?;
        Ok(self)
    }

    pub fn base_type(&mut self, base: &str) -> ModelResult<&mut Self> {
        let base = self.builder.entity(base, RANK)?;
        self.builder.has_base_type(self.entity, base, RANK)?;
        Ok(self)
    }

    // ========================================================================
    // Keys and Indexes
    // ========================================================================

    pub fn has_key(&mut self, names: &[&str]) -> ModelResult<&mut Self> {
        self.builder.primary_key(self.entity, names, RANK)?;
        Ok(self)
    }

    pub fn has_alternate_key(&mut self, names: &[&str]) -> ModelResult<&mut Self> {
        self.builder.has_key(self.entity, names, RANK)?;
        Ok(self)
    }

    pub fn has_index(&mut self, names: &[&str], unique: bool) -> ModelResult<&mut Self> {
        if let Some(index) = self.builder.has_index(self.entity, names, RANK)? {
            self.builder.index_unique(index, unique, RANK)?;
        }
        Ok(self)
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    /// Reference to `target`, optionally with a collection inverse
    pub fn has_one(
        &mut self,
        target: &str,
        navigation: Option<&str>,
        inverse: Option<&str>,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let mut spec = RelationshipSpec::many_to_one();
        spec.navigation = navigation.map(str::to_string);
        spec.inverse = inverse.map(str::to_string);
        self.builder.has_relationship(self.entity, target, spec, RANK)
    }

    /// Collection of `target`, optionally with a reference inverse
    pub fn has_many(
        &mut self,
        target: &str,
        navigation: Option<&str>,
        inverse: Option<&str>,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let mut spec = RelationshipSpec::one_to_many();
        spec.navigation = navigation.map(str::to_string);
        spec.inverse = inverse.map(str::to_string);
        self.builder.has_relationship(self.entity, target, spec, RANK)
    }

    /// One-to-one with this entity type as dependent
    pub fn has_one_to_one(
        &mut self,
        target: &str,
        navigation: Option<&str>,
        inverse: Option<&str>,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let mut spec = RelationshipSpec::one_to_one();
        spec.navigation = navigation.map(str::to_string);
        spec.inverse = inverse.map(str::to_string);
        self.builder.has_relationship(self.entity, target, spec, RANK)
    }

    pub fn many_to_many(
        &mut self,
        target: &str,
        navigation: &str,
        inverse: Option<&str>,
    ) -> ModelResult<Option<SkipNavigationId>> {
        self.builder
            .has_many_to_many(self.entity, navigation, target, inverse, RANK)
    }

    pub fn owns_one(
        &mut self,
        type_name: &str,
        navigation: &str,
    ) -> ModelResult<Option<ForeignKeyId>> {
        self.builder
            .has_ownership(self.entity, type_name, OwnershipSpec::one(navigation), RANK)
    }

    pub fn owns_many(
        &mut self,
        type_name: &str,
        navigation: &str,
    ) -> ModelResult<Option<ForeignKeyId>> {
        self.builder
            .has_ownership(self.entity, type_name, OwnershipSpec::many(navigation), RANK)
    }

    /// Delete behavior of a relationship declared on this entity type
    pub fn on_delete(
        &mut self,
        foreign_key: ForeignKeyId,
        behavior: DeleteBehavior,
    ) -> ModelResult<&mut Self> {
        self.builder.on_delete(foreign_key, behavior, RANK)?;
        Ok(self)
    }
}
