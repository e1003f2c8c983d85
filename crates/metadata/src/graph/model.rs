//! The model: root container and arena of all metadata nodes
//!
//! Nodes never hold references to each other, only identifiers. Identifiers
//! are allocated from a single counter and never reused, so a handle to a
//! removed node can never alias a node created later.

use crate::graph::{
    AnnotatableId, Annotations, ComplexMember, ComplexProperty, EntityType, ForeignKey, Index,
    Key, Navigation, Property, SkipNavigation,
};
use crate::ledger::Sourced;
use ormforge_core::{
    ComplexPropertyId, ConfigurationSource, DataType, DeleteBehavior, EntityTypeId,
    ForeignKeyId, IndexId, KeyId, PropertyId, SkipNavigationId, ValueGenerated,
};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Model
// ============================================================================

/// Root container of the metadata graph
///
/// Read access is public; every mutation goes through
/// [`ModelBuilder`](crate::ModelBuilder), which is the only path allowed to
/// consult the configuration source ledger and notify conventions.
#[derive(Debug, Clone)]
pub struct Model {
    id: Uuid,
    next_id: u64,
    finalized: bool,
    pub(crate) entity_types: BTreeMap<EntityTypeId, EntityType>,
    pub(crate) properties: BTreeMap<PropertyId, Property>,
    pub(crate) complex_properties: BTreeMap<ComplexPropertyId, ComplexProperty>,
    pub(crate) keys: BTreeMap<KeyId, Key>,
    pub(crate) foreign_keys: BTreeMap<ForeignKeyId, ForeignKey>,
    pub(crate) skip_navigations: BTreeMap<SkipNavigationId, SkipNavigation>,
    pub(crate) indexes: BTreeMap<IndexId, Index>,
    pub(crate) ignored: BTreeMap<String, ConfigurationSource>,
    pub(crate) annotations: Annotations,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            next_id: 1,
            finalized: false,
            entity_types: BTreeMap::new(),
            properties: BTreeMap::new(),
            complex_properties: BTreeMap::new(),
            keys: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
            skip_navigations: BTreeMap::new(),
            indexes: BTreeMap::new(),
            ignored: BTreeMap::new(),
            annotations: Annotations::default(),
        }
    }

    /// Unique identity of this model instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether conventions have settled and validation succeeded
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    /// Model-level annotations
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Annotations of any node
    pub fn annotations_of(&self, target: AnnotatableId) -> Option<&Annotations> {
        match target {
            AnnotatableId::Model => Some(&self.annotations),
            AnnotatableId::EntityType(id) => self.entity_types.get(&id).map(|n| &n.annotations),
            AnnotatableId::Property(id) => self.properties.get(&id).map(|n| &n.annotations),
            AnnotatableId::ComplexProperty(id) => {
                self.complex_properties.get(&id).map(|n| &n.annotations)
            }
            AnnotatableId::Key(id) => self.keys.get(&id).map(|n| &n.annotations),
            AnnotatableId::ForeignKey(id) => self.foreign_keys.get(&id).map(|n| &n.annotations),
            AnnotatableId::SkipNavigation(id) => {
                self.skip_navigations.get(&id).map(|n| &n.annotations)
            }
            AnnotatableId::Index(id) => self.indexes.get(&id).map(|n| &n.annotations),
        }
    }

    pub(crate) fn annotations_mut(&mut self, target: AnnotatableId) -> Option<&mut Annotations> {
        match target {
            AnnotatableId::Model => Some(&mut self.annotations),
            AnnotatableId::EntityType(id) => {
                self.entity_types.get_mut(&id).map(|n| &mut n.annotations)
            }
            AnnotatableId::Property(id) => self.properties.get_mut(&id).map(|n| &mut n.annotations),
            AnnotatableId::ComplexProperty(id) => self
                .complex_properties
                .get_mut(&id)
                .map(|n| &mut n.annotations),
            AnnotatableId::Key(id) => self.keys.get_mut(&id).map(|n| &mut n.annotations),
            AnnotatableId::ForeignKey(id) => {
                self.foreign_keys.get_mut(&id).map(|n| &mut n.annotations)
            }
            AnnotatableId::SkipNavigation(id) => self
                .skip_navigations
                .get_mut(&id)
                .map(|n| &mut n.annotations),
            AnnotatableId::Index(id) => self.indexes.get_mut(&id).map(|n| &mut n.annotations),
        }
    }

    // ========================================================================
    // Entity Types
    // ========================================================================

    /// Get an entity type by ID
    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(&id)
    }

    /// Find an entity type by its unique name
    pub fn find_entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.values().find(|e| e.name == name)
    }

    /// Get all entity types in creation order
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entity_types.values()
    }

    /// Get the number of entity types
    pub fn entity_type_count(&self) -> usize {
        self.entity_types.len()
    }

    /// Rank at which an entity type name was ignored
    pub fn ignored_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored.get(name).copied()
    }

    /// The entity type followed by its base types, nearest first
    pub fn base_chain(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(entity) = current.and_then(|id| self.entity_types.get(&id)) {
            if chain.contains(&entity.id) {
                break;
            }
            chain.push(entity.id);
            current = entity.base_type();
        }
        chain
    }

    /// Root of the inheritance hierarchy
    pub fn root_of(&self, id: EntityTypeId) -> EntityTypeId {
        self.base_chain(id).last().copied().unwrap_or(id)
    }

    /// Entity types deriving (directly or not) from `id`
    pub fn derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types
            .values()
            .filter(|e| e.id != id && self.base_chain(e.id).contains(&id))
            .map(|e| e.id)
            .collect()
    }

    /// Ownership foreign key of an owned entity type
    pub fn ownership(&self, id: EntityTypeId) -> Option<&ForeignKey> {
        self.entity_types
            .get(&id)?
            .foreign_keys
            .iter()
            .filter_map(|fk| self.foreign_keys.get(fk))
            .find(|fk| fk.is_ownership())
    }

    /// Whether the entity type is owned
    pub fn is_owned(&self, id: EntityTypeId) -> bool {
        self.ownership(id).is_some()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Get a property by ID
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(&id)
    }

    /// Declared properties of an entity type
    pub fn properties_of(&self, entity: EntityTypeId) -> Vec<&Property> {
        self.entity_types
            .get(&entity)
            .map(|e| {
                e.properties
                    .iter()
                    .filter_map(|p| self.properties.get(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared and inherited properties, base types first
    pub fn all_properties_of(&self, entity: EntityTypeId) -> Vec<&Property> {
        let mut chain = self.base_chain(entity);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|id| self.properties_of(id))
            .collect()
    }

    /// Find a declared property by name
    pub fn find_declared_property(&self, entity: EntityTypeId, name: &str) -> Option<&Property> {
        self.properties_of(entity).into_iter().find(|p| p.name == name)
    }

    /// Find a property by name, walking the base chain
    pub fn find_property(&self, entity: EntityTypeId, name: &str) -> Option<&Property> {
        self.base_chain(entity)
            .into_iter()
            .find_map(|id| self.find_declared_property(id, name))
    }

    /// Names of the given properties
    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<String> {
        properties
            .iter()
            .filter_map(|p| self.properties.get(p))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Get a complex property by ID
    pub fn complex_property(&self, id: ComplexPropertyId) -> Option<&ComplexProperty> {
        self.complex_properties.get(&id)
    }

    /// Declared complex properties of an entity type
    pub fn complex_properties_of(&self, entity: EntityTypeId) -> Vec<&ComplexProperty> {
        self.entity_types
            .get(&entity)
            .map(|e| {
                e.complex_properties
                    .iter()
                    .filter_map(|p| self.complex_properties.get(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find a declared complex property by name
    pub fn find_complex_property(
        &self,
        entity: EntityTypeId,
        name: &str,
    ) -> Option<&ComplexProperty> {
        self.complex_properties_of(entity)
            .into_iter()
            .find(|p| p.name == name)
    }

    // ========================================================================
    // Keys
    // ========================================================================

    /// Get a key by ID
    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(&id)
    }

    /// Declared keys of an entity type
    pub fn keys_of(&self, entity: EntityTypeId) -> Vec<&Key> {
        self.entity_types
            .get(&entity)
            .map(|e| e.keys.iter().filter_map(|k| self.keys.get(k)).collect())
            .unwrap_or_default()
    }

    /// Primary key, taken from the root of the hierarchy
    pub fn primary_key(&self, entity: EntityTypeId) -> Option<&Key> {
        let root = self.entity_types.get(&self.root_of(entity))?;
        root.primary_key_id().and_then(|k| self.keys.get(&k))
    }

    /// Find a declared key with exactly these properties
    pub fn find_key(&self, entity: EntityTypeId, properties: &[PropertyId]) -> Option<&Key> {
        self.keys_of(entity)
            .into_iter()
            .find(|k| k.properties == properties)
    }

    /// Whether a key is the principal end of any foreign key
    pub fn is_key_referenced(&self, key: KeyId) -> bool {
        self.foreign_keys.values().any(|fk| fk.principal_key == key)
    }

    // ========================================================================
    // Foreign Keys & Navigations
    // ========================================================================

    /// Get a foreign key by ID
    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(&id)
    }

    /// Get all foreign keys in creation order
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.values()
    }

    /// Foreign keys declared on the entity type as dependent
    pub fn foreign_keys_of(&self, entity: EntityTypeId) -> Vec<&ForeignKey> {
        self.entity_types
            .get(&entity)
            .map(|e| {
                e.foreign_keys
                    .iter()
                    .filter_map(|fk| self.foreign_keys.get(fk))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Foreign keys with the entity type as principal
    pub fn referencing_foreign_keys(&self, entity: EntityTypeId) -> Vec<&ForeignKey> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.principal == entity)
            .collect()
    }

    /// Foreign keys using the property as a dependent property
    pub fn foreign_keys_using(&self, property: PropertyId) -> Vec<&ForeignKey> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.properties.contains(&property))
            .collect()
    }

    /// Navigations declared on an entity type
    pub fn navigations_of(&self, entity: EntityTypeId) -> Vec<Navigation> {
        let mut navigations = Vec::new();
        for fk in self.foreign_keys.values() {
            if fk.dependent == entity {
                navigations.extend(Navigation::from_foreign_key(fk, true));
            }
            if fk.principal == entity {
                navigations.extend(Navigation::from_foreign_key(fk, false));
            }
        }
        navigations
    }

    /// Find a declared navigation by name
    pub fn find_navigation(&self, entity: EntityTypeId, name: &str) -> Option<Navigation> {
        self.navigations_of(entity)
            .into_iter()
            .find(|n| n.name == name)
    }

    /// Get a skip navigation by ID
    pub fn skip_navigation(&self, id: SkipNavigationId) -> Option<&SkipNavigation> {
        self.skip_navigations.get(&id)
    }

    /// Skip navigations declared on an entity type
    pub fn skip_navigations_of(&self, entity: EntityTypeId) -> Vec<&SkipNavigation> {
        self.entity_types
            .get(&entity)
            .map(|e| {
                e.skip_navigations
                    .iter()
                    .filter_map(|s| self.skip_navigations.get(s))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find a declared skip navigation by name
    pub fn find_skip_navigation(
        &self,
        entity: EntityTypeId,
        name: &str,
    ) -> Option<&SkipNavigation> {
        self.skip_navigations_of(entity)
            .into_iter()
            .find(|s| s.name == name)
    }

    /// Whether any member of the entity type (or its bases) uses the name
    pub fn is_member_name_taken(&self, entity: EntityTypeId, name: &str) -> bool {
        self.base_chain(entity).into_iter().any(|id| {
            self.find_declared_property(id, name).is_some()
                || self.find_complex_property(id, name).is_some()
                || self.find_navigation(id, name).is_some()
                || self.find_skip_navigation(id, name).is_some()
                || self
                    .entity_types
                    .get(&id)
                    .is_some_and(|e| e.ignored.contains_key(name))
        })
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Get an index by ID
    pub fn index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(&id)
    }

    /// Declared indexes of an entity type
    pub fn indexes_of(&self, entity: EntityTypeId) -> Vec<&Index> {
        self.entity_types
            .get(&entity)
            .map(|e| {
                e.indexes
                    .iter()
                    .filter_map(|i| self.indexes.get(i))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ========================================================================
    // Structural Mutation (no ledger, no events)
    // ========================================================================

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn entity_type_mut(&mut self, id: EntityTypeId) -> Option<&mut EntityType> {
        self.entity_types.get_mut(&id)
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties.get_mut(&id)
    }

    pub(crate) fn complex_property_mut(
        &mut self,
        id: ComplexPropertyId,
    ) -> Option<&mut ComplexProperty> {
        self.complex_properties.get_mut(&id)
    }

    pub(crate) fn foreign_key_mut(&mut self, id: ForeignKeyId) -> Option<&mut ForeignKey> {
        self.foreign_keys.get_mut(&id)
    }

    pub(crate) fn index_mut(&mut self, id: IndexId) -> Option<&mut Index> {
        self.indexes.get_mut(&id)
    }

    pub(crate) fn key_mut(&mut self, id: KeyId) -> Option<&mut Key> {
        self.keys.get_mut(&id)
    }

    pub(crate) fn skip_navigation_mut(
        &mut self,
        id: SkipNavigationId,
    ) -> Option<&mut SkipNavigation> {
        self.skip_navigations.get_mut(&id)
    }

    pub(crate) fn insert_entity_type(
        &mut self,
        name: &str,
        type_name: &str,
        source: ConfigurationSource,
    ) -> EntityTypeId {
        let id = EntityTypeId::from_raw(self.allocate());
        self.entity_types
            .insert(id, EntityType::new(id, name, type_name, source));
        id
    }

    pub(crate) fn insert_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        member: Option<String>,
        data_type: &DataType,
        source: ConfigurationSource,
    ) -> PropertyId {
        let id = PropertyId::from_raw(self.allocate());
        self.properties.insert(
            id,
            Property {
                id,
                entity_type: entity,
                name: name.to_string(),
                member,
                source,
                data_type: Sourced::new(data_type.non_nullable().clone()),
                nullable: Sourced::new(data_type.is_nullable()),
                value_generated: Sourced::new(ValueGenerated::Never),
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&entity) {
            e.properties.push(id);
        }
        id
    }

    pub(crate) fn insert_complex_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        type_name: &str,
        is_collection: bool,
        members: Vec<ComplexMember>,
        source: ConfigurationSource,
    ) -> ComplexPropertyId {
        let id = ComplexPropertyId::from_raw(self.allocate());
        self.complex_properties.insert(
            id,
            ComplexProperty {
                id,
                entity_type: entity,
                name: name.to_string(),
                type_name: type_name.to_string(),
                is_collection,
                source,
                nullable: Sourced::new(false),
                members,
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&entity) {
            e.complex_properties.push(id);
        }
        id
    }

    pub(crate) fn insert_key(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> KeyId {
        let id = KeyId::from_raw(self.allocate());
        self.keys.insert(
            id,
            Key {
                id,
                entity_type: entity,
                properties,
                source,
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&entity) {
            e.keys.push(id);
        }
        id
    }

    pub(crate) fn insert_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        principal_key: KeyId,
        properties: Vec<PropertyId>,
        properties_source: Option<ConfigurationSource>,
        source: ConfigurationSource,
    ) -> ForeignKeyId {
        let id = ForeignKeyId::from_raw(self.allocate());
        let required = !properties.is_empty()
            && properties
                .iter()
                .filter_map(|p| self.properties.get(p))
                .all(|p| !p.is_nullable());
        self.foreign_keys.insert(
            id,
            ForeignKey {
                id,
                dependent,
                principal,
                source,
                properties,
                properties_source,
                principal_key,
                principal_key_source: None,
                is_unique: Sourced::new(false),
                is_required: Sourced::new(required),
                is_ownership: Sourced::new(false),
                delete_behavior: Sourced::new(DeleteBehavior::default()),
                dependent_to_principal: Sourced::new(None),
                principal_to_dependent: Sourced::new(None),
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&dependent) {
            e.foreign_keys.push(id);
        }
        id
    }

    pub(crate) fn insert_index(
        &mut self,
        entity: EntityTypeId,
        name: Option<String>,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> IndexId {
        let id = IndexId::from_raw(self.allocate());
        self.indexes.insert(
            id,
            Index {
                id,
                entity_type: entity,
                name,
                properties,
                source,
                is_unique: Sourced::new(false),
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&entity) {
            e.indexes.push(id);
        }
        id
    }

    pub(crate) fn insert_skip_navigation(
        &mut self,
        declaring: EntityTypeId,
        target: EntityTypeId,
        name: &str,
        foreign_key: ForeignKeyId,
        source: ConfigurationSource,
    ) -> SkipNavigationId {
        let id = SkipNavigationId::from_raw(self.allocate());
        self.skip_navigations.insert(
            id,
            SkipNavigation {
                id,
                declaring,
                target,
                name: name.to_string(),
                foreign_key,
                inverse: None,
                source,
                annotations: Annotations::default(),
            },
        );
        if let Some(e) = self.entity_types.get_mut(&declaring) {
            e.skip_navigations.push(id);
        }
        id
    }

    pub(crate) fn detach_entity_type(&mut self, id: EntityTypeId) -> Option<EntityType> {
        self.entity_types.remove(&id)
    }

    pub(crate) fn detach_property(&mut self, id: PropertyId) -> Option<Property> {
        let property = self.properties.remove(&id)?;
        if let Some(e) = self.entity_types.get_mut(&property.entity_type) {
            e.properties.retain(|p| *p != id);
        }
        Some(property)
    }

    pub(crate) fn detach_complex_property(
        &mut self,
        id: ComplexPropertyId,
    ) -> Option<ComplexProperty> {
        let property = self.complex_properties.remove(&id)?;
        if let Some(e) = self.entity_types.get_mut(&property.entity_type) {
            e.complex_properties.retain(|p| *p != id);
        }
        Some(property)
    }

    /// Remove a key; the flag tells whether it was the primary key
    pub(crate) fn detach_key(&mut self, id: KeyId) -> Option<(Key, bool)> {
        let key = self.keys.remove(&id)?;
        let mut was_primary = false;
        if let Some(e) = self.entity_types.get_mut(&key.entity_type) {
            e.keys.retain(|k| *k != id);
            if e.primary_key.value() == Some(id) {
                e.primary_key.force(None, None);
                was_primary = true;
            }
        }
        Some((key, was_primary))
    }

    pub(crate) fn detach_foreign_key(&mut self, id: ForeignKeyId) -> Option<ForeignKey> {
        let fk = self.foreign_keys.remove(&id)?;
        if let Some(e) = self.entity_types.get_mut(&fk.dependent) {
            e.foreign_keys.retain(|f| *f != id);
        }
        Some(fk)
    }

    pub(crate) fn detach_index(&mut self, id: IndexId) -> Option<Index> {
        let index = self.indexes.remove(&id)?;
        if let Some(e) = self.entity_types.get_mut(&index.entity_type) {
            e.indexes.retain(|i| *i != id);
        }
        Some(index)
    }

    pub(crate) fn detach_skip_navigation(
        &mut self,
        id: SkipNavigationId,
    ) -> Option<SkipNavigation> {
        let skip = self.skip_navigations.remove(&id)?;
        if let Some(e) = self.entity_types.get_mut(&skip.declaring) {
            e.skip_navigations.retain(|s| *s != id);
        }
        if let Some(inverse) = skip.inverse.and_then(|i| self.skip_navigations.get_mut(&i)) {
            inverse.inverse = None;
        }
        Some(skip)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ormforge_core::ConfigurationSource::*;

    fn model_with_customer() -> (Model, EntityTypeId, PropertyId) {
        let mut model = Model::new();
        let customer = model.insert_entity_type("Customer", "Customer", Explicit);
        let id =
            model.insert_property(customer, "Id", Some("Id".into()), &DataType::Int32, Convention);
        (model, customer, id)
    }

    #[test]
    fn test_ids_are_never_reused() {
        let (mut model, customer, id) = model_with_customer();
        model.detach_property(id);
        let again =
            model.insert_property(customer, "Id", Some("Id".into()), &DataType::Int32, Convention);
        assert_ne!(id, again);
        assert!(model.property(id).is_none());
    }

    #[test]
    fn test_property_nullability_from_type() {
        let (mut model, customer, id) = model_with_customer();
        let nickname = model.insert_property(
            customer,
            "Nickname",
            None,
            &DataType::String.into_nullable(),
            Convention,
        );
        assert!(!model.property(id).unwrap().is_nullable());
        let nickname = model.property(nickname).unwrap();
        assert!(nickname.is_nullable());
        assert!(nickname.is_shadow());
        assert_eq!(nickname.data_type(), &DataType::String);
    }

    #[test]
    fn test_find_property_walks_base_chain() {
        let (mut model, customer, id) = model_with_customer();
        let vip = model.insert_entity_type("VipCustomer", "VipCustomer", Explicit);
        model
            .entity_type_mut(vip)
            .unwrap()
            .base_type
            .force(Some(customer), Some(Explicit));

        assert_eq!(model.find_property(vip, "Id").map(|p| p.id()), Some(id));
        assert!(model.find_declared_property(vip, "Id").is_none());
        assert_eq!(model.base_chain(vip), vec![vip, customer]);
        assert_eq!(model.root_of(vip), customer);
        assert_eq!(model.derived_types(customer), vec![vip]);
    }

    #[test]
    fn test_primary_key_from_root() {
        let (mut model, customer, id) = model_with_customer();
        let key = model.insert_key(customer, vec![id], Convention);
        model
            .entity_type_mut(customer)
            .unwrap()
            .primary_key
            .force(Some(key), Some(Convention));
        let vip = model.insert_entity_type("VipCustomer", "VipCustomer", Explicit);
        model
            .entity_type_mut(vip)
            .unwrap()
            .base_type
            .force(Some(customer), Some(Explicit));

        assert_eq!(model.primary_key(vip).map(|k| k.id()), Some(key));

        let (_, was_primary) = model.detach_key(key).unwrap();
        assert!(was_primary);
        assert!(model.primary_key(customer).is_none());
    }

    #[test]
    fn test_navigations_are_views_of_foreign_keys() {
        let (mut model, customer, id) = model_with_customer();
        let key = model.insert_key(customer, vec![id], Convention);
        let order = model.insert_entity_type("Order", "Order", Explicit);
        let customer_id =
            model.insert_property(order, "CustomerId", None, &DataType::Int32, Convention);
        let fk =
            model.insert_foreign_key(order, customer, key, vec![customer_id], None, Convention);
        {
            let fk = model.foreign_key_mut(fk).unwrap();
            fk.dependent_to_principal.force(Some("Customer".into()), Some(Convention));
            fk.principal_to_dependent.force(Some("Orders".into()), Some(Convention));
        }

        let orders = model.find_navigation(customer, "Orders").unwrap();
        assert!(orders.is_collection);
        assert!(!orders.on_dependent);
        assert_eq!(orders.target_entity_type, order);

        let back = model.find_navigation(order, "Customer").unwrap();
        assert!(!back.is_collection);
        assert!(model.is_member_name_taken(order, "Customer"));
        assert!(model.foreign_keys_of(order).len() == 1);
        assert!(model.is_key_referenced(key));
    }
}
