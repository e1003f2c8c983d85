//! Relationship and ownership resolution
//!
//! A relationship request names two entity types and up to two navigations.
//! The resolver decides which side is dependent, reuses a compatible foreign
//! key when one exists, frees the navigation names, and otherwise creates a
//! foreign key over fresh shadow properties. Conventions later replace those
//! with matching scalar properties.

use crate::ModelBuilder;
use crate::conventions::ConventionEvent;
use crate::graph::ForeignKey;
use crate::naming::{
    PROPERTY_BAG_TYPE, TEMPORARY_KEY_NAME, foreign_key_property_name, join_entity_name,
    owned_entity_name, uniquify,
};
use ormforge_core::{
    ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ForeignKeyId, KeyId, ModelError,
    ModelResult, PropertyId, SkipNavigationId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ============================================================================
// Requests
// ============================================================================

/// Cardinality of a relationship, seen from the entity type configuring it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// The entity type references one target (it is the dependent)
    #[default]
    ManyToOne,
    /// The entity type has many targets (the target is the dependent)
    OneToMany,
    /// One to one; the configuring entity type starts as the dependent
    OneToOne,
    /// Many to many through an implicit join entity type
    ManyToMany,
}

/// Navigations of a relationship request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipSpec {
    pub kind: RelationshipKind,
    /// Navigation on the configuring entity type
    pub navigation: Option<String>,
    /// Navigation on the target pointing back
    pub inverse: Option<String>,
}

impl RelationshipSpec {
    pub fn new(kind: RelationshipKind) -> Self {
        Self {
            kind,
            navigation: None,
            inverse: None,
        }
    }

    pub fn many_to_one() -> Self {
        Self::new(RelationshipKind::ManyToOne)
    }

    pub fn one_to_many() -> Self {
        Self::new(RelationshipKind::OneToMany)
    }

    pub fn one_to_one() -> Self {
        Self::new(RelationshipKind::OneToOne)
    }

    pub fn many_to_many() -> Self {
        Self::new(RelationshipKind::ManyToMany)
    }

    pub fn with_navigation(mut self, name: impl Into<String>) -> Self {
        self.navigation = Some(name.into());
        self
    }

    pub fn with_inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }
}

/// Navigation of an ownership request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipSpec {
    pub navigation: String,
    /// Navigation on the owned type pointing back at the owner
    pub inverse: Option<String>,
    pub collection: bool,
}

impl OwnershipSpec {
    /// A single owned instance
    pub fn one(navigation: impl Into<String>) -> Self {
        Self {
            navigation: navigation.into(),
            inverse: None,
            collection: false,
        }
    }

    /// A collection of owned instances
    pub fn many(navigation: impl Into<String>) -> Self {
        Self {
            collection: true,
            ..Self::one(navigation)
        }
    }

    pub fn with_inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }
}

/// Which end each navigation of a resolved request lives on
#[derive(Debug, Clone)]
struct Ends {
    dependent: EntityTypeId,
    principal: EntityTypeId,
    to_principal: Option<String>,
    to_dependent: Option<String>,
}

impl Ends {
    fn reversed(self) -> Self {
        Self {
            dependent: self.principal,
            principal: self.dependent,
            to_principal: self.to_dependent,
            to_dependent: self.to_principal,
        }
    }
}

fn navigation_matches(existing: Option<&str>, requested: Option<&str>) -> bool {
    match requested {
        None => true,
        Some(requested) => existing.is_none_or(|e| e == requested),
    }
}

impl ModelBuilder {
    // ========================================================================
    // Relationships
    // ========================================================================

    /// Configure a relationship between `entity` and the type named `target`
    ///
    /// The target entity type is added when missing. Returns the foreign key
    /// that represents the relationship once conventions have settled; for
    /// many-to-many that is the foreign key of the left skip navigation.
    pub fn has_relationship(
        &mut self,
        entity: EntityTypeId,
        target: &str,
        spec: RelationshipSpec,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        self.require_entity(entity)?;
        if spec.kind == RelationshipKind::ManyToMany {
            let navigation = spec.navigation.as_deref().ok_or_else(|| {
                ModelError::invalid_configuration(format!(
                    "many-to-many relationship from '{}' to '{}' needs a navigation",
                    self.entity_name(entity),
                    target
                ))
            })?;
            let skip =
                self.has_many_to_many(entity, navigation, target, spec.inverse.as_deref(), source)?;
            return Ok(skip
                .and_then(|s| self.model.skip_navigation(s))
                .map(|s| s.foreign_key()));
        }

        let resolved = self.run_batch(|b| {
            let Some(target) = b.entity(target, source)? else {
                return Ok(None);
            };
            let ends = match spec.kind {
                RelationshipKind::OneToMany => Ends {
                    dependent: target,
                    principal: entity,
                    to_principal: spec.inverse.clone(),
                    to_dependent: spec.navigation.clone(),
                },
                _ => Ends {
                    dependent: entity,
                    principal: target,
                    to_principal: spec.navigation.clone(),
                    to_dependent: spec.inverse.clone(),
                },
            };
            let unique = spec.kind == RelationshipKind::OneToOne;
            Ok(b
                .resolve_relationship(ends.clone(), unique, source)?
                .map(|fk| (fk, ends)))
        })?;

        let Some((fk, ends)) = resolved else {
            return Ok(None);
        };
        if self.model.foreign_key(fk).is_some() {
            return Ok(Some(fk));
        }
        let relocated = self.relocate_foreign_key(&ends);
        debug!(from = %fk, to = ?relocated, "Relationship handle relocated");
        Ok(relocated)
    }

    fn resolve_relationship(
        &mut self,
        ends: Ends,
        unique: bool,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        if self.model.is_owned(ends.principal) {
            if source == ConfigurationSource::Explicit {
                return Err(ModelError::OwnedTypeAsPrincipal {
                    owned_type: self.entity_name(ends.principal),
                    dependent: self.entity_name(ends.dependent),
                });
            }
            return Ok(None);
        }
        if ends.dependent == ends.principal
            && ends.to_principal.is_some()
            && ends.to_principal == ends.to_dependent
        {
            return self.navigation_conflict(
                ends.dependent,
                ends.to_principal.as_deref().unwrap_or_default(),
                "both ends of a self-referencing relationship use the same name",
                source,
            );
        }

        let (ends, existing) = match self.find_compatible_foreign_key(&ends, unique) {
            Some((fk, true)) => (ends.reversed(), Some(fk)),
            Some((fk, false)) => (ends, Some(fk)),
            None => (ends, None),
        };

        for (declaring, name) in [
            (ends.dependent, ends.to_principal.as_deref()),
            (ends.principal, ends.to_dependent.as_deref()),
        ] {
            if let Some(name) = name {
                if !self.clear_member_name(declaring, name, source, existing)? {
                    trace!(navigation = name, %source, "Navigation name is taken");
                    return Ok(None);
                }
            }
        }
        if self.model.entity_type(ends.dependent).is_none()
            || self.model.entity_type(ends.principal).is_none()
        {
            return Ok(None);
        }

        let fk = match existing.filter(|fk| self.model.foreign_key(*fk).is_some()) {
            Some(fk) => {
                if let Some(f) = self.model.foreign_key_mut(fk) {
                    f.source = source.max_with(Some(f.source));
                }
                fk
            }
            None => {
                let key = self.ensure_principal_key(ends.principal)?;
                let prefix = match &ends.to_principal {
                    Some(navigation) => navigation.clone(),
                    None => self.type_name_of(ends.principal),
                };
                self.create_foreign_key(ends.dependent, ends.principal, key, &prefix, source)
            }
        };

        if let Some(name) = &ends.to_principal {
            self.set_navigation(fk, name, true, source)?;
        }
        if let Some(name) = &ends.to_dependent {
            self.set_navigation(fk, name, false, source)?;
        }
        self.set_foreign_key_unique(fk, unique, source);
        debug!(
            foreign_key = %fk,
            dependent = %self.entity_name(ends.dependent),
            principal = %self.entity_name(ends.principal),
            "Relationship configured"
        );
        Ok(Some(fk))
    }

    /// A foreign key the request can reuse, and whether it runs the other way
    fn find_compatible_foreign_key(
        &self,
        ends: &Ends,
        unique: bool,
    ) -> Option<(ForeignKeyId, bool)> {
        let fits = |fk: &ForeignKey, ends: &Ends| {
            fk.dependent == ends.dependent
                && fk.principal == ends.principal
                && !fk.is_ownership()
                && navigation_matches(fk.dependent_to_principal(), ends.to_principal.as_deref())
                && navigation_matches(fk.principal_to_dependent(), ends.to_dependent.as_deref())
        };
        let exact = |fk: &ForeignKey, ends: &Ends| {
            fk.dependent_to_principal() == ends.to_principal.as_deref()
                && fk.principal_to_dependent() == ends.to_dependent.as_deref()
        };

        let mut candidates: Vec<(&ForeignKey, bool)> = self
            .model
            .foreign_keys()
            .filter(|fk| fits(fk, ends))
            .map(|fk| (fk, false))
            .collect();
        if unique && ends.dependent != ends.principal {
            let reversed = ends.clone().reversed();
            candidates.extend(
                self.model
                    .foreign_keys()
                    .filter(|fk| fk.is_unique() && fits(fk, &reversed))
                    .map(|fk| (fk, true)),
            );
        }
        candidates
            .iter()
            .find(|(fk, reversed)| {
                if *reversed {
                    exact(fk, &ends.clone().reversed())
                } else {
                    exact(fk, ends)
                }
            })
            .or_else(|| candidates.first())
            .map(|(fk, reversed)| (fk.id(), *reversed))
    }

    /// Find the foreign key that now carries a relationship's navigations
    fn relocate_foreign_key(&self, ends: &Ends) -> Option<ForeignKeyId> {
        let by_navigation = |entity: EntityTypeId, name: &Option<String>| {
            name.as_deref()
                .and_then(|n| self.model.find_navigation(entity, n))
                .map(|n| n.foreign_key)
        };
        by_navigation(ends.dependent, &ends.to_principal)
            .or_else(|| by_navigation(ends.principal, &ends.to_dependent))
            .or_else(|| {
                let mut unnamed = self.model.foreign_keys().filter(|fk| {
                    fk.dependent == ends.dependent
                        && fk.principal == ends.principal
                        && fk.dependent_to_principal().is_none()
                        && fk.principal_to_dependent().is_none()
                });
                match (unnamed.next(), unnamed.next()) {
                    (Some(fk), None) => Some(fk.id()),
                    _ => None,
                }
            })
    }

    fn navigation_conflict<T>(
        &self,
        entity: EntityTypeId,
        navigation: &str,
        message: &str,
        source: ConfigurationSource,
    ) -> ModelResult<Option<T>> {
        if source == ConfigurationSource::Explicit {
            return Err(ModelError::NavigationConflict {
                entity_type: self.entity_name(entity),
                navigation: navigation.to_string(),
                message: message.to_string(),
            });
        }
        Ok(None)
    }

    pub(crate) fn type_name_of(&self, entity: EntityTypeId) -> String {
        self.model
            .entity_type(entity)
            .map(|e| e.type_name().to_string())
            .unwrap_or_default()
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    /// Own an instance (or a collection) of `target_type` through a navigation
    ///
    /// Every ownership creates its own entity type, named after the owner and
    /// the navigation, so one shape can be owned several times.
    pub fn has_ownership(
        &mut self,
        owner: EntityTypeId,
        target_type: &str,
        spec: OwnershipSpec,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        self.require_entity(owner)?;

        if let Some(navigation) = self.model.find_navigation(owner, &spec.navigation) {
            let fk = navigation.foreign_key;
            let reusable = !navigation.on_dependent
                && self.model.foreign_key(fk).is_some_and(|f| {
                    f.is_ownership() && self.type_name_of(f.dependent()) == target_type
                });
            if reusable {
                return self.run_batch(|b| {
                    if let Some(f) = b.model.foreign_key_mut(fk) {
                        f.source = source.max_with(Some(f.source));
                        f.is_ownership.raise_source(source);
                    }
                    b.set_foreign_key_unique(fk, !spec.collection, source);
                    if let Some(inverse) = &spec.inverse {
                        b.set_navigation(fk, inverse, true, source)?;
                    }
                    Ok(Some(fk))
                });
            }
        }

        if let Some(ignored) = self.model.ignored_source(target_type) {
            if !source.overrides(Some(ignored)) {
                return Ok(None);
            }
        }
        if self.ownership_path(owner).iter().any(|t| t == target_type) {
            return self.ownership_conflict(
                owner,
                format!("'{}' would own itself through '{}'", target_type, spec.navigation),
                source,
            );
        }

        let mut shared = None;
        if let Some(existing) = self.model.find_entity_type(target_type) {
            if !self.model.is_owned(existing.id()) {
                if existing.source() == ConfigurationSource::Explicit {
                    return self.ownership_conflict(
                        owner,
                        format!("'{}' is configured as a shared entity type", target_type),
                        source,
                    );
                }
                if !source.overrides(Some(existing.source())) {
                    return Ok(None);
                }
                shared = Some(existing.id());
            }
        }

        let navigation = spec.navigation.clone();
        let fk = self.run_batch(|b| {
            if !b.clear_member_name(owner, &spec.navigation, source, None)? {
                return Ok(None);
            }
            if let Some(shared) = shared {
                debug!(entity_type = target_type, "Shared entity type replaced by ownership");
                b.remove_entity_type_node(shared)?;
            }

            let owner_name = b.entity_name(owner);
            let name = uniquify(
                &owned_entity_name(&owner_name, &spec.navigation, target_type),
                |n| b.model.find_entity_type(n).is_some(),
            );
            let owned = b.model.insert_entity_type(&name, target_type, source);
            debug!(entity_type = %name, owner = %owner_name, "Owned entity type added");
            b.notify(ConventionEvent::EntityTypeAdded { entity_type: owned });

            let key = b.ensure_principal_key(owner)?;
            let prefix = b.type_name_of(owner);
            let properties = b.add_shadow_foreign_key_properties(owned, key, &prefix, false);
            let fk = b
                .model
                .insert_foreign_key(owned, owner, key, properties, None, source);
            if let Some(f) = b.model.foreign_key_mut(fk) {
                f.is_ownership.force(true, Some(source));
                f.is_unique.try_set(!spec.collection, source);
                f.is_required.try_set(true, source);
            }
            b.notify(ConventionEvent::ForeignKeyAdded { foreign_key: fk });
            b.notify(ConventionEvent::ForeignKeyOwnershipChanged { foreign_key: fk });

            b.set_navigation(fk, &spec.navigation, false, source)?;
            if let Some(inverse) = &spec.inverse {
                b.set_navigation(fk, inverse, true, source)?;
            }
            Ok(Some(fk))
        })?;

        match fk {
            Some(fk) if self.model.foreign_key(fk).is_none() => Ok(self
                .model
                .find_navigation(owner, &navigation)
                .map(|n| n.foreign_key)),
            other => Ok(other),
        }
    }

    /// Type names along the ownership chain, the entity type first
    fn ownership_path(&self, entity: EntityTypeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(entity);
        while let Some(id) = current {
            let type_name = self.type_name_of(id);
            if path.contains(&type_name) {
                break;
            }
            path.push(type_name);
            current = self.model.ownership(id).map(|fk| fk.principal());
        }
        path
    }

    fn ownership_conflict<T>(
        &self,
        entity: EntityTypeId,
        message: String,
        source: ConfigurationSource,
    ) -> ModelResult<Option<T>> {
        if source == ConfigurationSource::Explicit {
            return Err(ModelError::OwnershipConflict {
                entity_type: self.entity_name(entity),
                message,
            });
        }
        Ok(None)
    }

    // ========================================================================
    // Many-to-many
    // ========================================================================

    /// Configure a many-to-many relationship through an implicit join type
    pub fn has_many_to_many(
        &mut self,
        left: EntityTypeId,
        left_navigation: &str,
        right_type: &str,
        right_navigation: Option<&str>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<SkipNavigationId>> {
        self.require_entity(left)?;
        let existing = self
            .model
            .find_skip_navigation(left, left_navigation)
            .filter(|s| self.type_name_of(s.target_entity_type()) == right_type)
            .map(|s| s.id());
        if let Some(existing) = existing {
            if let Some(s) = self.model.skip_navigation_mut(existing) {
                s.source = source.max_with(Some(s.source));
            }
            return Ok(Some(existing));
        }

        self.run_batch(|b| {
            let Some(right) = b.entity(right_type, source)? else {
                return Ok(None);
            };
            if left == right && right_navigation == Some(left_navigation) {
                return b.navigation_conflict(
                    left,
                    left_navigation,
                    "both ends of a self-referencing relationship use the same name",
                    source,
                );
            }
            if !b.clear_member_name(left, left_navigation, source, None)? {
                return Ok(None);
            }
            if let Some(name) = right_navigation {
                if !b.clear_member_name(right, name, source, None)? {
                    return Ok(None);
                }
            }

            let join_name = uniquify(
                &join_entity_name(&b.entity_name(left), &b.entity_name(right)),
                |n| b.model.find_entity_type(n).is_some(),
            );
            let join = b.model.insert_entity_type(
                &join_name,
                PROPERTY_BAG_TYPE,
                ConfigurationSource::Convention,
            );
            b.notify(ConventionEvent::EntityTypeAdded { entity_type: join });

            let mut key_properties = Vec::new();
            let mut foreign_keys = Vec::new();
            for principal in [left, right] {
                let key = b.ensure_principal_key(principal)?;
                let prefix = b.type_name_of(principal);
                let properties = b.add_shadow_foreign_key_properties(join, key, &prefix, false);
                key_properties.extend(properties.iter().copied());
                let fk = b.model.insert_foreign_key(
                    join,
                    principal,
                    key,
                    properties,
                    None,
                    ConfigurationSource::Convention,
                );
                if let Some(f) = b.model.foreign_key_mut(fk) {
                    f.is_required.try_set(true, ConfigurationSource::Convention);
                    f.delete_behavior
                        .try_set(DeleteBehavior::Cascade, ConfigurationSource::Convention);
                }
                b.notify(ConventionEvent::ForeignKeyAdded { foreign_key: fk });
                foreign_keys.push(fk);
            }

            let key = b
                .model
                .insert_key(join, key_properties, ConfigurationSource::Convention);
            if let Some(e) = b.model.entity_type_mut(join) {
                e.primary_key
                    .force(Some(key), Some(ConfigurationSource::Convention));
            }
            b.notify(ConventionEvent::KeyAdded { key });
            b.notify(ConventionEvent::PrimaryKeyChanged {
                entity_type: join,
                previous: None,
            });

            let left_skip = b.model.insert_skip_navigation(
                left,
                right,
                left_navigation,
                foreign_keys[0],
                source,
            );
            b.notify(ConventionEvent::SkipNavigationAdded {
                skip_navigation: left_skip,
            });
            if let Some(name) = right_navigation {
                let right_skip =
                    b.model
                        .insert_skip_navigation(right, left, name, foreign_keys[1], source);
                if let Some(s) = b.model.skip_navigation_mut(left_skip) {
                    s.inverse = Some(right_skip);
                }
                if let Some(s) = b.model.skip_navigation_mut(right_skip) {
                    s.inverse = Some(left_skip);
                }
                b.notify(ConventionEvent::SkipNavigationAdded {
                    skip_navigation: right_skip,
                });
            }
            debug!(join = %join_name, "Many-to-many relationship configured");
            Ok(Some(left_skip))
        })
    }

    // ========================================================================
    // Foreign Key Configuration
    // ========================================================================

    fn require_foreign_key(&self, fk: ForeignKeyId) -> ModelResult<&ForeignKey> {
        self.model
            .foreign_key(fk)
            .ok_or_else(|| ModelError::node_not_found(fk))
    }

    /// Set the dependent properties by name
    ///
    /// Missing names become shadow properties typed after the principal key.
    /// The returned handle follows the relationship if conventions merged it
    /// into another foreign key.
    pub fn has_foreign_key(
        &mut self,
        fk: ForeignKeyId,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let current = self.require_foreign_key(fk)?;
        if !source.overrides(current.properties_source()) {
            return Ok(None);
        }
        let dependent = current.dependent();
        let principal = current.principal();
        let principal_key: Vec<(String, DataType)> = self
            .model
            .key(current.principal_key())
            .map(|k| {
                k.properties()
                    .iter()
                    .filter_map(|p| self.model.property(*p))
                    .map(|p| (p.name().to_string(), p.data_type().clone()))
                    .collect()
            })
            .unwrap_or_default();
        let nullable = !current.is_required();

        if names.len() != principal_key.len() {
            if source == ConfigurationSource::Explicit {
                return Err(ModelError::ForeignKeyCountMismatch {
                    dependent: self.entity_name(dependent),
                    principal: self.entity_name(principal),
                    dependent_count: names.len(),
                    principal_count: principal_key.len(),
                });
            }
            return Ok(None);
        }
        for (name, (key_name, key_type)) in names.iter().zip(&principal_key) {
            if let Some(p) = self.model.find_property(dependent, name) {
                if !p.data_type().is_compatible_with(key_type) {
                    if source == ConfigurationSource::Explicit {
                        return Err(ModelError::ForeignKeyTypeMismatch {
                            dependent: self.entity_name(dependent),
                            property: p.name().to_string(),
                            property_type: p.data_type().keyword(),
                            principal: self.entity_name(principal),
                            principal_property: key_name.clone(),
                            principal_type: key_type.keyword(),
                        });
                    }
                    return Ok(None);
                }
            }
        }

        let applied = self.run_batch(|b| {
            let mut properties = Vec::with_capacity(names.len());
            for (name, (_, key_type)) in names.iter().zip(&principal_key) {
                let data_type = if nullable {
                    key_type.clone().into_nullable()
                } else {
                    key_type.clone()
                };
                let existing = b.model.find_property(dependent, name).map(|p| p.id());
                let property = match existing {
                    Some(p) => Some(p),
                    None => b.property(dependent, name, Some(data_type), source)?,
                };
                let Some(property) = property else {
                    return Ok(None);
                };
                properties.push(property);
            }
            b.replace_foreign_key_properties(fk, properties.clone(), Some(source))?;
            b.set_foreign_key_required_from_properties(fk);
            Ok(Some(properties))
        })?;

        let Some(properties) = applied else {
            return Ok(None);
        };
        if self.model.foreign_key(fk).is_some() {
            return Ok(Some(fk));
        }
        let relocated = self
            .model
            .foreign_keys_of(dependent)
            .into_iter()
            .find(|f| f.principal() == principal && f.properties() == properties.as_slice())
            .map(|f| f.id());
        debug!(from = %fk, to = ?relocated, "Foreign key handle relocated");
        Ok(relocated)
    }

    /// Point the relationship at an alternate key of the principal
    pub fn has_principal_key(
        &mut self,
        fk: ForeignKeyId,
        names: &[&str],
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let current = self.require_foreign_key(fk)?;
        if !source.overrides(current.principal_key_source()) {
            return Ok(None);
        }
        let dependent = current.dependent();
        let principal = current.principal();
        let properties = self.resolve_properties(principal, names)?;

        let applied = self.run_batch(|b| {
            let key = match b.model.find_key(principal, &properties).map(|k| k.id()) {
                Some(key) => key,
                None => match b.has_key_properties(principal, properties, source)? {
                    Some(key) => key,
                    None => return Ok(None),
                },
            };
            b.retarget_principal_key(fk, key)?;
            let Some(f) = b.model.foreign_key_mut(fk) else {
                return Ok(None);
            };
            f.principal_key_source = Some(source);
            Ok(Some((key, f.properties.clone())))
        })?;

        let Some((key, properties)) = applied else {
            return Ok(None);
        };
        if self.model.foreign_key(fk).is_some() {
            return Ok(Some(fk));
        }
        let candidates: Vec<&ForeignKey> = self
            .model
            .foreign_keys_of(dependent)
            .into_iter()
            .filter(|f| f.principal() == principal && f.principal_key() == key)
            .collect();
        let relocated = candidates
            .iter()
            .find(|f| f.properties() == properties.as_slice())
            .or_else(|| candidates.first())
            .map(|f| f.id());
        debug!(from = %fk, to = ?relocated, "Foreign key handle relocated");
        Ok(relocated)
    }

    /// Set whether the relationship is one-to-one
    pub fn foreign_key_unique(
        &mut self,
        fk: ForeignKeyId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        self.require_foreign_key(fk)?;
        self.run_batch(|b| Ok(b.set_foreign_key_unique(fk, unique, source)))
    }

    pub(crate) fn set_foreign_key_unique(
        &mut self,
        fk: ForeignKeyId,
        unique: bool,
        source: ConfigurationSource,
    ) -> bool {
        let Some(f) = self.model.foreign_key_mut(fk) else {
            return false;
        };
        let outcome = f.is_unique.try_set(unique, source);
        if outcome.is_applied() {
            self.notify(ConventionEvent::ForeignKeyUniquenessChanged { foreign_key: fk });
        }
        outcome.is_accepted()
    }

    /// Set whether every dependent must have a principal
    ///
    /// Dependent property nullability follows.
    pub fn foreign_key_required(
        &mut self,
        fk: ForeignKeyId,
        required: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        self.require_foreign_key(fk)?;
        self.run_batch(|b| {
            let Some(f) = b.model.foreign_key_mut(fk) else {
                return Ok(false);
            };
            let outcome = f.is_required.try_set(required, source);
            let properties = f.properties.clone();
            if outcome.is_applied() {
                for property in properties {
                    b.sync_property_nullability(property, !required, source);
                }
                b.notify(ConventionEvent::ForeignKeyRequirednessChanged { foreign_key: fk });
            }
            Ok(outcome.is_accepted())
        })
    }

    /// Requiredness inferred from dependent property nullability
    pub(crate) fn set_foreign_key_required_from_properties(&mut self, fk: ForeignKeyId) {
        let Some(f) = self.model.foreign_key(fk) else {
            return;
        };
        let required = !f.properties.is_empty()
            && f
                .properties
                .iter()
                .filter_map(|p| self.model.property(*p))
                .all(|p| !p.is_nullable());
        if let Some(f) = self.model.foreign_key_mut(fk) {
            if f
                .is_required
                .try_set(required, ConfigurationSource::Convention)
                .is_applied()
            {
                self.notify(ConventionEvent::ForeignKeyRequirednessChanged { foreign_key: fk });
            }
        }
    }

    /// Set what happens to dependents when their principal is deleted
    pub fn on_delete(
        &mut self,
        fk: ForeignKeyId,
        behavior: DeleteBehavior,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let f = self
            .model
            .foreign_key_mut(fk)
            .ok_or_else(|| ModelError::node_not_found(fk))?;
        Ok(f.delete_behavior.try_set(behavior, source).is_accepted())
    }

    /// Set or remove the navigation on one end of a relationship
    pub fn has_navigation(
        &mut self,
        fk: ForeignKeyId,
        name: Option<&str>,
        on_dependent: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self.require_foreign_key(fk)?;
        let declaring = if on_dependent {
            current.dependent()
        } else {
            current.principal()
        };
        match name {
            Some(name) => self.run_batch(|b| b.set_navigation(fk, name, on_dependent, source)),
            None => {
                let previous = current.navigation(on_dependent).map(str::to_string);
                self.run_batch(|b| {
                    let Some(f) = b.model.foreign_key_mut(fk) else {
                        return Ok(false);
                    };
                    let outcome = f.navigation_slot(on_dependent).try_reset(None, source);
                    if let (true, Some(name)) = (outcome.is_applied(), previous) {
                        b.notify(ConventionEvent::NavigationRemoved {
                            foreign_key: fk,
                            entity_type: declaring,
                            name,
                        });
                    }
                    Ok(outcome.is_accepted())
                })
            }
        }
    }

    pub(crate) fn set_navigation(
        &mut self,
        fk: ForeignKeyId,
        name: &str,
        on_dependent: bool,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        let current = self.require_foreign_key(fk)?;
        let declaring = if on_dependent {
            current.dependent()
        } else {
            current.principal()
        };
        if current.navigation(on_dependent) == Some(name) {
            if let Some(f) = self.model.foreign_key_mut(fk) {
                f.navigation_slot(on_dependent).raise_source(source);
            }
            return Ok(true);
        }
        if current.is_self_referencing() && current.navigation(!on_dependent) == Some(name) {
            return Ok(self
                .navigation_conflict::<()>(
                    declaring,
                    name,
                    "both ends of a self-referencing relationship use the same name",
                    source,
                )?
                .is_some());
        }
        let value = Some(name.to_string());
        if !current
            .navigation_source(on_dependent)
            .is_none_or(|s| source.overrides(Some(s)))
        {
            return Ok(false);
        }
        let previous = current.navigation(on_dependent).map(str::to_string);
        if !self.clear_member_name(declaring, name, source, Some(fk))? {
            return Ok(false);
        }

        let Some(f) = self.model.foreign_key_mut(fk) else {
            return Ok(false);
        };
        if !f.navigation_slot(on_dependent).try_set(value, source).is_applied() {
            return Ok(true);
        }
        if let Some(previous) = previous {
            self.notify(ConventionEvent::NavigationRemoved {
                foreign_key: fk,
                entity_type: declaring,
                name: previous,
            });
        }
        self.notify(ConventionEvent::NavigationAdded {
            foreign_key: fk,
            on_dependent,
        });
        Ok(true)
    }

    /// Swap the dependent and principal ends of a one-to-one relationship
    ///
    /// The relationship gets a new foreign key; the old handle is removed.
    pub fn invert(
        &mut self,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        let current = self.require_foreign_key(fk)?;
        if !current.is_unique() || current.is_ownership() {
            if source == ConfigurationSource::Explicit {
                return Err(ModelError::invalid_configuration(format!(
                    "only one-to-one relationships can be inverted ({} to {})",
                    self.entity_name(current.dependent()),
                    self.entity_name(current.principal())
                )));
            }
            return Ok(None);
        }
        if !source.overrides(current.properties_source())
            || !source.overrides(Some(current.source()))
        {
            return Ok(None);
        }
        let ends = Ends {
            dependent: current.principal(),
            principal: current.dependent(),
            to_principal: current.principal_to_dependent().map(str::to_string),
            to_dependent: current.dependent_to_principal().map(str::to_string),
        };

        self.run_batch(|b| {
            b.remove_foreign_key_node(fk, false)?;
            b.resolve_relationship(ends, true, source)
        })
    }

    /// Remove a relationship unless a stronger source configured it
    pub fn remove_foreign_key(
        &mut self,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> ModelResult<bool> {
        if !source.overrides(Some(self.require_foreign_key(fk)?.source())) {
            return Ok(false);
        }
        self.run_batch(|b| b.remove_foreign_key_node(fk, true))?;
        Ok(true)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Primary key of the principal, or a temporary shadow key when it has
    /// none yet
    pub(crate) fn ensure_principal_key(&mut self, principal: EntityTypeId) -> ModelResult<KeyId> {
        let root = self.model.root_of(principal);
        self.require_entity(root)?;
        if let Some(key) = self.model.primary_key(root) {
            return Ok(key.id());
        }
        let temporary = self
            .model
            .find_declared_property(root, TEMPORARY_KEY_NAME)
            .filter(|p| p.is_shadow())
            .and_then(|p| self.model.find_key(root, &[p.id()]))
            .map(|k| k.id());
        if let Some(key) = temporary {
            return Ok(key);
        }

        let name = uniquify(TEMPORARY_KEY_NAME, |n| self.model.is_member_name_taken(root, n));
        let property = self.model.insert_property(
            root,
            &name,
            None,
            &DataType::Int32,
            ConfigurationSource::Convention,
        );
        self.notify(ConventionEvent::PropertyAdded { property });
        let key = self
            .model
            .insert_key(root, vec![property], ConfigurationSource::Convention);
        self.notify(ConventionEvent::KeyAdded { key });
        trace!(entity_type = %self.entity_name(root), "Temporary principal key added");
        Ok(key)
    }

    pub(crate) fn create_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        key: KeyId,
        prefix: &str,
        source: ConfigurationSource,
    ) -> ForeignKeyId {
        let properties = self.add_shadow_foreign_key_properties(dependent, key, prefix, true);
        let fk = self
            .model
            .insert_foreign_key(dependent, principal, key, properties, None, source);
        self.notify(ConventionEvent::ForeignKeyAdded { foreign_key: fk });
        fk
    }

    /// One shadow property per principal key property
    pub(crate) fn add_shadow_foreign_key_properties(
        &mut self,
        dependent: EntityTypeId,
        key: KeyId,
        prefix: &str,
        nullable: bool,
    ) -> Vec<PropertyId> {
        let key_properties: Vec<(String, DataType)> = self
            .model
            .key(key)
            .map(|k| {
                k.properties()
                    .iter()
                    .filter_map(|p| self.model.property(*p))
                    .map(|p| (p.name().to_string(), p.data_type().clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut properties = Vec::with_capacity(key_properties.len());
        for (key_name, key_type) in key_properties {
            let name = uniquify(&foreign_key_property_name(prefix, &key_name), |n| {
                self.model.is_member_name_taken(dependent, n)
            });
            let data_type = if nullable {
                key_type.into_nullable()
            } else {
                key_type
            };
            let property = self.model.insert_property(
                dependent,
                &name,
                None,
                &data_type,
                ConfigurationSource::Convention,
            );
            self.notify(ConventionEvent::PropertyAdded { property });
            properties.push(property);
        }
        properties
    }

    /// Whether the dependent properties line up with the principal key
    pub(crate) fn is_foreign_key_compatible(&self, fk: ForeignKeyId) -> bool {
        let Some(f) = self.model.foreign_key(fk) else {
            return false;
        };
        let Some(key) = self.model.key(f.principal_key()) else {
            return false;
        };
        f.properties.len() == key.properties().len()
            && f.properties.iter().zip(key.properties()).all(|(d, p)| {
                match (self.model.property(*d), self.model.property(*p)) {
                    (Some(d), Some(p)) => d.data_type().is_compatible_with(p.data_type()),
                    _ => false,
                }
            })
    }

    /// Replace the dependent properties, discarding unused shadow ones
    pub(crate) fn replace_foreign_key_properties(
        &mut self,
        fk: ForeignKeyId,
        properties: Vec<PropertyId>,
        properties_source: Option<ConfigurationSource>,
    ) -> ModelResult<()> {
        let Some(f) = self.model.foreign_key_mut(fk) else {
            return Ok(());
        };
        if f.properties == properties {
            f.properties_source = match (properties_source, f.properties_source) {
                (Some(new), current) => Some(new.max_with(current)),
                (None, current) => current,
            };
            return Ok(());
        }
        let old = std::mem::replace(&mut f.properties, properties);
        f.properties_source = properties_source;
        self.notify(ConventionEvent::ForeignKeyPropertiesChanged { foreign_key: fk });
        self.discard_shadow_properties(&old)
    }

    /// Fresh shadow properties matching the current principal key
    pub(crate) fn reset_foreign_key_properties(&mut self, fk: ForeignKeyId) -> ModelResult<()> {
        let Some(f) = self.model.foreign_key(fk) else {
            return Ok(());
        };
        let dependent = f.dependent();
        let key = f.principal_key();
        let nullable = !f.is_required() && !f.is_ownership();
        let prefix = if f.is_ownership() {
            self.type_name_of(f.principal())
        } else {
            f.dependent_to_principal()
                .map(str::to_string)
                .unwrap_or_else(|| self.type_name_of(f.principal()))
        };

        // free the old names first so the new properties can take them
        let old = match self.model.foreign_key_mut(fk) {
            Some(f) => std::mem::take(&mut f.properties),
            None => Vec::new(),
        };
        self.discard_shadow_properties(&old)?;

        let properties = self.add_shadow_foreign_key_properties(dependent, key, &prefix, nullable);
        if let Some(f) = self.model.foreign_key_mut(fk) {
            f.properties = properties;
            f.properties_source = None;
        }
        self.notify(ConventionEvent::ForeignKeyPropertiesChanged { foreign_key: fk });
        Ok(())
    }

    /// Remove convention shadow properties nothing uses anymore
    pub(crate) fn discard_shadow_properties(
        &mut self,
        properties: &[PropertyId],
    ) -> ModelResult<()> {
        for property in properties {
            let unused = self.model.property(*property).is_some_and(|p| {
                p.is_shadow()
                    && p.source() == ConfigurationSource::Convention
                    && self.model.foreign_keys_using(*property).is_empty()
                    && !self.is_key_property(*property)
            });
            if unused {
                self.remove_property_node(*property)?;
            }
        }
        Ok(())
    }

    /// Point a foreign key at another principal key, fixing up inferred
    /// dependent properties
    pub(crate) fn retarget_principal_key(
        &mut self,
        fk: ForeignKeyId,
        key: KeyId,
    ) -> ModelResult<()> {
        let Some(f) = self.model.foreign_key_mut(fk) else {
            return Ok(());
        };
        if f.principal_key == key {
            return Ok(());
        }
        f.principal_key = key;
        let inferred = ConfigurationSource::Convention.overrides(f.properties_source);
        let properties = f.properties.clone();
        // shadow properties are renamed after the new key
        let shadow = properties
            .iter()
            .filter_map(|p| self.model.property(*p))
            .all(|p| p.is_convention_shadow());
        if inferred && (shadow || !self.is_foreign_key_compatible(fk)) {
            return self.reset_foreign_key_properties(fk);
        }
        self.notify(ConventionEvent::ForeignKeyPropertiesChanged { foreign_key: fk });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ormforge_core::ConfigurationSource::*;

    fn builder_with_customer() -> (ModelBuilder, EntityTypeId) {
        let mut builder = ModelBuilder::bare();
        let customer = builder.entity("Customer", Explicit).unwrap().unwrap();
        builder
            .property(customer, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(customer, &["Id"], Explicit).unwrap();
        (builder, customer)
    }

    #[test]
    fn test_many_to_one_creates_shadow_foreign_key() {
        let (mut builder, customer) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(
                order,
                "Customer",
                RelationshipSpec::many_to_one()
                    .with_navigation("Customer")
                    .with_inverse("Orders"),
                Explicit,
            )
            .unwrap()
            .unwrap();

        let model = builder.model();
        let fk = model.foreign_key(fk).unwrap();
        assert_eq!(fk.dependent(), order);
        assert_eq!(fk.principal(), customer);
        assert_eq!(model.property_names(fk.properties()), vec!["CustomerId"]);
        assert!(model.property(fk.properties()[0]).unwrap().is_shadow());
        assert!(model.property(fk.properties()[0]).unwrap().is_nullable());
        assert!(!fk.is_required());
        assert!(model.find_navigation(customer, "Orders").unwrap().is_collection);
    }

    #[test]
    fn test_relationship_is_idempotent_from_both_ends() {
        let (mut builder, customer) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let first = builder
            .has_relationship(
                customer,
                "Order",
                RelationshipSpec::one_to_many().with_navigation("Orders"),
                Explicit,
            )
            .unwrap();
        let second = builder
            .has_relationship(
                order,
                "Customer",
                RelationshipSpec::many_to_one()
                    .with_navigation("Customer")
                    .with_inverse("Orders"),
                Explicit,
            )
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.model().foreign_keys().count(), 1);
    }

    #[test]
    fn test_principal_without_key_gets_temporary_key() {
        let mut builder = ModelBuilder::bare();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(order, "Customer", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        let model = builder.model();
        let customer = model.find_entity_type("Customer").unwrap().id();
        assert!(model.find_property(customer, TEMPORARY_KEY_NAME).unwrap().is_shadow());
        assert_eq!(
            model.property_names(model.foreign_key(fk).unwrap().properties()),
            vec!["CustomerTempId"]
        );
    }

    #[test]
    fn test_owned_type_cannot_be_principal() {
        let (mut builder, customer) = builder_with_customer();
        builder
            .has_ownership(customer, "Address", OwnershipSpec::one("Address"), Explicit)
            .unwrap();
        let owned = builder
            .model()
            .find_entity_type("Customer.Address#Address")
            .unwrap()
            .id();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let err = builder
            .has_relationship(
                order,
                "Customer.Address#Address",
                RelationshipSpec::many_to_one(),
                Explicit,
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::OwnedTypeAsPrincipal { .. }));
        assert!(builder.model().is_owned(owned));
    }

    #[test]
    fn test_ownership_creates_one_type_per_navigation() {
        let (mut builder, customer) = builder_with_customer();
        let shipping = builder
            .has_ownership(customer, "Address", OwnershipSpec::one("ShippingAddress"), Explicit)
            .unwrap()
            .unwrap();
        let billing = builder
            .has_ownership(customer, "Address", OwnershipSpec::one("BillingAddress"), Explicit)
            .unwrap()
            .unwrap();
        assert_ne!(shipping, billing);

        let model = builder.model();
        let fk = model.foreign_key(shipping).unwrap();
        assert!(fk.is_ownership());
        assert!(fk.is_unique());
        assert!(fk.is_required());
        assert_eq!(
            model.entity_type(fk.dependent()).unwrap().name(),
            "Customer.ShippingAddress#Address"
        );
        assert!(model.find_entity_type("Address").is_none());

        // repeated request reuses the ownership
        let again = builder
            .has_ownership(customer, "Address", OwnershipSpec::one("ShippingAddress"), Convention)
            .unwrap();
        assert_eq!(again, Some(shipping));
    }

    #[test]
    fn test_recursive_ownership_rejected() {
        let (mut builder, customer) = builder_with_customer();
        let fk = builder
            .has_ownership(customer, "Address", OwnershipSpec::one("Address"), Explicit)
            .unwrap()
            .unwrap();
        let address = builder.model().foreign_key(fk).unwrap().dependent();
        let err = builder
            .has_ownership(address, "Address", OwnershipSpec::one("Next"), Explicit)
            .unwrap_err();
        assert!(matches!(err, ModelError::OwnershipConflict { .. }));
        assert_eq!(
            builder
                .has_ownership(address, "Customer", OwnershipSpec::one("Owner"), Convention)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_many_to_many_join_type() {
        let (mut builder, _) = builder_with_customer();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        builder
            .property(post, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(post, &["Id"], Explicit).unwrap();
        let tag = builder.entity("Tag", Explicit).unwrap().unwrap();
        builder
            .property(tag, "Id", Some(DataType::Int64), Explicit)
            .unwrap();
        builder.primary_key(tag, &["Id"], Explicit).unwrap();

        let skip = builder
            .has_many_to_many(post, "Tags", "Tag", Some("Posts"), Explicit)
            .unwrap()
            .unwrap();
        let model = builder.model();
        let join = model.find_entity_type("PostTag").unwrap();
        assert_eq!(join.type_name(), PROPERTY_BAG_TYPE);
        assert_eq!(
            model.property_names(model.primary_key(join.id()).unwrap().properties()),
            vec!["PostId", "TagId"]
        );
        let skip = model.skip_navigation(skip).unwrap();
        let inverse = model.skip_navigation(skip.inverse().unwrap()).unwrap();
        assert_eq!(inverse.name(), "Posts");
        assert_eq!(
            model.foreign_key(skip.foreign_key()).unwrap().delete_behavior(),
            DeleteBehavior::Cascade
        );
    }

    #[test]
    fn test_has_foreign_key_validates_shape() {
        let (mut builder, _) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        builder
            .property(order, "CustomerCode", Some(DataType::String), Explicit)
            .unwrap();
        let fk = builder
            .has_relationship(order, "Customer", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();

        let err = builder
            .has_foreign_key(fk, &["A", "B"], Explicit)
            .unwrap_err();
        assert!(matches!(err, ModelError::ForeignKeyCountMismatch { .. }));
        let err = builder
            .has_foreign_key(fk, &["CustomerCode"], Explicit)
            .unwrap_err();
        assert!(matches!(err, ModelError::ForeignKeyTypeMismatch { .. }));
        assert_eq!(
            builder.has_foreign_key(fk, &["CustomerCode"], Convention).unwrap(),
            None
        );
    }

    #[test]
    fn test_has_foreign_key_replaces_shadow_property() {
        let (mut builder, _) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(order, "Customer", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        let fk = builder
            .has_foreign_key(fk, &["BuyerId"], Explicit)
            .unwrap()
            .unwrap();

        let model = builder.model();
        let fk = model.foreign_key(fk).unwrap();
        assert_eq!(model.property_names(fk.properties()), vec!["BuyerId"]);
        assert_eq!(fk.properties_source(), Some(Explicit));
        assert!(model.find_property(order, "CustomerId").is_none());
    }

    #[test]
    fn test_required_relationship_updates_properties() {
        let (mut builder, _) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(order, "Customer", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        assert!(builder.foreign_key_required(fk, true, Explicit).unwrap());
        let model = builder.model();
        let property = model.foreign_key(fk).unwrap().properties()[0];
        assert!(!model.property(property).unwrap().is_nullable());
    }

    #[test]
    fn test_self_reference_navigation_conflict() {
        let mut builder = ModelBuilder::bare();
        let employee = builder.entity("Employee", Explicit).unwrap().unwrap();
        let err = builder
            .has_relationship(
                employee,
                "Employee",
                RelationshipSpec::many_to_one()
                    .with_navigation("Manager")
                    .with_inverse("Manager"),
                Explicit,
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::NavigationConflict { .. }));
    }

    #[test]
    fn test_invert_one_to_one() {
        let (mut builder, customer) = builder_with_customer();
        let profile = builder.entity("Profile", Explicit).unwrap().unwrap();
        builder
            .property(profile, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(profile, &["Id"], Explicit).unwrap();
        let fk = builder
            .has_relationship(
                customer,
                "Profile",
                RelationshipSpec::one_to_one()
                    .with_navigation("Profile")
                    .with_inverse("Customer"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        assert_eq!(builder.model().foreign_key(fk).unwrap().dependent(), customer);

        let inverted = builder.invert(fk, Explicit).unwrap().unwrap();
        let model = builder.model();
        assert!(model.foreign_key(fk).is_none());
        let inverted = model.foreign_key(inverted).unwrap();
        assert_eq!(inverted.dependent(), profile);
        assert_eq!(inverted.dependent_to_principal(), Some("Customer"));
        assert_eq!(inverted.principal_to_dependent(), Some("Profile"));
        assert!(model.find_property(customer, "ProfileId").is_none());
    }

    #[test]
    fn test_navigation_removal_follows_precedence() {
        let (mut builder, customer) = builder_with_customer();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(
                order,
                "Customer",
                RelationshipSpec::many_to_one().with_inverse("Orders"),
                Explicit,
            )
            .unwrap()
            .unwrap();
        assert!(!builder.has_navigation(fk, None, false, Convention).unwrap());
        assert!(builder.has_navigation(fk, None, false, Explicit).unwrap());
        assert!(builder.model().find_navigation(customer, "Orders").is_none());
    }
}
