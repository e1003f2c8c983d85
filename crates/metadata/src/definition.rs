//! Model definition files
//!
//! A definition lists type shapes and the explicit configuration applied on
//! top of them. JSON and TOML are accepted, chosen by file extension:
//!
//! ```toml
//! [[shapes]]
//! name = "Blog"
//! members = [
//!     { name = "Id", kind = { scalar = "int32" } },
//!     { name = "Posts", kind = { collection = "Post" } },
//! ]
//!
//! [[entities]]
//! name = "Blog"
//!
//! [[entities.indexes]]
//! properties = ["Id"]
//! unique = true
//! ```

use crate::ModelBuilder;
use crate::builder::{OwnershipSpec, RelationshipKind, RelationshipSpec};
use crate::config::BuilderConfig;
use crate::graph::{AnnotatableId, Model};
use crate::shape::TypeShape;
use ormforge_core::{
    ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ModelError, ModelResult,
    ResultExt,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const RANK: ConfigurationSource = ConfigurationSource::Explicit;

// ============================================================================
// Definition Types
// ============================================================================

/// Shapes and explicit configuration of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub shapes: Vec<TypeShape>,

    #[serde(default)]
    pub entities: Vec<EntityDefinition>,

    /// Model-level annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
}

/// Explicit configuration of one entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDefinition>,

    /// Primary key property names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_keys: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,

    /// Members left out of the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owns: Vec<OwnershipDefinition>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
}

/// A property; without a type it must be a scalar member of the shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub properties: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub unique: bool,
}

/// A relationship declared from this entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    pub target: String,

    #[serde(default)]
    pub kind: RelationshipKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    /// Dependent property names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<Vec<String>>,

    /// Principal key property names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_key: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<DeleteBehavior>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipDefinition {
    /// Owned type name
    #[serde(rename = "type")]
    pub type_name: String,

    pub navigation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    #[serde(default)]
    pub collection: bool,
}

// ============================================================================
// Loading
// ============================================================================

impl ModelDefinition {
    pub fn from_json_str(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a `.json` or `.toml` definition file
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> ModelResult<Self> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            _ => return Err(ModelError::UnsupportedFormat(path.to_path_buf())),
        };
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse(&text).with_context(format!("Invalid definition '{}'", path.display()))
    }

    pub fn to_json_string(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Applying
    // ========================================================================

    /// Replay the definition through a builder at Explicit rank
    ///
    /// Entity types are added first, then members and keys, then
    /// relationships, all in one convention batch.
    pub fn apply(&self, builder: &mut ModelBuilder) -> ModelResult<()> {
        for shape in &self.shapes {
            if !builder.shapes().contains(&shape.name) {
                builder.register_shape(shape.clone())?;
            }
        }

        builder.batch(|b| {
            let mut entities = Vec::with_capacity(self.entities.len());
            for definition in &self.entities {
                let entity = b
                    .entity(&definition.name, RANK)?
                    .ok_or_else(|| ModelError::EntityTypeNotFound(definition.name.clone()))?;
                entities.push((entity, definition));
            }
            for (entity, definition) in &entities {
                if let Some(base) = &definition.base_type {
                    let base = b.entity(base, RANK)?;
                    b.has_base_type(*entity, base, RANK)?;
                }
            }
            for (entity, definition) in &entities {
                Self::apply_members(b, *entity, definition)?;
            }
            for (entity, definition) in &entities {
                Self::apply_relationships(b, *entity, definition)?;
            }
            for (name, value) in &self.annotations {
                b.has_annotation(AnnotatableId::Model, name, value.clone(), RANK)?;
            }
            Ok(())
        })?;
        debug!(entity_types = self.entities.len(), "Definition applied");
        Ok(())
    }

    /// Apply the definition to a new builder and finalize it
    pub fn build(&self, config: BuilderConfig) -> ModelResult<Model> {
        let mut builder = ModelBuilder::with_config(config);
        self.apply(&mut builder)?;
        builder.finalize()
    }

    fn apply_members(
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        definition: &EntityDefinition,
    ) -> ModelResult<()> {
        for member in &definition.ignore {
            builder.ignore(entity, member, RANK)?;
        }
        for property in &definition.properties {
            let data_type = property.data_type.clone();
            let Some(id) = builder.property(entity, &property.name, data_type, RANK)? else {
                continue;
            };
            if let Some(required) = property.required {
                builder.property_required(id, required, RANK)?;
            }
        }
        let referenced = definition
            .key
            .iter()
            .chain(&definition.alternate_keys)
            .chain(definition.indexes.iter().map(|i| &i.properties))
            .flatten();
        for name in referenced {
            map_member(builder, entity, name)?;
        }
        if let Some(key) = &definition.key {
            builder.primary_key(entity, &as_strs(key), RANK)?;
        }
        for key in &definition.alternate_keys {
            builder.has_key(entity, &as_strs(key), RANK)?;
        }
        for index in &definition.indexes {
            let names = as_strs(&index.properties);
            let id = match &index.name {
                Some(name) => builder.has_named_index(entity, name, &names, RANK)?,
                None => builder.has_index(entity, &names, RANK)?,
            };
            if let Some(id) = id {
                builder.index_unique(id, index.unique, RANK)?;
            }
        }
        for (name, value) in &definition.annotations {
            builder.has_annotation(AnnotatableId::EntityType(entity), name, value.clone(), RANK)?;
        }
        Ok(())
    }

    fn apply_relationships(
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        definition: &EntityDefinition,
    ) -> ModelResult<()> {
        for owned in &definition.owns {
            let spec = OwnershipSpec {
                navigation: owned.navigation.clone(),
                inverse: owned.inverse.clone(),
                collection: owned.collection,
            };
            builder.has_ownership(entity, &owned.type_name, spec, RANK)?;
        }

        for relationship in &definition.relationships {
            let spec = RelationshipSpec {
                kind: relationship.kind,
                navigation: relationship.navigation.clone(),
                inverse: relationship.inverse.clone(),
            };
            let Some(mut fk) =
                builder.has_relationship(entity, &relationship.target, spec, RANK)?
            else {
                continue;
            };
            if relationship.kind == RelationshipKind::ManyToMany {
                continue;
            }
            if let Some(names) = &relationship.principal_key {
                let principal = builder
                    .model()
                    .foreign_key(fk)
                    .map(|f| f.principal())
                    .ok_or_else(|| ModelError::node_not_found(fk))?;
                for name in names {
                    map_member(builder, principal, name)?;
                }
                match builder.has_principal_key(fk, &as_strs(names), RANK)? {
                    Some(relocated) => fk = relocated,
                    None => continue,
                }
            }
            if let Some(names) = &relationship.foreign_key {
                match builder.has_foreign_key(fk, &as_strs(names), RANK)? {
                    Some(relocated) => fk = relocated,
                    None => continue,
                }
            }
            if let Some(required) = relationship.required {
                builder.foreign_key_required(fk, required, RANK)?;
            }
            if let Some(behavior) = relationship.on_delete {
                builder.on_delete(fk, behavior, RANK)?;
            }
        }
        Ok(())
    }
}

/// Map a scalar member named by a key or index before discovery reaches it
fn map_member(builder: &mut ModelBuilder, entity: EntityTypeId, name: &str) -> ModelResult<()> {
    if builder.model().find_property(entity, name).is_none() {
        builder.property(entity, name, None, RANK)?;
    }
    Ok(())
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}
