//! Serializable snapshots of a settled model
//!
//! A snapshot flattens the graph into names so it can be written out,
//! compared between builds, or read by tools that never link the builder.

use crate::graph::{Annotations, EntityType, ForeignKey, Model};
use chrono::{DateTime, Utc};
use ormforge_core::{
    ConfigurationSource, DataType, DeleteBehavior, EntityTypeId, ModelResult, ValueGenerated,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Snapshot layout version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// ModelSnapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,

    /// Identifier of the model the snapshot was taken from
    pub model_id: Uuid,

    /// Version of ormforge that took the snapshot
    pub product_version: String,

    pub taken_at: DateTime<Utc>,

    /// Entity types ordered by name
    pub entity_types: Vec<EntityTypeSnapshot>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeSnapshot {
    pub name: String,
    pub source: ConfigurationSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,

    /// Owner type for owned entity types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    pub properties: Vec<PropertySnapshot>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complex_properties: Vec<ComplexPropertySnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_keys: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeySnapshot>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_navigations: Vec<SkipNavigationSnapshot>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSnapshot>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub nullable: bool,
    pub shadow: bool,
    pub value_generated: ValueGenerated,
    pub source: ConfigurationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexPropertySnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub collection: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    pub principal: String,
    pub properties: Vec<String>,
    pub principal_key: Vec<String>,
    pub unique: bool,
    pub required: bool,
    pub ownership: bool,
    pub on_delete: DeleteBehavior,

    /// Navigation on the dependent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,

    /// Navigation on the principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    pub source: ConfigurationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipNavigationSnapshot {
    pub name: String,
    pub target: String,

    /// Join entity type the navigation passes through
    pub join_entity_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub properties: Vec<String>,
    pub unique: bool,
}

// ============================================================================
// Construction
// ============================================================================

impl ModelSnapshot {
    pub fn from_model(model: &Model) -> Self {
        let mut entity_types: Vec<EntityTypeSnapshot> = model
            .entity_types()
            .map(|entity| EntityTypeSnapshot::new(model, entity))
            .collect();
        entity_types.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            model_id: model.id(),
            product_version: crate::VERSION.to_string(),
            taken_at: Utc::now(),
            entity_types,
            annotations: annotation_values(model.annotations()),
        }
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeSnapshot> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl EntityTypeSnapshot {
    fn new(model: &Model, entity: &EntityType) -> Self {
        let id = entity.id();
        let name_of = |id: EntityTypeId| {
            model
                .entity_type(id)
                .map(|e| e.name().to_string())
                .unwrap_or_default()
        };
        let primary_key = entity.primary_key_id();

        Self {
            name: entity.name().to_string(),
            source: entity.source(),
            base_type: entity.base_type().map(name_of),
            owner: model.ownership(id).map(|fk| name_of(fk.principal())),
            properties: model
                .properties_of(id)
                .into_iter()
                .map(|p| PropertySnapshot {
                    name: p.name().to_string(),
                    data_type: p.data_type().clone(),
                    nullable: p.is_nullable(),
                    shadow: p.is_shadow(),
                    value_generated: p.value_generated(),
                    source: p.source(),
                })
                .collect(),
            complex_properties: model
                .complex_properties_of(id)
                .into_iter()
                .map(|c| ComplexPropertySnapshot {
                    name: c.name().to_string(),
                    type_name: c.type_name().to_string(),
                    collection: c.is_collection(),
                    nullable: c.is_nullable(),
                })
                .collect(),
            primary_key: primary_key
                .and_then(|k| model.key(k))
                .map(|k| model.property_names(k.properties())),
            alternate_keys: entity
                .key_ids()
                .iter()
                .filter(|k| Some(**k) != primary_key)
                .filter_map(|k| model.key(*k))
                .map(|k| model.property_names(k.properties()))
                .collect(),
            foreign_keys: model
                .foreign_keys_of(id)
                .into_iter()
                .map(|fk| ForeignKeySnapshot::new(model, fk))
                .collect(),
            skip_navigations: model
                .skip_navigations_of(id)
                .into_iter()
                .map(|s| SkipNavigationSnapshot {
                    name: s.name().to_string(),
                    target: name_of(s.target_entity_type()),
                    join_entity_type: model
                        .foreign_key(s.foreign_key())
                        .map(|fk| name_of(fk.dependent()))
                        .unwrap_or_default(),
                    inverse: s
                        .inverse()
                        .and_then(|i| model.skip_navigation(i))
                        .map(|i| i.name().to_string()),
                })
                .collect(),
            indexes: model
                .indexes_of(id)
                .into_iter()
                .map(|i| IndexSnapshot {
                    name: i.name().map(str::to_string),
                    properties: model.property_names(i.properties()),
                    unique: i.is_unique(),
                })
                .collect(),
            annotations: annotation_values(entity.annotations()),
        }
    }
}

impl ForeignKeySnapshot {
    fn new(model: &Model, fk: &ForeignKey) -> Self {
        Self {
            principal: model
                .entity_type(fk.principal())
                .map(|e| e.name().to_string())
                .unwrap_or_default(),
            properties: model.property_names(fk.properties()),
            principal_key: model
                .key(fk.principal_key())
                .map(|k| model.property_names(k.properties()))
                .unwrap_or_default(),
            unique: fk.is_unique(),
            required: fk.is_required(),
            ownership: fk.is_ownership(),
            on_delete: fk.delete_behavior(),
            navigation: fk.dependent_to_principal().map(str::to_string),
            inverse: fk.principal_to_dependent().map(str::to_string),
            source: fk.source(),
        }
    }
}

fn annotation_values(annotations: &Annotations) -> BTreeMap<String, Value> {
    annotations
        .iter()
        .map(|(name, a)| (name.to_string(), a.value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelBuilder, RelationshipSpec, TypeShape};
    use crate::conventions::PRODUCT_VERSION_ANNOTATION;
    use pretty_assertions::assert_eq;

    fn blog_model() -> Model {
        let mut builder = ModelBuilder::new();
        builder
            .register_shape(
                TypeShape::new("Blog")
                    .scalar("Id", DataType::Int32)
                    .collection("Posts", "Post"),
            )
            .unwrap();
        builder
            .register_shape(
                TypeShape::new("Post")
                    .scalar("Id", DataType::Int32)
                    .scalar("BlogId", DataType::Int32)
                    .reference("Blog", "Blog"),
            )
            .unwrap();
        let post = builder
            .entity("Post", ConfigurationSource::Explicit)
            .unwrap()
            .unwrap();
        builder
            .has_relationship(
                post,
                "Blog",
                RelationshipSpec::many_to_one()
                    .with_navigation("Blog")
                    .with_inverse("Posts"),
                ConfigurationSource::Explicit,
            )
            .unwrap();
        builder.finalize().unwrap()
    }

    #[test]
    fn test_snapshot_uses_names() {
        let model = blog_model();
        let snapshot = ModelSnapshot::from_model(&model);

        let names: Vec<&str> = snapshot.entity_types.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Blog", "Post"]);

        let post = snapshot.entity_type("Post").unwrap();
        assert_eq!(post.primary_key, Some(vec!["Id".to_string()]));
        let fk = &post.foreign_keys[0];
        assert_eq!(fk.principal, "Blog");
        assert_eq!(fk.properties, vec!["BlogId"]);
        assert_eq!(fk.principal_key, vec!["Id"]);
        assert_eq!(fk.inverse.as_deref(), Some("Posts"));
        assert_eq!(fk.on_delete, DeleteBehavior::Cascade);
        assert!(post.indexes.iter().any(|i| i.properties == vec!["BlogId"]));

        assert_eq!(
            snapshot.annotations.get(PRODUCT_VERSION_ANNOTATION),
            Some(&Value::String(crate::VERSION.to_string()))
        );
    }

    #[test]
    fn test_snapshot_json_readable() {
        let snapshot = ModelSnapshot::from_model(&blog_model());
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"principal\": \"Blog\""));
        assert_eq!(ModelSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
