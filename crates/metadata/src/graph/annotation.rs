//! Annotations attachable to any metadata node

use crate::ledger::SetOutcome;
use ormforge_core::{
    ComplexPropertyId, ConfigurationSource, EntityTypeId, ForeignKeyId, IndexId, KeyId,
    PropertyId, SkipNavigationId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single annotation value with its configuration source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub value: Value,
    pub source: ConfigurationSource,
}

/// Named annotations of one node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations {
    entries: BTreeMap<String, Annotation>,
}

impl Annotations {
    /// Get an annotation by name
    pub fn get(&self, name: &str) -> Option<&Annotation> {
        self.entries.get(name)
    }

    /// Get an annotation value by name
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|a| &a.value)
    }

    /// Iterate annotations in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Annotation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of annotations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no annotations
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn try_set(
        &mut self,
        name: &str,
        value: Value,
        source: ConfigurationSource,
    ) -> SetOutcome {
        match self.entries.get_mut(name) {
            Some(existing) if existing.value == value => {
                existing.source = source.max_with(Some(existing.source));
                SetOutcome::Unchanged
            }
            Some(existing) if source >= existing.source => {
                existing.value = value;
                existing.source = source;
                SetOutcome::Applied
            }
            Some(_) => SetOutcome::Rejected,
            None => {
                self.entries
                    .insert(name.to_string(), Annotation { value, source });
                SetOutcome::Applied
            }
        }
    }

    pub(crate) fn try_remove(&mut self, name: &str, source: ConfigurationSource) -> SetOutcome {
        match self.entries.get(name) {
            None => SetOutcome::Unchanged,
            Some(existing) if source >= existing.source => {
                self.entries.remove(name);
                SetOutcome::Applied
            }
            Some(_) => SetOutcome::Rejected,
        }
    }
}

// JSON values are not `Hash`; their canonical text stands in for them.
impl Hash for Annotations {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (name, annotation) in &self.entries {
            name.hash(state);
            annotation.value.to_string().hash(state);
            annotation.source.hash(state);
        }
    }
}

/// Any node that can carry annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AnnotatableId {
    Model,
    EntityType(EntityTypeId),
    Property(PropertyId),
    ComplexProperty(ComplexPropertyId),
    Key(KeyId),
    ForeignKey(ForeignKeyId),
    SkipNavigation(SkipNavigationId),
    Index(IndexId),
}

impl fmt::Display for AnnotatableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotatableId::Model => f.write_str("Model"),
            AnnotatableId::EntityType(id) => id.fmt(f),
            AnnotatableId::Property(id) => id.fmt(f),
            AnnotatableId::ComplexProperty(id) => id.fmt(f),
            AnnotatableId::Key(id) => id.fmt(f),
            AnnotatableId::ForeignKey(id) => id.fmt(f),
            AnnotatableId::SkipNavigation(id) => id.fmt(f),
            AnnotatableId::Index(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormforge_core::ConfigurationSource::*;
    use serde_json::json;

    #[test]
    fn test_annotation_precedence() {
        let mut annotations = Annotations::default();
        assert_eq!(
            annotations.try_set("MaxLength", json!(50), Explicit),
            SetOutcome::Applied
        );
        assert_eq!(
            annotations.try_set("MaxLength", json!(20), Convention),
            SetOutcome::Rejected
        );
        assert_eq!(annotations.value("MaxLength"), Some(&json!(50)));
    }

    #[test]
    fn test_annotation_idempotent_set() {
        let mut annotations = Annotations::default();
        annotations.try_set("Comment", json!("orders"), Convention);
        assert_eq!(
            annotations.try_set("Comment", json!("orders"), Explicit),
            SetOutcome::Unchanged
        );
        assert_eq!(annotations.get("Comment").map(|a| a.source), Some(Explicit));
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn test_annotation_remove() {
        let mut annotations = Annotations::default();
        annotations.try_set("Comment", json!("x"), DataAnnotation);
        assert_eq!(
            annotations.try_remove("Comment", Convention),
            SetOutcome::Rejected
        );
        assert_eq!(
            annotations.try_remove("Comment", Explicit),
            SetOutcome::Applied
        );
        assert!(annotations.is_empty());
    }
}
