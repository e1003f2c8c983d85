//! Builder configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! max_dispatches = 5000
//! key_name_patterns = ["Id", "{type}Id", "Key"]
//! owned_collection_key = "Id"
//!
//! [conventions]
//! foreign_key_index = false
//! ```

use ormforge_core::{ModelError, ModelResult, Validatable};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// BuilderConfig
// ============================================================================

/// Options controlling the model builder and its default conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Upper bound on convention dispatches in one drain
    pub max_dispatches: usize,

    /// Primary key name candidates; `{type}` expands to the entity type name
    pub key_name_patterns: Vec<String>,

    /// Name of the synthetic key property of owned collection types
    pub owned_collection_key: String,

    /// Which default conventions are registered
    pub conventions: ConventionToggles,
}

impl BuilderConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        let config: BuilderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the dispatch bound
    pub fn with_max_dispatches(mut self, max_dispatches: usize) -> Self {
        self.max_dispatches = max_dispatches;
        self
    }

    /// Replace the key name patterns
    pub fn with_key_name_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_name_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Candidate key names for an entity type, in preference order
    pub fn key_names_for(&self, type_name: &str) -> Vec<String> {
        self.key_name_patterns
            .iter()
            .map(|pattern| pattern.replace("{type}", type_name))
            .collect()
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_dispatches: 10_000,
            key_name_patterns: vec!["Id".to_string(), "{type}Id".to_string()],
            owned_collection_key: "Id".to_string(),
            conventions: ConventionToggles::default(),
        }
    }
}

impl Validatable for BuilderConfig {
    fn validate(&self) -> ModelResult<()> {
        if self.max_dispatches == 0 {
            return Err(ModelError::invalid_configuration(
                "max_dispatches must be positive",
            ));
        }
        if self.key_name_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ModelError::invalid_configuration(
                "key_name_patterns cannot contain empty patterns",
            ));
        }
        if self.owned_collection_key.trim().is_empty() {
            return Err(ModelError::invalid_configuration(
                "owned_collection_key cannot be empty",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ConventionToggles
// ============================================================================

/// One switch per default convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionToggles {
    pub property_discovery: bool,
    pub data_annotations: bool,
    pub key_discovery: bool,
    pub value_generation: bool,
    pub relationship_discovery: bool,
    pub foreign_key_property_discovery: bool,
    pub principal_key_retarget: bool,
    pub foreign_key_requiredness: bool,
    pub cascade_delete: bool,
    pub foreign_key_deduplication: bool,
    pub foreign_key_index: bool,
    pub model_version: bool,
}

impl ConventionToggles {
    /// All conventions disabled
    pub fn none() -> Self {
        Self {
            property_discovery: false,
            data_annotations: false,
            key_discovery: false,
            value_generation: false,
            relationship_discovery: false,
            foreign_key_property_discovery: false,
            principal_key_retarget: false,
            foreign_key_requiredness: false,
            cascade_delete: false,
            foreign_key_deduplication: false,
            foreign_key_index: false,
            model_version: false,
        }
    }

    /// Whether the convention with this name is enabled
    ///
    /// Unknown names are enabled; they are not default conventions.
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            "property_discovery" => self.property_discovery,
            "data_annotations" => self.data_annotations,
            "key_discovery" => self.key_discovery,
            "value_generation" => self.value_generation,
            "relationship_discovery" => self.relationship_discovery,
            "foreign_key_property_discovery" => self.foreign_key_property_discovery,
            "principal_key_retarget" => self.principal_key_retarget,
            "foreign_key_requiredness" => self.foreign_key_requiredness,
            "cascade_delete" => self.cascade_delete,
            "foreign_key_deduplication" => self.foreign_key_deduplication,
            "foreign_key_index" => self.foreign_key_index,
            "model_version" => self.model_version,
            _ => true,
        }
    }
}

impl Default for ConventionToggles {
    fn default() -> Self {
        Self {
            property_discovery: true,
            data_annotations: true,
            key_discovery: true,
            value_generation: true,
            relationship_discovery: true,
            foreign_key_property_discovery: true,
            principal_key_retarget: true,
            foreign_key_requiredness: true,
            cascade_delete: true,
            foreign_key_deduplication: true,
            foreign_key_index: true,
            model_version: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.max_dispatches, 10_000);
        assert_eq!(config.key_names_for("Order"), vec!["Id", "OrderId"]);
        assert!(config.conventions.is_enabled("key_discovery"));
        assert!(config.is_valid());
    }

    #[test]
    fn test_partial_toml() {
        let config = BuilderConfig::from_toml_str(
            r#"
            max_dispatches = 50

            [conventions]
            foreign_key_index = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_dispatches, 50);
        assert_eq!(config.owned_collection_key, "Id");
        assert!(!config.conventions.is_enabled("foreign_key_index"));
        assert!(config.conventions.is_enabled("cascade_delete"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = BuilderConfig::from_toml_str("max_dispatches = 0").unwrap_err();
        assert!(err.is_configuration());

        let err = BuilderConfig::from_toml_str("max_dispatches = \"many\"").unwrap_err();
        assert!(matches!(err, ModelError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "key_name_patterns = [\"Key\"]").unwrap();

        let config = BuilderConfig::load(file.path()).unwrap();
        assert_eq!(config.key_names_for("Order"), vec!["Key"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = BuilderConfig::load("/nonexistent/ormforge.toml").unwrap_err();
        assert!(err.is_io());
    }
}
