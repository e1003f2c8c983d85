//! Error types for ormforge
//!
//! Precedence conflicts are never errors: a write that loses to a stronger
//! configuration source is reported through the `Option`/`bool` return of the
//! mutation. Everything here is fatal and aborts model building.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ormforge
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Structural Invariant Errors
    // ========================================================================
    /// Dependent property count differs from the principal key
    #[error(
        "Foreign key from '{dependent}' to '{principal}' has {dependent_count} properties but the principal key has {principal_count}"
    )]
    ForeignKeyCountMismatch {
        dependent: String,
        principal: String,
        dependent_count: usize,
        principal_count: usize,
    },

    /// Dependent property type incompatible with the principal key property
    #[error(
        "Foreign key property '{dependent}.{property}' ({property_type}) is incompatible with principal key property '{principal}.{principal_property}' ({principal_type})"
    )]
    ForeignKeyTypeMismatch {
        dependent: String,
        property: String,
        property_type: String,
        principal: String,
        principal_property: String,
        principal_type: String,
    },

    /// An explicit primary key already exists with different properties
    #[error(
        "Entity type '{entity_type}' already has explicit primary key ({existing}); cannot reconfigure it as ({requested})"
    )]
    ConflictingPrimaryKey {
        entity_type: String,
        existing: String,
        requested: String,
    },

    /// A named index already exists with different properties
    #[error(
        "Index '{name}' on '{entity_type}' is already defined over ({existing}); cannot redefine it over ({requested})"
    )]
    DuplicateIndex {
        entity_type: String,
        name: String,
        existing: String,
        requested: String,
    },

    /// Invalid base type configuration
    #[error("Cannot set base type of '{entity_type}' to '{base_type}': {message}")]
    InvalidBaseType {
        entity_type: String,
        base_type: String,
        message: String,
    },

    /// An owned entity type is used as principal outside its ownership
    #[error(
        "Owned entity type '{owned_type}' cannot be the principal of a relationship with '{dependent}'"
    )]
    OwnedTypeAsPrincipal {
        owned_type: String,
        dependent: String,
    },

    /// Ownership conflicts with existing configuration
    #[error("Ownership conflict for '{entity_type}': {message}")]
    OwnershipConflict {
        entity_type: String,
        message: String,
    },

    /// A navigation name cannot be used
    #[error("Navigation '{entity_type}.{navigation}' cannot be configured: {message}")]
    NavigationConflict {
        entity_type: String,
        navigation: String,
        message: String,
    },

    /// A key property was made nullable
    #[error("Property '{entity_type}.{property}' is part of a key and cannot be nullable")]
    NullableKeyProperty {
        entity_type: String,
        property: String,
    },

    /// An entity type has no primary key
    #[error("Entity type '{0}' requires a primary key")]
    MissingPrimaryKey(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========================================================================
    // Ambiguity Errors
    // ========================================================================
    /// Several inverse candidates and no way to pick one
    #[error(
        "Navigation '{entity_type}.{navigation}' is ambiguous between inverse candidates [{}]; configure the relationship explicitly",
        .candidates.join(", ")
    )]
    AmbiguousNavigation {
        entity_type: String,
        navigation: String,
        candidates: Vec<String>,
    },

    // ========================================================================
    // Not Found Errors
    // ========================================================================
    /// Entity type not found
    #[error("Entity type not found: {0}")]
    EntityTypeNotFound(String),

    /// Property not found
    #[error("Property '{property}' not found in entity type '{entity_type}'")]
    PropertyNotFound {
        entity_type: String,
        property: String,
    },

    /// Type shape not registered
    #[error("Type shape not registered: {0}")]
    ShapeNotFound(String),

    /// Metadata node was removed or never existed
    #[error("Metadata node not found: {0}")]
    NodeNotFound(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// A convention re-triggered an event without making progress
    #[error("Convention '{convention}' re-triggered '{event}' without making progress")]
    ConventionCycle { convention: String, event: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Unsupported definition file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl ModelError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        ModelError::InvalidConfiguration(msg.into())
    }

    /// Create a property not found error
    pub fn property_not_found(entity_type: impl Into<String>, property: impl Into<String>) -> Self {
        ModelError::PropertyNotFound {
            entity_type: entity_type.into(),
            property: property.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(node: impl ToString) -> Self {
        ModelError::NodeNotFound(node.to_string())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        ModelError::Internal(msg.into())
    }

    /// Create an error with context
    pub fn with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        ModelError::WithContext {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if the user must fix the model configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModelError::ForeignKeyCountMismatch { .. }
                | ModelError::ForeignKeyTypeMismatch { .. }
                | ModelError::ConflictingPrimaryKey { .. }
                | ModelError::DuplicateIndex { .. }
                | ModelError::InvalidBaseType { .. }
                | ModelError::OwnedTypeAsPrincipal { .. }
                | ModelError::OwnershipConflict { .. }
                | ModelError::NavigationConflict { .. }
                | ModelError::NullableKeyProperty { .. }
                | ModelError::MissingPrimaryKey(_)
                | ModelError::InvalidConfiguration(_)
                | ModelError::AmbiguousNavigation { .. }
        )
    }

    /// Check if this error signals an engine or extension bug
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ModelError::ConventionCycle { .. } | ModelError::Internal(_)
        )
    }

    /// Check if this error is an ambiguous resolution
    pub fn is_ambiguity(&self) -> bool {
        matches!(self, ModelError::AmbiguousNavigation { .. })
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ModelError::EntityTypeNotFound(_)
                | ModelError::PropertyNotFound { .. }
                | ModelError::ShapeNotFound(_)
                | ModelError::NodeNotFound(_)
        )
    }

    /// Check if this error is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, ModelError::Io(_) | ModelError::FileRead { .. })
    }
}

/// Result type alias using ModelError
pub type ModelResult<T> = Result<T, ModelError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> ModelResult<T>;
}

impl<T, E: Into<ModelError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> ModelResult<T> {
        self.map_err(|e| {
            let err: ModelError = e.into();
            ModelError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_error() {
        let err = ModelError::invalid_configuration("navigation name is required");
        assert!(err.is_configuration());
        assert!(!err.is_internal());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: navigation name is required"
        );
    }

    #[test]
    fn test_conflicting_primary_key_error() {
        let err = ModelError::ConflictingPrimaryKey {
            entity_type: "Customer".to_string(),
            existing: "Id".to_string(),
            requested: "Code".to_string(),
        };
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Entity type 'Customer' already has explicit primary key (Id); cannot reconfigure it as (Code)"
        );
    }

    #[test]
    fn test_ambiguous_navigation_error() {
        let err = ModelError::AmbiguousNavigation {
            entity_type: "Airport".to_string(),
            navigation: "Departures".to_string(),
            candidates: vec!["Origin".to_string(), "Destination".to_string()],
        };
        assert!(err.is_ambiguity());
        assert!(err.is_configuration());
        assert!(err.to_string().contains("[Origin, Destination]"));
    }

    #[test]
    fn test_convention_cycle_is_internal() {
        let err = ModelError::ConventionCycle {
            convention: "Flip".to_string(),
            event: "ForeignKeyUniquenessChanged(ForeignKey#3)".to_string(),
        };
        assert!(err.is_internal());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_not_found_errors() {
        let err = ModelError::property_not_found("Order", "Total");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Property 'Total' not found in entity type 'Order'"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = ModelError::with_context("Loading definition", "unexpected end of file");
        assert_eq!(err.to_string(), "Loading definition: unexpected end of file");
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.with_context("Reading model.toml").unwrap_err();
        assert!(err.to_string().starts_with("Reading model.toml: IO error"));
    }

    #[test]
    fn test_io_error_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ModelError = io_err.into();
        assert!(err.is_io());
    }
}
