//! Validation rules run when a model is finalized
//!
//! Each rule inspects the settled graph and reports structural problems the
//! builder could not reject at configuration time, such as a root entity
//! type that never got a primary key or a navigation whose inverse stayed
//! ambiguous.

use crate::conventions::AMBIGUOUS_NAVIGATIONS_ANNOTATION;
use crate::graph::Model;
use crate::naming::{PROPERTY_BAG_TYPE, TEMPORARY_KEY_NAME};
use ormforge_core::{ModelError, ModelResult};
use serde_json::Value;

// ============================================================================
// ValidationResult
// ============================================================================

/// Result of a validation run
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub valid: bool,

    /// Errors, in rule order
    pub errors: Vec<ValidationError>,

    /// Non-fatal issues
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// Add a warning to the result
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// The first error, if any, as a [`ModelError`]
    pub fn into_result(self) -> ModelResult<()> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.error),
            None => Ok(()),
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

// ============================================================================
// ValidationError
// ============================================================================

/// A validation error
#[derive(Debug)]
pub struct ValidationError {
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,

    /// Path to the problematic node (e.g., "Order.Customer")
    pub path: Option<String>,

    /// The error `finalize` returns for it
    pub error: ModelError,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, error: ModelError) -> Self {
        Self {
            code,
            path: None,
            error,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] {}", path, self.error)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

/// Error codes for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    MissingPrimaryKey,
    ForeignKeyCountMismatch,
    ForeignKeyTypeMismatch,
    OwnedTypeAsPrincipal,
    OwnershipConflict,
    AmbiguousNavigation,
}

// ============================================================================
// ValidationWarning
// ============================================================================

/// A validation warning (non-fatal issue)
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub code: ValidationWarningCode,
    pub message: String,
    pub path: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: ValidationWarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] Warning: {}", path, self.message)
        } else {
            write!(f, "Warning: {}", self.message)
        }
    }
}

/// Warning codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationWarningCode {
    /// A relationship still targets a temporary principal key
    TemporaryPrincipalKey,
    /// A shadow property nothing references
    UnusedShadowProperty,
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// A check run against a settled model
pub trait ValidationRule {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn validate(&self, model: &Model) -> ValidationResult;
}

// ============================================================================
// Validator
// ============================================================================

/// Runs validation rules in registration order
#[derive(Default)]
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a validator with the built-in rules
    pub fn with_default_rules() -> Self {
        let mut validator = Self::new();
        validator.add_rule(Box::new(PrimaryKeyRule));
        validator.add_rule(Box::new(ForeignKeyShapeRule));
        validator.add_rule(Box::new(OwnershipRule));
        validator.add_rule(Box::new(AmbiguousNavigationRule));
        validator.add_rule(Box::new(ShadowPropertyRule));
        validator
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for rule in &self.rules {
            result.merge(rule.validate(model));
        }
        result
    }

    /// Validate and return the first error
    pub fn validate_result(&self, model: &Model) -> ModelResult<()> {
        self.validate(model).into_result()
    }
}

// ============================================================================
// Built-in Validation Rules
// ============================================================================

/// Rule: root entity types have a primary key
pub struct PrimaryKeyRule;

impl ValidationRule for PrimaryKeyRule {
    fn name(&self) -> &'static str {
        "primary_keys"
    }

    fn description(&self) -> &'static str {
        "Validates that every root entity type has a primary key"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for entity in model.entity_types() {
            if entity.base_type().is_some() || model.primary_key(entity.id()).is_some() {
                continue;
            }
            result.add_error(
                ValidationError::new(
                    ValidationErrorCode::MissingPrimaryKey,
                    ModelError::MissingPrimaryKey(entity.name().to_string()),
                )
                .with_path(entity.name()),
            );
        }
        result
    }
}

/// Rule: dependent properties line up with the principal key
pub struct ForeignKeyShapeRule;

impl ValidationRule for ForeignKeyShapeRule {
    fn name(&self) -> &'static str {
        "foreign_key_shape"
    }

    fn description(&self) -> &'static str {
        "Validates foreign key property count and types against the principal key"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for fk in model.foreign_keys() {
            let (Some(dependent), Some(principal), Some(key)) = (
                model.entity_type(fk.dependent()),
                model.entity_type(fk.principal()),
                model.key(fk.principal_key()),
            ) else {
                continue;
            };
            let path = format!("{}->{}", dependent.name(), principal.name());

            if fk.properties().len() != key.properties().len() {
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::ForeignKeyCountMismatch,
                        ModelError::ForeignKeyCountMismatch {
                            dependent: dependent.name().to_string(),
                            principal: principal.name().to_string(),
                            dependent_count: fk.properties().len(),
                            principal_count: key.properties().len(),
                        },
                    )
                    .with_path(path),
                );
                continue;
            }
            for (d, p) in fk.properties().iter().zip(key.properties()) {
                let (Some(d), Some(p)) = (model.property(*d), model.property(*p)) else {
                    continue;
                };
                if d.data_type().is_compatible_with(p.data_type()) {
                    continue;
                }
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::ForeignKeyTypeMismatch,
                        ModelError::ForeignKeyTypeMismatch {
                            dependent: dependent.name().to_string(),
                            property: d.name().to_string(),
                            property_type: d.data_type().keyword(),
                            principal: principal.name().to_string(),
                            principal_property: p.name().to_string(),
                            principal_type: p.data_type().keyword(),
                        },
                    )
                    .with_path(path.clone()),
                );
            }
        }
        result
    }
}

/// Rule: owned types have one owner and are never principals elsewhere
pub struct OwnershipRule;

impl ValidationRule for OwnershipRule {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn description(&self) -> &'static str {
        "Validates that owned entity types have a single owner and no other dependents"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for entity in model.entity_types() {
            let owners = model
                .foreign_keys_of(entity.id())
                .into_iter()
                .filter(|fk| fk.is_ownership())
                .count();
            if owners > 1 {
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::OwnershipConflict,
                        ModelError::OwnershipConflict {
                            entity_type: entity.name().to_string(),
                            message: format!("owned by {} navigations", owners),
                        },
                    )
                    .with_path(entity.name()),
                );
            }
        }
        for fk in model.foreign_keys() {
            if fk.is_ownership() || !model.is_owned(fk.principal()) {
                continue;
            }
            let (Some(owned), Some(dependent)) = (
                model.entity_type(fk.principal()),
                model.entity_type(fk.dependent()),
            ) else {
                continue;
            };
            result.add_error(
                ValidationError::new(
                    ValidationErrorCode::OwnedTypeAsPrincipal,
                    ModelError::OwnedTypeAsPrincipal {
                        owned_type: owned.name().to_string(),
                        dependent: dependent.name().to_string(),
                    },
                )
                .with_path(owned.name()),
            );
        }
        result
    }
}

/// Rule: navigations recorded as ambiguous were configured some other way
pub struct AmbiguousNavigationRule;

impl ValidationRule for AmbiguousNavigationRule {
    fn name(&self) -> &'static str {
        "ambiguous_navigations"
    }

    fn description(&self) -> &'static str {
        "Validates that every navigation with several inverse candidates was resolved"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for entity in model.entity_types() {
            let Some(Value::Object(recorded)) =
                entity.annotations().value(AMBIGUOUS_NAVIGATIONS_ANNOTATION)
            else {
                continue;
            };
            for (navigation, candidates) in recorded {
                if model.is_member_name_taken(entity.id(), navigation) {
                    continue;
                }
                let candidates = candidates
                    .as_array()
                    .map(|c| {
                        c.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::AmbiguousNavigation,
                        ModelError::AmbiguousNavigation {
                            entity_type: entity.name().to_string(),
                            navigation: navigation.clone(),
                            candidates,
                        },
                    )
                    .with_path(format!("{}.{}", entity.name(), navigation)),
                );
            }
        }
        result
    }
}

/// Rule: warn about leftover convention artifacts
pub struct ShadowPropertyRule;

impl ValidationRule for ShadowPropertyRule {
    fn name(&self) -> &'static str {
        "shadow_properties"
    }

    fn description(&self) -> &'static str {
        "Warns about temporary principal keys and unreferenced shadow properties"
    }

    fn validate(&self, model: &Model) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for entity in model.entity_types() {
            if entity.type_name() == PROPERTY_BAG_TYPE {
                continue;
            }
            for property in model.properties_of(entity.id()) {
                if !property.is_shadow() {
                    continue;
                }
                let path = format!("{}.{}", entity.name(), property.name());
                let in_key = model
                    .keys_of(entity.id())
                    .iter()
                    .any(|k| k.properties().contains(&property.id()));
                if in_key && property.name().starts_with(TEMPORARY_KEY_NAME) {
                    result.add_warning(
                        ValidationWarning::new(
                            ValidationWarningCode::TemporaryPrincipalKey,
                            format!(
                                "'{}' has no primary key; relationships use a temporary key",
                                entity.name()
                            ),
                        )
                        .with_path(path),
                    );
                } else if !in_key && model.foreign_keys_using(property.id()).is_empty() {
                    result.add_warning(
                        ValidationWarning::new(
                            ValidationWarningCode::UnusedShadowProperty,
                            format!("shadow property '{}' is not used", property.name()),
                        )
                        .with_path(path),
                    );
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelBuilder;
    use crate::graph::AnnotatableId;
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::DataType;
    use serde_json::json;

    #[test]
    fn test_missing_primary_key() {
        let mut builder = ModelBuilder::bare();
        builder.entity("Blog", Explicit).unwrap();
        let result = builder.validate();
        assert!(!result.valid);
        assert_eq!(result.errors[0].code, ValidationErrorCode::MissingPrimaryKey);
        assert_eq!(result.errors[0].path.as_deref(), Some("Blog"));
        assert!(matches!(
            result.into_result(),
            Err(ModelError::MissingPrimaryKey(name)) if name == "Blog"
        ));
    }

    #[test]
    fn test_unresolved_ambiguity_reported() {
        let mut builder = ModelBuilder::bare();
        let person = builder.entity("Person", Explicit).unwrap().unwrap();
        builder
            .property(person, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(person, &["Id"], Explicit).unwrap();
        builder
            .has_annotation(
                AnnotatableId::EntityType(person),
                AMBIGUOUS_NAVIGATIONS_ANNOTATION,
                json!({ "Authored": ["Author", "Editor"] }),
                Explicit,
            )
            .unwrap();

        let result = builder.validate();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ValidationErrorCode::AmbiguousNavigation);
        assert_eq!(
            result.errors[0].to_string(),
            "[Person.Authored] Navigation 'Person.Authored' is ambiguous between inverse candidates [Author, Editor]; configure the relationship explicitly"
        );

        // ignoring the member resolves it
        builder.ignore(person, "Authored", Explicit).unwrap();
        assert!(builder.validate().valid);
    }

    #[test]
    fn test_temporary_key_warning() {
        let mut builder = ModelBuilder::bare();
        let order = builder.entity("Order", Explicit).unwrap().unwrap();
        builder
            .property(order, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(order, &["Id"], Explicit).unwrap();
        builder
            .has_relationship(order, "Customer", crate::RelationshipSpec::many_to_one(), Explicit)
            .unwrap();

        let result = builder.validate();
        assert!(result.has_warnings());
        assert_eq!(result.warnings[0].code, ValidationWarningCode::TemporaryPrincipalKey);
        // the principal still has no primary key
        assert_eq!(result.errors[0].path.as_deref(), Some("Customer"));
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(
            Validator::with_default_rules().rule_names(),
            vec![
                "primary_keys",
                "foreign_key_shape",
                "ownership",
                "ambiguous_navigations",
                "shadow_properties"
            ]
        );
    }
}
