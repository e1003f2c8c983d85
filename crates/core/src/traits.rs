//! Core traits for ormforge

use crate::error::ModelResult;

// ============================================================================
// Validatable Trait
// ============================================================================

/// Trait for types that can be validated
///
/// Types implementing this trait can check their internal consistency
/// and return an error if the state is invalid.
///
/// # Example
///
/// ```rust,ignore
/// use ormforge_core::{ModelError, ModelResult, Validatable};
///
/// struct Settings {
///     max_dispatches: usize,
/// }
///
/// impl Validatable for Settings {
///     fn validate(&self) -> ModelResult<()> {
///         if self.max_dispatches == 0 {
///             return Err(ModelError::invalid_configuration("max_dispatches must be positive"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validate the current state of the object
    ///
    /// Returns `Ok(())` if valid, or a `ModelError` describing the problem.
    fn validate(&self) -> ModelResult<()>;

    /// Check if the object is valid without returning error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Get all validation errors (for types that can have multiple errors)
    fn validation_errors(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => vec![],
            Err(e) => vec![e.to_string()],
        }
    }
}
