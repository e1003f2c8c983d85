//! Configuration source ledger
//!
//! Every settable attribute of the metadata graph is stored as a [`Sourced`]
//! value remembering the rank of the write that produced it. A write is
//! accepted when its rank is at least the recorded one, or when it carries
//! the value already stored (which may only raise the recorded rank).

use ormforge_core::ConfigurationSource;
use serde::{Deserialize, Serialize};

// ============================================================================
// SetOutcome
// ============================================================================

/// Result of a ledger write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value changed
    Applied,
    /// The value was already stored; only the rank may have been raised
    Unchanged,
    /// A stronger source owns the attribute
    Rejected,
}

impl SetOutcome {
    /// Whether the stored value changed
    pub fn is_applied(self) -> bool {
        matches!(self, SetOutcome::Applied)
    }

    /// Whether the write was accepted (changed or idempotent)
    pub fn is_accepted(self) -> bool {
        !matches!(self, SetOutcome::Rejected)
    }
}

// ============================================================================
// Sourced
// ============================================================================

/// A value tagged with the configuration source that set it
///
/// A `None` source means the value is a default nobody configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sourced<T> {
    value: T,
    source: Option<ConfigurationSource>,
}

impl<T> Sourced<T> {
    /// Create an unconfigured value
    pub fn new(value: T) -> Self {
        Self {
            value,
            source: None,
        }
    }

    /// Create a value set at the given rank
    pub fn with_source(value: T, source: ConfigurationSource) -> Self {
        Self {
            value,
            source: Some(source),
        }
    }

    /// Get the stored value
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Get the rank of the write that set the value
    pub fn source(&self) -> Option<ConfigurationSource> {
        self.source
    }

    /// Raise the recorded rank without touching the value
    pub(crate) fn raise_source(&mut self, source: ConfigurationSource) {
        self.source = Some(source.max_with(self.source));
    }

    /// Overwrite value and rank unconditionally
    pub(crate) fn force(&mut self, value: T, source: Option<ConfigurationSource>) {
        self.value = value;
        self.source = source;
    }
}

impl<T: Copy> Sourced<T> {
    /// Get a copy of the stored value
    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: PartialEq> Sourced<T> {
    /// Whether `try_set(value, source)` would be accepted
    pub fn can_set(&self, value: &T, source: ConfigurationSource) -> bool {
        self.value == *value || source.overrides(self.source)
    }

    /// Write a value following precedence
    pub fn try_set(&mut self, value: T, source: ConfigurationSource) -> SetOutcome {
        if self.value == value {
            self.raise_source(source);
            SetOutcome::Unchanged
        } else if source.overrides(self.source) {
            self.value = value;
            self.source = Some(source);
            SetOutcome::Applied
        } else {
            tracing::trace!(
                requested = %source,
                recorded = ?self.source,
                "Write rejected by configuration source"
            );
            SetOutcome::Rejected
        }
    }

    /// Restore the unconfigured default following precedence
    ///
    /// A removal at a weaker rank cannot undo a stronger configuration.
    pub fn try_reset(&mut self, default: T, source: ConfigurationSource) -> SetOutcome {
        if !source.overrides(self.source) {
            return SetOutcome::Rejected;
        }
        let changed = self.value != default;
        self.value = default;
        self.source = None;
        if changed {
            SetOutcome::Applied
        } else {
            SetOutcome::Unchanged
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ormforge_core::ConfigurationSource::*;

    #[test]
    fn test_unconfigured_value_accepts_any_rank() {
        let mut value = Sourced::new(false);
        assert_eq!(value.try_set(true, Convention), SetOutcome::Applied);
        assert_eq!(value.source(), Some(Convention));
    }

    #[test]
    fn test_precedence_monotonicity() {
        let mut value = Sourced::with_source("Explicit".to_string(), Explicit);

        assert_eq!(
            value.try_set("Convention".to_string(), Convention),
            SetOutcome::Rejected
        );
        assert_eq!(value.get(), "Explicit");
        assert_eq!(value.source(), Some(Explicit));

        assert_eq!(
            value.try_set("Again".to_string(), Explicit),
            SetOutcome::Applied
        );
        assert_eq!(value.get(), "Again");
    }

    #[test]
    fn test_equal_value_raises_rank() {
        let mut value = Sourced::with_source(3, Convention);
        assert_eq!(value.try_set(3, Explicit), SetOutcome::Unchanged);
        assert_eq!(value.source(), Some(Explicit));

        // an idempotent weaker write never lowers the rank
        assert_eq!(value.try_set(3, Convention), SetOutcome::Unchanged);
        assert_eq!(value.source(), Some(Explicit));
    }

    #[test]
    fn test_reset_follows_precedence() {
        let mut value = Sourced::with_source(Some(5), DataAnnotation);
        assert_eq!(value.try_reset(None, Convention), SetOutcome::Rejected);
        assert_eq!(value.value(), Some(5));

        assert_eq!(value.try_reset(None, Explicit), SetOutcome::Applied);
        assert_eq!(value.value(), None);
        assert_eq!(value.source(), None);
    }

    #[test]
    fn test_can_set() {
        let value = Sourced::with_source(1, DataAnnotation);
        assert!(value.can_set(&1, Convention));
        assert!(!value.can_set(&2, Convention));
        assert!(value.can_set(&2, DataAnnotation));
    }
}
