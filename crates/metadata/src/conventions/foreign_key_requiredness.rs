//! Requiredness inferred from dependent properties

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use ormforge_core::{ForeignKeyId, ModelResult};

/// A foreign key is required when none of its properties is nullable
#[derive(Debug, Default)]
pub struct ForeignKeyRequiredness;

impl Convention for ForeignKeyRequiredness {
    fn name(&self) -> &'static str {
        "foreign_key_requiredness"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::PropertyNullabilityChanged,
            EventKind::ForeignKeyPropertiesChanged,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        let foreign_keys: Vec<ForeignKeyId> = match event {
            ConventionEvent::PropertyNullabilityChanged { property } => builder
                .model()
                .foreign_keys_using(*property)
                .iter()
                .map(|fk| fk.id())
                .collect(),
            other => other.foreign_key().into_iter().collect(),
        };
        for fk in foreign_keys {
            builder.set_foreign_key_required_from_properties(fk);
        }
        Ok(())
    }
}
