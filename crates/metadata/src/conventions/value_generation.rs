//! Store-generated key values

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use ormforge_core::{ConfigurationSource, EntityTypeId, ModelResult, PropertyId, ValueGenerated};

/// Single-property integer or uuid primary keys that are not foreign keys
/// get their values generated on add
#[derive(Debug, Default)]
pub struct ValueGeneration;

impl ValueGeneration {
    fn update(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let model = builder.model();
        let key_properties = model
            .primary_key(entity)
            .map(|k| k.properties().to_vec())
            .unwrap_or_default();
        // properties this convention generated that left the key
        let mut changes: Vec<(PropertyId, ValueGenerated)> = model
            .properties_of(entity)
            .into_iter()
            .filter(|p| {
                p.value_generated() == ValueGenerated::OnAdd
                    && p.value_generated_source() == Some(ConfigurationSource::Convention)
                    && !key_properties.contains(&p.id())
            })
            .map(|p| (p.id(), ValueGenerated::Never))
            .collect();

        let generated = match key_properties.as_slice() {
            [single] => model.property(*single).is_some_and(|p| {
                p.data_type().supports_value_generation()
                    && model.foreign_keys_using(*single).is_empty()
            }),
            _ => false,
        };
        for property in key_properties {
            let value = if generated {
                ValueGenerated::OnAdd
            } else {
                ValueGenerated::Never
            };
            changes.push((property, value));
        }

        for (property, value) in changes {
            builder.value_generated(property, value, ConfigurationSource::Convention)?;
        }
        Ok(())
    }
}

impl Convention for ValueGeneration {
    fn name(&self) -> &'static str {
        "value_generation"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::PrimaryKeyChanged,
            EventKind::ForeignKeyAdded,
            EventKind::ForeignKeyPropertiesChanged,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        match event {
            ConventionEvent::PrimaryKeyChanged { entity_type, .. } => {
                Self::update(builder, *entity_type)
            }
            other => {
                let dependent = other
                    .foreign_key()
                    .and_then(|fk| builder.model().foreign_key(fk))
                    .map(|fk| fk.dependent());
                match dependent {
                    Some(dependent) => {
                        let root = builder.model().root_of(dependent);
                        Self::update(builder, root)
                    }
                    None => Ok(()),
                }
            }
        }
    }
}
