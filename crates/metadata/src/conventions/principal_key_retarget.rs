//! Keeps inferred principal keys on the primary key

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use ormforge_core::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, KeyId, ModelResult, PropertyId,
};
use tracing::debug;

/// When a primary key changes, foreign keys whose principal key was never
/// configured move to it; convention alternate keys left without
/// references are removed with their shadow properties
#[derive(Debug, Default)]
pub struct PrincipalKeyRetarget;

impl PrincipalKeyRetarget {
    fn retarget(builder: &mut ModelBuilder, entity: EntityTypeId) -> ModelResult<()> {
        let model = builder.model();
        let Some(primary) = model.primary_key(entity).map(|k| k.id()) else {
            return Ok(());
        };
        let foreign_keys: Vec<ForeignKeyId> = model
            .foreign_keys()
            .filter(|fk| {
                model.root_of(fk.principal()) == entity
                    && fk.principal_key_source().is_none()
                    && fk.principal_key() != primary
            })
            .map(|fk| fk.id())
            .collect();
        for fk in foreign_keys {
            debug!(foreign_key = %fk, key = %primary, "Principal key retargeted");
            builder.retarget_principal_key(fk, primary)?;
        }

        let model = builder.model();
        let stale: Vec<(KeyId, Vec<PropertyId>)> = model
            .keys_of(entity)
            .into_iter()
            .filter(|k| {
                k.id() != primary
                    && k.source() == ConfigurationSource::Convention
                    && !model.is_key_referenced(k.id())
            })
            .map(|k| (k.id(), k.properties().to_vec()))
            .collect();
        for (key, properties) in stale {
            builder.remove_key_node(key)?;
            builder.discard_shadow_properties(&properties)?;
        }
        Ok(())
    }
}

impl Convention for PrincipalKeyRetarget {
    fn name(&self) -> &'static str {
        "principal_key_retarget"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::PrimaryKeyChanged]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        match event {
            ConventionEvent::PrimaryKeyChanged { entity_type, .. } => {
                Self::retarget(builder, *entity_type)
            }
            _ => Ok(()),
        }
    }
}
