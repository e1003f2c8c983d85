//! Delete behavior inferred from requiredness

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use ormforge_core::{ConfigurationSource, DeleteBehavior, ModelResult};

/// Required and ownership relationships cascade; optional ones null out the
/// dependent properties on the client
#[derive(Debug, Default)]
pub struct CascadeDelete;

impl Convention for CascadeDelete {
    fn name(&self) -> &'static str {
        "cascade_delete"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[
            EventKind::ForeignKeyAdded,
            EventKind::ForeignKeyRequirednessChanged,
            EventKind::ForeignKeyOwnershipChanged,
        ]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        let Some(fk) = event.foreign_key() else {
            return Ok(());
        };
        let Some(f) = builder.model().foreign_key(fk) else {
            return Ok(());
        };
        let behavior = if f.is_required() || f.is_ownership() {
            DeleteBehavior::Cascade
        } else {
            DeleteBehavior::ClientSetNull
        };
        builder.on_delete(fk, behavior, ConfigurationSource::Convention)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::ConventionSet;
    use crate::{BuilderConfig, RelationshipSpec};
    use ormforge_core::ConfigurationSource::Explicit;
    use ormforge_core::DataType;

    #[test]
    fn test_required_relationship_cascades() {
        let mut set = ConventionSet::new();
        set.add(CascadeDelete);
        let mut builder = ModelBuilder::with_conventions(BuilderConfig::default(), set);
        let blog = builder.entity("Blog", Explicit).unwrap().unwrap();
        builder
            .property(blog, "Id", Some(DataType::Int32), Explicit)
            .unwrap();
        builder.primary_key(blog, &["Id"], Explicit).unwrap();
        let post = builder.entity("Post", Explicit).unwrap().unwrap();
        let fk = builder
            .has_relationship(post, "Blog", RelationshipSpec::many_to_one(), Explicit)
            .unwrap()
            .unwrap();
        assert_eq!(
            builder.model().foreign_key(fk).unwrap().delete_behavior(),
            DeleteBehavior::ClientSetNull
        );

        builder.foreign_key_required(fk, true, Explicit).unwrap();
        assert_eq!(
            builder.model().foreign_key(fk).unwrap().delete_behavior(),
            DeleteBehavior::Cascade
        );

        builder.on_delete(fk, DeleteBehavior::Restrict, Explicit).unwrap();
        builder.foreign_key_required(fk, false, Explicit).unwrap();
        assert_eq!(
            builder.model().foreign_key(fk).unwrap().delete_behavior(),
            DeleteBehavior::Restrict
        );
    }
}
