//! Convention batch scopes and handle tracking

use crate::ModelBuilder;
use crate::graph::Model;
use ormforge_core::{
    ComplexPropertyId, EntityTypeId, ForeignKeyId, IndexId, KeyId, ModelResult, PropertyId,
    SkipNavigationId,
};
use std::fmt::Display;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// A node identifier that can be checked against the graph
pub trait Handle: Copy + Display {
    /// Whether the node is still part of the model
    fn is_live(&self, model: &Model) -> bool;
}

macro_rules! impl_handle {
    ($($id:ty => $lookup:ident),* $(,)?) => {
        $(
            impl Handle for $id {
                fn is_live(&self, model: &Model) -> bool {
                    model.$lookup(*self).is_some()
                }
            }
        )*
    };
}

impl_handle! {
    EntityTypeId => entity_type,
    PropertyId => property,
    ComplexPropertyId => complex_property,
    KeyId => key,
    ForeignKeyId => foreign_key,
    SkipNavigationId => skip_navigation,
    IndexId => index,
}

// ============================================================================
// ConventionBatch
// ============================================================================

/// Guard over an open convention batch
///
/// Derefs to the builder, so every builder call works through it. Mutations
/// are visible right away; conventions run when the outermost batch closes,
/// either through [`run`](Self::run) or on drop. A drop cannot return the
/// drain error, so it is parked and reported by the next
/// [`finalize`](ModelBuilder::finalize).
pub struct ConventionBatch<'a> {
    builder: &'a mut ModelBuilder,
    closed: bool,
}

impl ConventionBatch<'_> {
    /// Close the batch and run the queued conventions
    pub fn run(mut self) -> ModelResult<()> {
        self.closed = true;
        self.builder.end_batch()
    }
}

impl Deref for ConventionBatch<'_> {
    type Target = ModelBuilder;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for ConventionBatch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for ConventionBatch<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.builder.end_batch() {
            warn!(error = %err, "Convention batch failed on drop");
            if self.builder.dispatcher.pending_error.is_none() {
                self.builder.dispatcher.pending_error = Some(err);
            }
        }
    }
}

impl ModelBuilder {
    /// Open a batch; conventions are deferred until it closes
    pub fn delay_conventions(&mut self) -> ConventionBatch<'_> {
        self.begin_batch();
        ConventionBatch {
            builder: self,
            closed: false,
        }
    }

    /// Run `f` inside a batch
    ///
    /// The batch is closed on every exit path. On error the queued
    /// conventions are discarded and the mutations already made stay.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> ModelResult<T>) -> ModelResult<T> {
        self.run_batch(f)
    }

    /// Run `f` inside a batch, re-validating `handle` when it closes
    ///
    /// A handle whose node was removed by a convention comes back as `None`;
    /// the caller re-queries by name instead of trusting a stale identifier.
    pub fn batch_tracking<H: Handle, T>(
        &mut self,
        handle: &mut Option<H>,
        f: impl FnOnce(&mut Self, &mut Option<H>) -> ModelResult<T>,
    ) -> ModelResult<T> {
        let result = self.run_batch(|b| f(b, handle));
        if let Some(h) = *handle {
            if !h.is_live(&self.model) {
                debug!(handle = %h, "Tracked handle removed by conventions");
                *handle = None;
            }
        }
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{
        Convention, ConventionContext, ConventionEvent, ConventionSet, EventKind,
    };
    use crate::{BuilderConfig, RelationshipSpec};
    use ormforge_core::ConfigurationSource::{self, Explicit};
    use ormforge_core::{DataType, ModelError};

    /// Removes every foreign key as soon as it appears
    struct DropForeignKeys;

    impl Convention for DropForeignKeys {
        fn name(&self) -> &'static str {
            "drop_foreign_keys"
        }

        fn handles(&self) -> &'static [EventKind] {
            &[EventKind::ForeignKeyAdded]
        }

        fn apply(
            &self,
            builder: &mut ModelBuilder,
            event: &ConventionEvent,
            _context: &mut ConventionContext,
        ) -> ModelResult<()> {
            if let ConventionEvent::ForeignKeyAdded { foreign_key } = event {
                builder.remove_foreign_key(*foreign_key, ConfigurationSource::Explicit)?;
            }
            Ok(())
        }
    }

    /// Fails on every new property
    struct Reject;

    impl Convention for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn handles(&self) -> &'static [EventKind] {
            &[EventKind::PropertyAdded]
        }

        fn apply(
            &self,
            _builder: &mut ModelBuilder,
            _event: &ConventionEvent,
            _context: &mut ConventionContext,
        ) -> ModelResult<()> {
            Err(ModelError::invalid_configuration("no properties allowed"))
        }
    }

    fn builder_with(convention: impl Convention + 'static) -> ModelBuilder {
        let mut set = ConventionSet::new();
        set.add(convention);
        ModelBuilder::with_conventions(BuilderConfig::default(), set)
    }

    #[test]
    fn test_tracked_handle_cleared_when_removed() {
        let mut builder = builder_with(DropForeignKeys);
        let order = builder.entity("Order", Explicit).unwrap().unwrap();

        let mut handle = None;
        builder
            .batch_tracking(&mut handle, |b, handle| {
                *handle = b.has_relationship(
                    order,
                    "Customer",
                    RelationshipSpec::many_to_one().with_navigation("Customer"),
                    Explicit,
                )?;
                // not dropped yet, conventions are deferred
                assert!(handle.is_some_and(|fk| fk.is_live(b.model())));
                Ok(())
            })
            .unwrap();
        assert_eq!(handle, None);
        assert_eq!(builder.model().foreign_keys().count(), 0);
    }

    #[test]
    fn test_tracked_handle_kept_when_live() {
        let mut builder = ModelBuilder::bare();
        let mut handle = None;
        builder
            .batch_tracking(&mut handle, |b, handle| {
                *handle = b.entity("Customer", Explicit)?;
                Ok(())
            })
            .unwrap();
        assert!(handle.is_some());
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let mut builder = ModelBuilder::bare();
        {
            let mut batch = builder.delay_conventions();
            assert!(batch.is_batching());
            batch.entity("Customer", Explicit).unwrap();
        }
        assert!(!builder.is_batching());
    }

    #[test]
    fn test_dropped_guard_parks_error() {
        let mut builder = builder_with(Reject);
        {
            let mut batch = builder.delay_conventions();
            let customer = batch.entity("Customer", Explicit).unwrap().unwrap();
            batch
                .property(customer, "Id", Some(DataType::Int32), Explicit)
                .unwrap();
        }
        assert!(!builder.is_batching());
        let err = builder.finalize().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_releases_depth() {
        let mut builder = ModelBuilder::bare();
        let result: ModelResult<()> = builder.batch(|b| {
            b.entity("Customer", Explicit)?;
            Err(ModelError::invalid_configuration("stop"))
        });
        assert!(result.is_err());
        assert!(!builder.is_batching());
        // the mutation made before the error stays
        assert!(builder.model().find_entity_type("Customer").is_some());
    }
}
