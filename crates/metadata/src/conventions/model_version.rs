//! Stamps the finalized model with the library version

use crate::ModelBuilder;
use crate::conventions::{Convention, ConventionContext, ConventionEvent, EventKind};
use crate::graph::AnnotatableId;
use ormforge_core::{ConfigurationSource, ModelResult};
use serde_json::Value;

/// Model annotation holding the version of the library that built it
pub const PRODUCT_VERSION_ANNOTATION: &str = "ormforge:ProductVersion";

#[derive(Debug, Default)]
pub struct ModelVersion;

impl Convention for ModelVersion {
    fn name(&self) -> &'static str {
        "model_version"
    }

    fn handles(&self) -> &'static [EventKind] {
        &[EventKind::ModelFinalizing]
    }

    fn apply(
        &self,
        builder: &mut ModelBuilder,
        _event: &ConventionEvent,
        _context: &mut ConventionContext,
    ) -> ModelResult<()> {
        builder.has_annotation(
            AnnotatableId::Model,
            PRODUCT_VERSION_ANNOTATION,
            Value::String(crate::VERSION.to_string()),
            ConfigurationSource::Convention,
        )?;
        Ok(())
    }
}
