//! Command implementations

use crate::OutputFormat;
use anyhow::{Context, bail};
use colored::Colorize;
use ormforge_core::{ModelError, ValueGenerated};
use ormforge_metadata::snapshot::EntityTypeSnapshot;
use ormforge_metadata::{
    BuilderConfig, ConventionSet, Model, ModelBuilder, ModelDefinition, ModelSnapshot,
};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

fn load_config(path: Option<&Path>) -> anyhow::Result<BuilderConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading builder config");
            BuilderConfig::load(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))
        }
        None => Ok(BuilderConfig::default()),
    }
}

fn load_builder(definition: &Path, config: Option<&Path>) -> anyhow::Result<ModelBuilder> {
    let config = load_config(config)?;
    let definition = ModelDefinition::load(definition)?;
    let mut builder = ModelBuilder::with_config(config);
    definition.apply(&mut builder).map_err(explain)?;
    Ok(builder)
}

/// Attach a hint to errors the user fixes by configuring more explicitly
fn explain(err: ModelError) -> anyhow::Error {
    if err.is_ambiguity() {
        anyhow::Error::new(err)
            .context("Name the relationship's navigation and inverse in the definition")
    } else {
        anyhow::Error::new(err)
    }
}

fn build(definition: &Path, config: Option<&Path>) -> anyhow::Result<Model> {
    let builder = load_builder(definition, config)?;
    builder.finalize().map_err(explain)
}

// ============================================================================
// check
// ============================================================================

pub fn check(definition: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let builder = load_builder(definition, config)?;
    let result = builder.validate();

    for warning in &result.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    for error in &result.errors {
        println!("{} {}", "error:".red().bold(), error);
    }
    if result.has_errors() {
        bail!(
            "{} has {} error(s)",
            definition.display(),
            result.errors.len()
        );
    }

    let model = builder.finalize().map_err(explain)?;
    info!(definition = %definition.display(), "Definition checked");
    println!(
        "{} {}: {} entity types, {} foreign keys",
        "ok".green().bold(),
        definition.display(),
        model.entity_type_count(),
        model.foreign_keys().count()
    );
    Ok(())
}

// ============================================================================
// dump
// ============================================================================

pub fn dump(
    definition: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let model = build(definition, config)?;
    let snapshot = ModelSnapshot::from_model(&model);
    let rendered = match format {
        OutputFormat::Json => snapshot.to_json()?,
        OutputFormat::Text => render_text(&snapshot),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(path = %path.display(), "Model written");
        }
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}

fn render_text(snapshot: &ModelSnapshot) -> String {
    let mut out = String::new();
    for entity in &snapshot.entity_types {
        render_entity(&mut out, entity);
        out.push('\n');
    }
    out
}

fn render_entity(out: &mut String, entity: &EntityTypeSnapshot) {
    let _ = write!(out, "{} [{}]", entity.name, entity.source);
    if let Some(base) = &entity.base_type {
        let _ = write!(out, " : {}", base);
    }
    if let Some(owner) = &entity.owner {
        let _ = write!(out, " owned by {}", owner);
    }
    out.push('\n');

    for p in &entity.properties {
        let mut flags = Vec::new();
        if p.shadow {
            flags.push("shadow");
        }
        match p.value_generated {
            ValueGenerated::Never => {}
            ValueGenerated::OnAdd => flags.push("generated on add"),
            ValueGenerated::OnAddOrUpdate => flags.push("generated on add or update"),
        }
        let nullable = if p.nullable { "?" } else { "" };
        let _ = write!(out, "  {}: {}{}", p.name, p.data_type.keyword(), nullable);
        if !flags.is_empty() {
            let _ = write!(out, " ({})", flags.join(", "));
        }
        out.push('\n');
    }
    for c in &entity.complex_properties {
        let kind = if c.collection { "complex collection" } else { "complex" };
        let _ = writeln!(out, "  {}: {} {}", c.name, kind, c.type_name);
    }
    if let Some(key) = &entity.primary_key {
        let _ = writeln!(out, "  primary key ({})", key.join(", "));
    }
    for key in &entity.alternate_keys {
        let _ = writeln!(out, "  alternate key ({})", key.join(", "));
    }
    for index in &entity.indexes {
        let unique = if index.unique { " unique" } else { "" };
        let _ = write!(out, "  index ({}){}", index.properties.join(", "), unique);
        if let Some(name) = &index.name {
            let _ = write!(out, " '{}'", name);
        }
        out.push('\n');
    }
    for fk in &entity.foreign_keys {
        let cardinality = if fk.unique { "one-to-one" } else { "many-to-one" };
        let _ = write!(
            out,
            "  foreign key ({}) -> {} ({}) {}",
            fk.properties.join(", "),
            fk.principal,
            fk.principal_key.join(", "),
            cardinality
        );
        if fk.ownership {
            out.push_str(" ownership");
        }
        if fk.required {
            out.push_str(" required");
        }
        let _ = write!(out, " on delete {}", fk.on_delete);
        match (&fk.navigation, &fk.inverse) {
            (Some(navigation), Some(inverse)) => {
                let _ = write!(out, " via {} / {}", navigation, inverse);
            }
            (Some(navigation), None) => {
                let _ = write!(out, " via {}", navigation);
            }
            (None, Some(inverse)) => {
                let _ = write!(out, " via - / {}", inverse);
            }
            (None, None) => {}
        }
        out.push('\n');
    }
    for skip in &entity.skip_navigations {
        let _ = writeln!(
            out,
            "  {} -> {} through {}",
            skip.name, skip.target, skip.join_entity_type
        );
    }
}

// ============================================================================
// conventions
// ============================================================================

pub fn conventions(config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let enabled = ConventionSet::with_defaults(&config).names();
    let all = ConventionSet::with_defaults(&BuilderConfig::default()).names();

    for (position, name) in all.iter().enumerate() {
        if enabled.contains(name) {
            println!("{:>2}. {}", position + 1, name);
        } else {
            println!("{:>2}. {} {}", position + 1, name, "(disabled)".dimmed());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LIBRARY: &str = r#"{
        "shapes": [
            { "name": "Library", "members": [
                { "name": "Id", "kind": { "scalar": "int32" } },
                { "name": "Books", "kind": { "collection": "Book" } }
            ] },
            { "name": "Book", "members": [
                { "name": "Id", "kind": { "scalar": "int32" } },
                { "name": "Isbn", "kind": { "scalar": "string" } },
                { "name": "Library", "kind": { "reference": "Library" } }
            ] }
        ],
        "entities": [
            { "name": "Library" },
            { "name": "Book", "alternate_keys": [["Isbn"]] }
        ]
    }"#;

    fn library_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(LIBRARY.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_render_text() {
        let file = library_file();
        let model = build(file.path(), None).unwrap();
        let text = render_text(&ModelSnapshot::from_model(&model));

        assert!(text.contains("Book [Explicit]"));
        assert!(text.contains("  primary key (Id)"));
        assert!(text.contains("  alternate key (Isbn)"));
        assert!(text.contains(
            "foreign key (LibraryId) -> Library (Id) many-to-one on delete CLIENT SET NULL"
        ));
        assert!(text.contains("  LibraryId: int32? (shadow)"));
        assert!(text.contains("via Library / Books"));
    }

    #[test]
    fn test_dump_to_file() {
        let file = library_file();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("model.json");
        dump(file.path(), None, OutputFormat::Json, Some(&output)).unwrap();

        let json = std::fs::read_to_string(&output).unwrap();
        let snapshot = ModelSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot.entity_types.len(), 2);
    }

    #[test]
    fn test_missing_config_reported() {
        let file = library_file();
        let err = check(file.path(), Some(Path::new("/nonexistent/ormforge.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
