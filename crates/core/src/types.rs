//! Core types used throughout ormforge
//!
//! This module contains the identifiers of metadata nodes, the configuration
//! source ranks used to arbitrate conflicting writes, and the scalar type
//! system shared by the metadata graph and definition files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Unique Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw sequence number
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw sequence number
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of an entity type node
    EntityTypeId,
    "EntityType"
);
define_id!(
    /// Identifier of a scalar property node
    PropertyId,
    "Property"
);
define_id!(
    /// Identifier of a complex (structurally nested) property node
    ComplexPropertyId,
    "ComplexProperty"
);
define_id!(
    /// Identifier of a key node
    KeyId,
    "Key"
);
define_id!(
    /// Identifier of a foreign key node
    ForeignKeyId,
    "ForeignKey"
);
define_id!(
    /// Identifier of a skip navigation node
    SkipNavigationId,
    "SkipNavigation"
);
define_id!(
    /// Identifier of an index node
    IndexId,
    "Index"
);

// ============================================================================
// Configuration Source
// ============================================================================

/// Provenance rank of a configuration write
///
/// Ordered from weakest to strongest, so the derived `Ord` gives
/// `Convention < DataAnnotation < Explicit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationSource {
    /// Inferred by a convention
    Convention,
    /// Inferred from a declarative marker on the mapped type
    DataAnnotation,
    /// Set by calling code
    Explicit,
}

impl ConfigurationSource {
    /// Whether a write at this rank may replace a value recorded at `current`
    ///
    /// Unset values (`None`) can always be replaced; otherwise the new rank
    /// must be at least as strong as the recorded one.
    pub fn overrides(self, current: Option<ConfigurationSource>) -> bool {
        current.is_none_or(|current| self >= current)
    }

    /// Whether this rank is strictly stronger than `current`
    pub fn strictly_overrides(self, current: Option<ConfigurationSource>) -> bool {
        current.is_none_or(|current| self > current)
    }

    /// The stronger of this rank and `other`
    pub fn max_with(self, other: Option<ConfigurationSource>) -> ConfigurationSource {
        match other {
            Some(other) if other > self => other,
            _ => self,
        }
    }

    /// Get a user-friendly display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ConfigurationSource::Convention => "Convention",
            ConfigurationSource::DataAnnotation => "DataAnnotation",
            ConfigurationSource::Explicit => "Explicit",
        }
    }
}

impl fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Data Types
// ============================================================================

/// Scalar data types of properties
///
/// Serialized in the compact textual form used by definition files:
/// `int32`, `string?` for a nullable string, `[uuid]` for an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    // Primitive Types
    /// Variable-length string
    #[default]
    String,
    /// Long-form text content
    Text,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Fixed-point decimal
    Decimal,
    /// Boolean true/false
    Bool,
    /// UUID (universally unique identifier)
    Uuid,
    /// Date and time with timezone
    DateTime,
    /// Date without time
    Date,
    /// Time without date
    Time,
    /// Binary data
    Bytes,
    /// JSON document
    Json,

    // Complex Types
    /// Optional/nullable wrapper
    Optional(Box<DataType>),
    /// Array/list of items
    Array(Box<DataType>),
}

impl DataType {
    /// Check if this type is nullable
    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Optional(_))
    }

    /// The type with any nullable wrapper removed
    pub fn non_nullable(&self) -> &DataType {
        match self {
            DataType::Optional(inner) => inner.non_nullable(),
            other => other,
        }
    }

    /// Wrap the type as nullable (no-op if already nullable)
    pub fn into_nullable(self) -> DataType {
        if self.is_nullable() {
            self
        } else {
            DataType::Optional(Box::new(self))
        }
    }

    /// Check if this is an integral type
    pub fn is_integer(&self) -> bool {
        matches!(
            self.non_nullable(),
            DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Whether values of this type can be generated by the store on insert
    pub fn supports_value_generation(&self) -> bool {
        self.is_integer() || matches!(self.non_nullable(), DataType::Uuid)
    }

    /// Whether a property of this type can hold values of `other`
    ///
    /// Nullability does not affect compatibility; foreign key properties are
    /// routinely nullable while the principal key is not.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        self.non_nullable() == other.non_nullable()
    }

    /// The keyword used in definition files
    pub fn keyword(&self) -> String {
        match self {
            DataType::String => "string".to_string(),
            DataType::Text => "text".to_string(),
            DataType::Int16 => "int16".to_string(),
            DataType::Int32 => "int32".to_string(),
            DataType::Int64 => "int64".to_string(),
            DataType::Float32 => "float32".to_string(),
            DataType::Float64 => "float64".to_string(),
            DataType::Decimal => "decimal".to_string(),
            DataType::Bool => "bool".to_string(),
            DataType::Uuid => "uuid".to_string(),
            DataType::DateTime => "datetime".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Time => "time".to_string(),
            DataType::Bytes => "bytes".to_string(),
            DataType::Json => "json".to_string(),
            DataType::Optional(inner) => format!("{}?", inner.keyword()),
            DataType::Array(inner) => format!("[{}]", inner.keyword()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix('?') {
            return Ok(inner.parse::<DataType>()?.into_nullable());
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            return Ok(DataType::Array(Box::new(inner.parse()?)));
        }

        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(DataType::String),
            "text" => Ok(DataType::Text),
            "int16" | "i16" | "short" => Ok(DataType::Int16),
            "int32" | "i32" | "int" => Ok(DataType::Int32),
            "int64" | "i64" | "long" => Ok(DataType::Int64),
            "float32" | "f32" | "float" => Ok(DataType::Float32),
            "float64" | "f64" | "double" => Ok(DataType::Float64),
            "decimal" => Ok(DataType::Decimal),
            "bool" | "boolean" => Ok(DataType::Bool),
            "uuid" => Ok(DataType::Uuid),
            "datetime" => Ok(DataType::DateTime),
            "date" => Ok(DataType::Date),
            "time" => Ok(DataType::Time),
            "bytes" | "binary" => Ok(DataType::Bytes),
            "json" => Ok(DataType::Json),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.keyword()
    }
}

// ============================================================================
// Delete Behavior
// ============================================================================

/// What happens to dependents when their principal is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteBehavior {
    /// Delete dependents along with the principal
    Cascade,
    /// Null out foreign key values of tracked dependents only
    #[default]
    ClientSetNull,
    /// Null out foreign key values
    SetNull,
    /// Prevent deletion while dependents exist
    Restrict,
    /// Take no action
    NoAction,
}

impl DeleteBehavior {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DeleteBehavior::Cascade => "CASCADE",
            DeleteBehavior::ClientSetNull => "CLIENT SET NULL",
            DeleteBehavior::SetNull => "SET NULL",
            DeleteBehavior::Restrict => "RESTRICT",
            DeleteBehavior::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for DeleteBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Value Generation
// ============================================================================

/// When property values are generated by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGenerated {
    /// Values are always supplied by the application
    #[default]
    Never,
    /// A value is generated when the row is inserted
    OnAdd,
    /// A value is generated on insert and on every update
    OnAddOrUpdate,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_ordering() {
        assert!(ConfigurationSource::Explicit > ConfigurationSource::DataAnnotation);
        assert!(ConfigurationSource::DataAnnotation > ConfigurationSource::Convention);
    }

    #[test]
    fn test_source_overrides() {
        use ConfigurationSource::*;
        assert!(Convention.overrides(None));
        assert!(Convention.overrides(Some(Convention)));
        assert!(!Convention.overrides(Some(DataAnnotation)));
        assert!(Explicit.overrides(Some(Explicit)));
        assert!(!Explicit.strictly_overrides(Some(Explicit)));
        assert!(DataAnnotation.strictly_overrides(Some(Convention)));
    }

    #[test]
    fn test_source_max_with() {
        use ConfigurationSource::*;
        assert_eq!(Convention.max_with(Some(Explicit)), Explicit);
        assert_eq!(Explicit.max_with(Some(Convention)), Explicit);
        assert_eq!(DataAnnotation.max_with(None), DataAnnotation);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ForeignKeyId::from_raw(7).to_string(), "ForeignKey#7");
        assert_eq!(EntityTypeId::from_raw(3).raw(), 3);
    }

    #[test]
    fn test_data_type_parse() {
        assert_eq!("int32".parse::<DataType>(), Ok(DataType::Int32));
        assert_eq!(
            "string?".parse::<DataType>(),
            Ok(DataType::Optional(Box::new(DataType::String)))
        );
        assert_eq!(
            "[uuid]".parse::<DataType>(),
            Ok(DataType::Array(Box::new(DataType::Uuid)))
        );
        assert!("widget".parse::<DataType>().is_err());
    }

    #[test]
    fn test_data_type_display_is_keyword() {
        let nested = DataType::Array(Box::new(DataType::Int64.into_nullable()));
        assert_eq!(nested.to_string(), "[int64?]");
        assert_eq!(nested.to_string().parse::<DataType>(), Ok(nested));
    }

    #[test]
    fn test_data_type_nullability() {
        let nullable = DataType::Int64.into_nullable();
        assert!(nullable.is_nullable());
        assert_eq!(nullable.non_nullable(), &DataType::Int64);
        assert_eq!(nullable.clone().into_nullable(), nullable);
    }

    #[test]
    fn test_data_type_compatibility() {
        assert!(DataType::Int32.is_compatible_with(&DataType::Int32.into_nullable()));
        assert!(!DataType::Int32.is_compatible_with(&DataType::Int64));
    }

    #[test]
    fn test_value_generation_support() {
        assert!(DataType::Int64.supports_value_generation());
        assert!(DataType::Uuid.supports_value_generation());
        assert!(!DataType::String.supports_value_generation());
    }

    #[test]
    fn test_data_type_serde() {
        let json = serde_json::to_string(&DataType::Optional(Box::new(DataType::Int32))).unwrap();
        assert_eq!(json, "\"int32?\"");
        let parsed: DataType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(parsed, DataType::DateTime);
    }

    #[test]
    fn test_delete_behavior_default() {
        assert_eq!(DeleteBehavior::default(), DeleteBehavior::ClientSetNull);
        assert_eq!(DeleteBehavior::Cascade.to_string(), "CASCADE");
    }
}
