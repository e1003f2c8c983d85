//! Type shapes
//!
//! A [`TypeShape`] is what the engine knows about a mapped type: its members
//! and the declarative markers attached to them. Conventions read shapes to
//! discover properties, keys and relationships; the graph itself never
//! stores a shape, only the type name it came from.

use ormforge_core::{DataType, ModelError, ModelResult, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// Marker
// ============================================================================

/// Declarative marker on a member, applied at DataAnnotation rank
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// Part of the primary key
    Key,
    /// Not nullable (scalars) or required relationship (references)
    Required,
    /// Excluded from the model
    NotMapped,
    /// Maximum length of a string or binary value
    MaxLength(u32),
    /// On a scalar: foreign key property of the named navigation.
    /// On a reference: name of its foreign key property.
    ForeignKey(String),
}

// ============================================================================
// Member
// ============================================================================

/// What a member holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// A scalar value
    Scalar(DataType),
    /// A reference to another mapped type
    Reference(String),
    /// A collection of another mapped type
    Collection(String),
    /// A structurally nested value stored with its owner
    Complex(String),
}

impl MemberKind {
    /// Target type name of a navigation-like member
    pub fn target(&self) -> Option<&str> {
        match self {
            MemberKind::Reference(target) | MemberKind::Collection(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, MemberKind::Collection(_))
    }
}

/// A member of a mapped type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            markers: Vec::new(),
        }
    }

    /// Scalar member
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, MemberKind::Scalar(data_type))
    }

    /// Reference navigation member
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Reference(target.into()))
    }

    /// Collection navigation member
    pub fn collection(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Collection(target.into()))
    }

    /// Complex member
    pub fn complex(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Complex(type_name.into()))
    }

    /// Attach a marker
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn has_marker(&self, marker: &Marker) -> bool {
        self.markers.contains(marker)
    }

    pub fn is_not_mapped(&self) -> bool {
        self.has_marker(&Marker::NotMapped)
    }

    /// Navigation named by a `ForeignKey` marker
    pub fn foreign_key_marker(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::ForeignKey(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn max_length(&self) -> Option<u32> {
        self.markers.iter().find_map(|m| match m {
            Marker::MaxLength(n) => Some(*n),
            _ => None,
        })
    }
}

// ============================================================================
// TypeShape
// ============================================================================

/// The members and markers of a mapped type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeShape {
    pub name: String,
    /// Always mapped as owned when reached through a navigation
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub members: Vec<MemberInfo>,
}

impl TypeShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owned: false,
            members: Vec::new(),
        }
    }

    /// Mark the type as owned
    pub fn owned(mut self) -> Self {
        self.owned = true;
        self
    }

    /// Add a member
    pub fn member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Add a scalar member
    pub fn scalar(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.member(MemberInfo::scalar(name, data_type))
    }

    /// Add a reference member
    pub fn reference(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.member(MemberInfo::reference(name, target))
    }

    /// Add a collection member
    pub fn collection(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.member(MemberInfo::collection(name, target))
    }

    /// Find a member by name
    pub fn find_member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Scalar members
    pub fn scalars(&self) -> impl Iterator<Item = (&MemberInfo, &DataType)> {
        self.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Scalar(data_type) => Some((m, data_type)),
            _ => None,
        })
    }

    /// Reference and collection members
    pub fn navigations(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(|m| m.kind.target().is_some())
    }
}

impl Validatable for TypeShape {
    fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid_configuration("type name cannot be empty"));
        }
        let mut seen = HashSet::new();
        for member in &self.members {
            if member.name.trim().is_empty() {
                return Err(ModelError::invalid_configuration(format!(
                    "type '{}' has a member with an empty name",
                    self.name
                )));
            }
            if !seen.insert(member.name.as_str()) {
                return Err(ModelError::invalid_configuration(format!(
                    "type '{}' declares member '{}' twice",
                    self.name, member.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Mapped
// ============================================================================

/// A Rust type that describes its own shape
///
/// ```rust,ignore
/// struct Customer;
///
/// impl Mapped for Customer {
///     fn shape() -> TypeShape {
///         TypeShape::new("Customer")
///             .scalar("Id", DataType::Int32)
///             .collection("Orders", "Order")
///     }
/// }
/// ```
pub trait Mapped {
    fn shape() -> TypeShape;
}

// ============================================================================
// ShapeRegistry
// ============================================================================

/// Registered type shapes, by type name
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    shapes: BTreeMap<String, TypeShape>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape, replacing any previous shape of the same name
    pub fn register(&mut self, shape: TypeShape) -> ModelResult<()> {
        shape.validate()?;
        self.shapes.insert(shape.name.clone(), shape);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeShape> {
        self.shapes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeShape> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
