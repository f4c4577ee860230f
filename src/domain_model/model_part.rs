//! Model parts: the mapping classification of one attribute
//!
//! A `ModelPart` is read-only once the domain model is built. Its identity is
//! its role (`Order.customer`, `Order.lines.{element}`), which is unique
//! within a domain model; equality and hashing use the role alone.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use super::types::{BasicType, JdbcType, ValueType};

pub type ModelPartRef = Arc<ModelPart>;

/// When associated data is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchTiming {
    /// Read as part of the current row
    Immediate,
    /// Only a reference is produced, the data is loaded later
    #[default]
    Delayed,
}

/// Which side of a collection a part describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPartNature {
    Element,
    Index,
}

#[derive(Debug, Clone)]
pub struct ModelPart {
    name: String,
    role: String,
    kind: ModelPartKind,
}

/// Closed set of attribute classifications.
#[derive(Debug, Clone)]
pub enum ModelPartKind {
    Basic(BasicPart),
    Embedded(EmbeddedPart),
    EntityValued(ToOnePart),
    Plural(PluralPart),
    Discriminated(DiscriminatedPart),
    /// Entity-valued element or index of a collection
    EntityCollectionPart(EntityCollectionPart),
}

/// Single-column attribute
#[derive(Debug, Clone)]
pub struct BasicPart {
    /// Table (or alias stem) the column lives in
    pub table: String,
    /// Column name, or the SQL fragment for formula attributes
    pub selection_expression: String,
    pub is_formula: bool,
    pub value_type: ValueType,
    pub jdbc_type: JdbcType,
}

/// Composite value
#[derive(Debug, Clone)]
pub struct EmbeddedPart {
    /// Declaration order is load-bearing for positional reads
    pub sub_parts: Vec<ModelPartRef>,
    pub secondary_table: Option<SecondaryTable>,
}

/// Table an embeddable is stored in when it is not stored inline
#[derive(Debug, Clone)]
pub struct SecondaryTable {
    pub table: String,
    /// Columns of the secondary table referencing the owner
    pub key_columns: Vec<String>,
    /// Owner columns referenced by `key_columns`
    pub owner_columns: Vec<String>,
}

/// To-one association
#[derive(Debug, Clone)]
pub struct ToOnePart {
    pub target_entity: String,
    /// Dotted property path on the target used instead of its identifier
    pub referenced_property: Option<String>,
    pub foreign_key: ForeignKeyDescriptor,
    pub timing: FetchTiming,
}

/// Both sides of a foreign key.
///
/// `key_part` mirrors the shape of the target key (basic or embedded) but its
/// columns are the referring side's columns, so reading it from a row yields
/// the key of the associated entity.
#[derive(Debug, Clone)]
pub struct ForeignKeyDescriptor {
    pub key_table: String,
    pub key_part: ModelPartRef,
    pub target_table: String,
    pub target_columns: Vec<String>,
}

impl ForeignKeyDescriptor {
    pub fn is_composite(&self) -> bool {
        matches!(self.key_part.kind(), ModelPartKind::Embedded(_))
    }

    /// Referring-side columns in declaration order
    pub fn key_columns(&self) -> Vec<String> {
        self.key_part
            .basic_leaves()
            .iter()
            .filter_map(|leaf| leaf.as_basic().map(|b| b.selection_expression.clone()))
            .collect()
    }
}

/// Collection attribute
#[derive(Debug, Clone)]
pub struct PluralPart {
    pub collection_table: String,
    /// Collection table columns referencing the owner
    pub key_columns: Vec<String>,
    /// Owner columns referenced by `key_columns`
    pub owner_columns: Vec<String>,
    pub element: ModelPartRef,
    pub index: Option<ModelPartRef>,
    pub timing: FetchTiming,
}

/// Polymorphic ("any") association
#[derive(Debug, Clone)]
pub struct DiscriminatedPart {
    pub table: String,
    pub discriminator_column: String,
    pub key_column: String,
    pub key_type: ValueType,
    /// Discriminator value to entity name, in declaration order
    pub targets: Vec<DiscriminatorTarget>,
    pub timing: FetchTiming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorTarget {
    pub value: String,
    pub entity: String,
}

impl DiscriminatedPart {
    pub fn resolve_target(&self, discriminator: &str) -> Option<&str> {
        self.targets
            .iter()
            .find(|t| t.value == discriminator)
            .map(|t| t.entity.as_str())
    }
}

/// Entity reference stored as a collection element or map key
#[derive(Debug, Clone)]
pub struct EntityCollectionPart {
    pub nature: CollectionPartNature,
    pub target_entity: String,
    pub foreign_key: ForeignKeyDescriptor,
}

impl ModelPart {
    pub fn new(name: impl Into<String>, role: impl Into<String>, kind: ModelPartKind) -> Self {
        ModelPart {
            name: name.into(),
            role: role.into(),
            kind,
        }
    }

    /// Attribute name within its container
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique name of this part within the domain model
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn kind(&self) -> &ModelPartKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ModelPartKind::Basic(_) => "basic",
            ModelPartKind::Embedded(_) => "embedded",
            ModelPartKind::EntityValued(_) => "to_one",
            ModelPartKind::Plural(_) => "plural",
            ModelPartKind::Discriminated(_) => "any",
            ModelPartKind::EntityCollectionPart(_) => "entity_collection_part",
        }
    }

    pub fn as_basic(&self) -> Option<&BasicPart> {
        match &self.kind {
            ModelPartKind::Basic(basic) => Some(basic),
            _ => None,
        }
    }

    pub fn as_embedded(&self) -> Option<&EmbeddedPart> {
        match &self.kind {
            ModelPartKind::Embedded(embedded) => Some(embedded),
            _ => None,
        }
    }

    /// Sub-part by name (embeddables only)
    pub fn find_sub_part(&self, name: &str) -> Option<&ModelPartRef> {
        self.as_embedded()
            .and_then(|e| e.sub_parts.iter().find(|p| p.name() == name))
    }

    /// Basic parts under this part, depth-first in declaration order.
    /// A basic part is its own single leaf.
    pub fn basic_leaves(self: &Arc<Self>) -> Vec<ModelPartRef> {
        let mut leaves = Vec::new();
        collect_leaves(self, &mut leaves);
        leaves
    }

    /// Number of columns a row needs to carry this part
    pub fn column_span(self: &Arc<Self>) -> usize {
        match &self.kind {
            ModelPartKind::Basic(_) => 1,
            ModelPartKind::Embedded(_) => self.basic_leaves().len(),
            ModelPartKind::EntityValued(to_one) => to_one.foreign_key.key_columns().len(),
            ModelPartKind::EntityCollectionPart(part) => part.foreign_key.key_columns().len(),
            ModelPartKind::Discriminated(_) => 2,
            ModelPartKind::Plural(_) => 0,
        }
    }
}

fn collect_leaves(part: &ModelPartRef, leaves: &mut Vec<ModelPartRef>) {
    match part.kind() {
        ModelPartKind::Basic(_) => leaves.push(part.clone()),
        ModelPartKind::Embedded(embedded) => {
            for sub in &embedded.sub_parts {
                collect_leaves(sub, leaves);
            }
        }
        _ => {}
    }
}

impl BasicPart {
    /// Name used to find this attribute's column in a result set: the column
    /// itself, or the attribute name for formulas.
    pub fn column_label<'a>(&'a self, attribute_name: &'a str) -> &'a str {
        if self.is_formula {
            attribute_name
        } else {
            &self.selection_expression
        }
    }

    pub fn basic_type(&self) -> BasicType {
        BasicType::new(self.value_type, self.jdbc_type)
    }
}

impl PartialEq for ModelPart {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role
    }
}

impl Eq for ModelPart {}

impl Hash for ModelPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.role.hash(state);
    }
}

impl fmt::Display for ModelPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.role)
    }
}

impl Serialize for ModelPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.role)
    }
}
