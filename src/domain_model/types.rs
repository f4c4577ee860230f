//! Value and type system used when reading rows
//!
//! `JdbcType` describes what a column carries on the wire, `ValueType` what
//! the domain model wants to see. A `BasicType` pairs the two; the
//! `TypeRegistry` decides which pair to use for a column when the model does
//! not say, and `ValueType::coerce` converts wire values into domain values.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::results::errors::MappingError;

/// Domain-level type of a basic attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Double,
    Decimal,
    String,
    Date,
    Timestamp,
    Uuid,
    Binary,
    /// Accept whatever the column carries
    Object,
}

/// Wire-level type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JdbcType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Numeric,
    Varchar,
    Date,
    Timestamp,
    Binary,
    Other,
}

/// A resolved (domain type, wire type) pair for one selected column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BasicType {
    pub value_type: ValueType,
    pub jdbc_type: JdbcType,
}

impl BasicType {
    pub const fn new(value_type: ValueType, jdbc_type: JdbcType) -> Self {
        BasicType {
            value_type,
            jdbc_type,
        }
    }

    /// Convert a wire value read from the row into this type's domain value.
    pub fn extract(&self, raw: &Value) -> Result<Value, MappingError> {
        self.value_type.coerce(raw)
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.value_type, self.jdbc_type)
    }
}

/// Optional sign, digits and at most one decimal point; no exponent and no
/// special values such as `NaN` or `inf`.
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    !(whole.is_empty() && fraction.is_empty()) && all_digits(whole) && all_digits(fraction)
}

impl ValueType {
    /// The wire type a column of this domain type is normally stored as
    pub fn default_jdbc_type(&self) -> JdbcType {
        match self {
            ValueType::Boolean => JdbcType::Boolean,
            ValueType::Integer => JdbcType::Integer,
            ValueType::Long => JdbcType::BigInt,
            ValueType::Double => JdbcType::Double,
            ValueType::Decimal => JdbcType::Numeric,
            ValueType::String => JdbcType::Varchar,
            ValueType::Date => JdbcType::Date,
            ValueType::Timestamp => JdbcType::Timestamp,
            ValueType::Uuid => JdbcType::Other,
            ValueType::Binary => JdbcType::Binary,
            ValueType::Object => JdbcType::Other,
        }
    }

    /// Coerce a raw row value into this type.
    ///
    /// NULL stays NULL for every type. Numeric narrowing is range checked,
    /// text is parsed for temporal, uuid and decimal targets.
    pub fn coerce(&self, value: &Value) -> Result<Value, MappingError> {
        if value.is_null() || *self == ValueType::Object {
            return Ok(value.clone());
        }
        let mismatch = || MappingError::TypeCoercion {
            value: value.to_string(),
            target: *self,
        };
        let coerced = match (self, value) {
            (ValueType::Boolean, Value::Bool(b)) => Value::Bool(*b),
            (ValueType::Boolean, Value::Int(i)) if *i == 0 || *i == 1 => Value::Bool(*i == 1),
            (ValueType::Boolean, Value::Long(i)) if *i == 0 || *i == 1 => Value::Bool(*i == 1),

            (ValueType::Integer, Value::Int(i)) => Value::Int(*i),
            (ValueType::Integer, Value::Long(l)) => {
                Value::Int(i32::try_from(*l).map_err(|_| mismatch())?)
            }
            (ValueType::Integer, Value::Text(s)) => {
                Value::Int(s.trim().parse().map_err(|_| mismatch())?)
            }

            (ValueType::Long, Value::Int(i)) => Value::Long(i64::from(*i)),
            (ValueType::Long, Value::Long(l)) => Value::Long(*l),
            (ValueType::Long, Value::Text(s)) => {
                Value::Long(s.trim().parse().map_err(|_| mismatch())?)
            }

            (ValueType::Double, Value::Int(i)) => Value::Double(f64::from(*i)),
            (ValueType::Double, Value::Long(l)) => Value::Double(*l as f64),
            (ValueType::Double, Value::Double(d)) => Value::Double(*d),
            (ValueType::Double, Value::Decimal(s)) => {
                Value::Double(s.parse().map_err(|_| mismatch())?)
            }

            (ValueType::Decimal, Value::Decimal(s)) => Value::Decimal(s.clone()),
            (ValueType::Decimal, Value::Int(i)) => Value::Decimal(i.to_string()),
            (ValueType::Decimal, Value::Long(l)) => Value::Decimal(l.to_string()),
            (ValueType::Decimal, Value::Double(d)) if d.is_finite() => {
                Value::Decimal(d.to_string())
            }
            (ValueType::Decimal, Value::Text(s)) if is_plain_decimal(s.trim()) => {
                Value::Decimal(s.trim().to_string())
            }

            (ValueType::String, Value::Text(s)) => Value::Text(s.clone()),
            (ValueType::String, Value::Uuid(u)) => Value::Text(u.to_string()),
            (ValueType::String, Value::Int(_) | Value::Long(_) | Value::Decimal(_)) => {
                Value::Text(value.to_string())
            }

            (ValueType::Date, Value::Date(d)) => Value::Date(*d),
            (ValueType::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
            (ValueType::Date, Value::Text(s)) => Value::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| mismatch())?,
            ),

            (ValueType::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(*ts),
            (ValueType::Timestamp, Value::Date(d)) => Value::Timestamp(
                d.and_hms_opt(0, 0, 0).ok_or_else(mismatch)?,
            ),
            (ValueType::Timestamp, Value::Text(s)) => Value::Timestamp(
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S"))
                    .map_err(|_| mismatch())?,
            ),

            (ValueType::Uuid, Value::Uuid(u)) => Value::Uuid(*u),
            (ValueType::Uuid, Value::Text(s)) => {
                Value::Uuid(Uuid::parse_str(s.trim()).map_err(|_| mismatch())?)
            }
            (ValueType::Uuid, Value::Bytes(b)) => {
                Value::Uuid(Uuid::from_slice(b).map_err(|_| mismatch())?)
            }

            (ValueType::Binary, Value::Bytes(b)) => Value::Bytes(b.clone()),
            (ValueType::Binary, Value::Text(s)) => Value::Bytes(s.as_bytes().to_vec()),

            _ => return Err(mismatch()),
        };
        Ok(coerced)
    }
}

/// Maps wire types to the domain type used when nothing more specific is known.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    defaults: HashMap<JdbcType, ValueType>,
}

lazy_static::lazy_static! {
    static ref STANDARD_REGISTRY: TypeRegistry = TypeRegistry::standard();
}

impl TypeRegistry {
    pub fn standard() -> Self {
        let defaults = HashMap::from([
            (JdbcType::Boolean, ValueType::Boolean),
            (JdbcType::Integer, ValueType::Integer),
            (JdbcType::BigInt, ValueType::Long),
            (JdbcType::Double, ValueType::Double),
            (JdbcType::Numeric, ValueType::Decimal),
            (JdbcType::Varchar, ValueType::String),
            (JdbcType::Date, ValueType::Date),
            (JdbcType::Timestamp, ValueType::Timestamp),
            (JdbcType::Binary, ValueType::Binary),
            (JdbcType::Other, ValueType::Object),
        ]);
        TypeRegistry { defaults }
    }

    /// Shared standard registry
    pub fn shared() -> &'static TypeRegistry {
        &STANDARD_REGISTRY
    }

    /// Override the default domain type for a wire type.
    pub fn register(&mut self, jdbc_type: JdbcType, value_type: ValueType) {
        self.defaults.insert(jdbc_type, value_type);
    }

    /// Resolve the basic type for a column: the fallback domain type wins when
    /// given, otherwise the registry default for the column's wire type.
    pub fn resolve(&self, jdbc_type: JdbcType, fallback: Option<ValueType>) -> BasicType {
        let value_type = fallback
            .or_else(|| self.defaults.get(&jdbc_type).copied())
            .unwrap_or(ValueType::Object);
        BasicType::new(value_type, jdbc_type)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// A value read from a row, or assembled from several columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    /// Exact numeric kept in its textual form
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    /// Embedded value, sub-attributes in declaration order
    Composite(IndexMap<String, Value>),
    Entity(EntityValue),
    EntityRef(EntityRef),
    Collection(CollectionValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => write!(f, "{}", d),
            Value::Decimal(s) | Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Composite(values) => {
                write!(f, "(")?;
                for (i, (name, value)) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
            Value::Entity(entity) => write!(f, "{}#{}", entity.entity, entity.id),
            Value::EntityRef(reference) => write!(f, "{}#{}", reference.entity, reference.key),
            Value::Collection(collection) => write!(f, "{}", collection.role),
        }
    }
}

/// A fully materialized entity row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityValue {
    pub entity: String,
    pub id: Box<Value>,
    pub attributes: IndexMap<String, Value>,
}

/// Stand-in for an associated entity: enough to identify it, nothing more
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRef {
    pub entity: String,
    pub key: Box<Value>,
}

/// A collection value: either a reference to be loaded later or the
/// elements carried by the current row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionValue {
    pub role: String,
    pub owner_key: Box<Value>,
    pub state: CollectionState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectionState {
    Delayed,
    Loaded { entries: Vec<CollectionEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    pub element: Value,
}
