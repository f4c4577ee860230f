//! Result and fetch nodes
//!
//! These are what builders produce: a tree of nodes bound to row-buffer
//! positions. Executed once per row, the tree assembles the row's value graph.

use indexmap::IndexMap;
use serde::Serialize;

use crate::domain_model::model_part::FetchTiming;
use crate::domain_model::types::{
    BasicType, CollectionEntry, CollectionState, CollectionValue, EntityRef, EntityValue, Value,
    ValueType,
};
use crate::navigable_path::NavigablePath;
use crate::results::errors::MappingError;

/// The root node of a mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainResult {
    Basic(BasicResult),
    Embeddable(EmbeddableResult),
    Entity(EntityResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicResult {
    pub path: NavigablePath,
    pub column_label: String,
    pub position: usize,
    pub basic_type: BasicType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddableResult {
    pub path: NavigablePath,
    pub fetches: Vec<Fetch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub path: NavigablePath,
    pub entity: String,
    pub table_alias: String,
    pub identifier: Box<Fetch>,
    pub fetches: Vec<Fetch>,
}

/// A non-root node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fetch {
    Basic(BasicFetch),
    Embeddable(EmbeddableFetch),
    EntityReference(EntityReferenceFetch),
    Collection(CollectionFetch),
    Discriminated(DiscriminatedFetch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFetch {
    pub path: NavigablePath,
    pub name: String,
    pub position: usize,
    pub basic_type: BasicType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddableFetch {
    pub path: NavigablePath,
    pub name: String,
    pub fetches: Vec<Fetch>,
}

/// Key-only stand-in for an associated entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReferenceFetch {
    pub path: NavigablePath,
    pub name: String,
    pub entity: String,
    pub table_alias: Option<String>,
    pub key: Box<Fetch>,
    pub timing: FetchTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionFetch {
    pub path: NavigablePath,
    pub name: String,
    pub role: String,
    pub timing: FetchTiming,
    pub table_alias: Option<String>,
    /// Present for immediate fetches only
    pub element: Option<Box<Fetch>>,
    pub index: Option<Box<Fetch>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatedFetch {
    pub path: NavigablePath,
    pub name: String,
    pub role: String,
    pub discriminator_position: usize,
    pub key_position: usize,
    pub key_type: ValueType,
    /// (discriminator value, entity name)
    pub targets: Vec<(String, String)>,
    pub timing: FetchTiming,
}

fn read_column(row: &[Value], position: usize) -> Result<&Value, MappingError> {
    row.get(position).ok_or(MappingError::RowWidthMismatch {
        expected: position + 1,
        actual: row.len(),
    })
}

impl DomainResult {
    pub fn path(&self) -> &NavigablePath {
        match self {
            DomainResult::Basic(r) => &r.path,
            DomainResult::Embeddable(r) => &r.path,
            DomainResult::Entity(r) => &r.path,
        }
    }

    /// Assemble the value graph for one row.
    pub fn assemble(&self, row: &[Value]) -> Result<Value, MappingError> {
        match self {
            DomainResult::Basic(result) => {
                result.basic_type.extract(read_column(row, result.position)?)
            }
            DomainResult::Embeddable(result) => assemble_composite(&result.fetches, row, &Value::Null),
            DomainResult::Entity(result) => {
                let id = result.identifier.assemble(row, &Value::Null)?;
                if id.is_null() {
                    return Ok(Value::Null);
                }
                let mut attributes = IndexMap::with_capacity(result.fetches.len());
                for fetch in &result.fetches {
                    attributes.insert(fetch.name().to_string(), fetch.assemble(row, &id)?);
                }
                Ok(Value::Entity(EntityValue {
                    entity: result.entity.clone(),
                    id: Box::new(id),
                    attributes,
                }))
            }
        }
    }
}

/// Composite of the given fetches; NULL when every part is NULL.
fn assemble_composite(fetches: &[Fetch], row: &[Value], owner_key: &Value) -> Result<Value, MappingError> {
    let mut values = IndexMap::with_capacity(fetches.len());
    for fetch in fetches {
        values.insert(fetch.name().to_string(), fetch.assemble(row, owner_key)?);
    }
    if values.values().all(Value::is_null) {
        Ok(Value::Null)
    } else {
        Ok(Value::Composite(values))
    }
}

impl Fetch {
    pub fn path(&self) -> &NavigablePath {
        match self {
            Fetch::Basic(f) => &f.path,
            Fetch::Embeddable(f) => &f.path,
            Fetch::EntityReference(f) => &f.path,
            Fetch::Collection(f) => &f.path,
            Fetch::Discriminated(f) => &f.path,
        }
    }

    /// Attribute name this fetch populates
    pub fn name(&self) -> &str {
        match self {
            Fetch::Basic(f) => &f.name,
            Fetch::Embeddable(f) => &f.name,
            Fetch::EntityReference(f) => &f.name,
            Fetch::Collection(f) => &f.name,
            Fetch::Discriminated(f) => &f.name,
        }
    }

    /// Assemble this fetch's value for one row. `owner_key` is the identifier
    /// of the nearest owning entity (NULL when there is none).
    pub fn assemble(&self, row: &[Value], owner_key: &Value) -> Result<Value, MappingError> {
        match self {
            Fetch::Basic(fetch) => fetch.basic_type.extract(read_column(row, fetch.position)?),
            Fetch::Embeddable(fetch) => assemble_composite(&fetch.fetches, row, owner_key),
            Fetch::EntityReference(fetch) => {
                let key = fetch.key.assemble(row, owner_key)?;
                if key.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::EntityRef(EntityRef {
                    entity: fetch.entity.clone(),
                    key: Box::new(key),
                }))
            }
            Fetch::Collection(fetch) => {
                if owner_key.is_null() {
                    return Ok(Value::Null);
                }
                let state = match (&fetch.timing, &fetch.element) {
                    (FetchTiming::Immediate, Some(element)) => {
                        let element = element.assemble(row, owner_key)?;
                        let index = fetch
                            .index
                            .as_ref()
                            .map(|index| index.assemble(row, owner_key))
                            .transpose()?;
                        let entries = if element.is_null() {
                            Vec::new()
                        } else {
                            vec![CollectionEntry { index, element }]
                        };
                        CollectionState::Loaded { entries }
                    }
                    _ => CollectionState::Delayed,
                };
                Ok(Value::Collection(CollectionValue {
                    role: fetch.role.clone(),
                    owner_key: Box::new(owner_key.clone()),
                    state,
                }))
            }
            Fetch::Discriminated(fetch) => {
                let discriminator = read_column(row, fetch.discriminator_position)?;
                if discriminator.is_null() {
                    return Ok(Value::Null);
                }
                let value = discriminator.to_string();
                let entity = fetch
                    .targets
                    .iter()
                    .find(|(candidate, _)| *candidate == value)
                    .map(|(_, entity)| entity.clone())
                    .ok_or_else(|| MappingError::UnknownDiscriminator {
                        role: fetch.role.clone(),
                        value: value.clone(),
                    })?;
                let key = fetch.key_type.coerce(read_column(row, fetch.key_position)?)?;
                if key.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::EntityRef(EntityRef {
                    entity,
                    key: Box::new(key),
                }))
            }
        }
    }

    /// Visit this fetch and everything below it, depth-first.
    pub fn visit(&self, visitor: &mut dyn FnMut(&Fetch)) {
        visitor(self);
        match self {
            Fetch::Embeddable(fetch) => fetch.fetches.iter().for_each(|f| f.visit(visitor)),
            Fetch::EntityReference(fetch) => fetch.key.visit(visitor),
            Fetch::Collection(fetch) => {
                if let Some(index) = &fetch.index {
                    index.visit(visitor);
                }
                if let Some(element) = &fetch.element {
                    element.visit(visitor);
                }
            }
            Fetch::Basic(_) | Fetch::Discriminated(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::types::JdbcType;

    fn basic(path: &NavigablePath, name: &str, position: usize, value_type: ValueType) -> Fetch {
        Fetch::Basic(BasicFetch {
            path: path.append(name),
            name: name.to_string(),
            position,
            basic_type: BasicType::new(value_type, JdbcType::Other),
        })
    }

    #[test]
    fn test_entity_with_null_reference_and_delayed_collection() {
        let root = NavigablePath::root("Order");
        let result = DomainResult::Entity(EntityResult {
            path: root.clone(),
            entity: "Order".to_string(),
            table_alias: "o1_0".to_string(),
            identifier: Box::new(basic(&root, "id", 0, ValueType::Long)),
            fetches: vec![
                Fetch::EntityReference(EntityReferenceFetch {
                    path: root.append("customer"),
                    name: "customer".to_string(),
                    entity: "Customer".to_string(),
                    table_alias: Some("c1_0".to_string()),
                    key: Box::new(basic(&root.append("customer"), "id", 1, ValueType::Long)),
                    timing: FetchTiming::Delayed,
                }),
                Fetch::Collection(CollectionFetch {
                    path: root.append("tags"),
                    name: "tags".to_string(),
                    role: "Order.tags".to_string(),
                    timing: FetchTiming::Delayed,
                    table_alias: None,
                    element: None,
                    index: None,
                }),
            ],
        });

        let value = result.assemble(&[Value::Int(5), Value::Null]).unwrap();
        let Value::Entity(order) = value else {
            panic!("expected entity");
        };
        assert_eq!(*order.id, Value::Long(5));
        assert_eq!(order.attributes["customer"], Value::Null);
        assert_eq!(
            order.attributes["tags"],
            Value::Collection(CollectionValue {
                role: "Order.tags".to_string(),
                owner_key: Box::new(Value::Long(5)),
                state: CollectionState::Delayed,
            })
        );
    }

    #[test]
    fn test_null_identifier_yields_null_entity() {
        let root = NavigablePath::root("Order");
        let result = DomainResult::Entity(EntityResult {
            path: root.clone(),
            entity: "Order".to_string(),
            table_alias: "o1_0".to_string(),
            identifier: Box::new(basic(&root, "id", 0, ValueType::Long)),
            fetches: vec![],
        });
        assert_eq!(result.assemble(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_discriminated_fetch_resolves_target() {
        let root = NavigablePath::root("Order");
        let fetch = Fetch::Discriminated(DiscriminatedFetch {
            path: root.append("payment"),
            name: "payment".to_string(),
            role: "Order.payment".to_string(),
            discriminator_position: 0,
            key_position: 1,
            key_type: ValueType::Long,
            targets: vec![
                ("CARD".to_string(), "CardPayment".to_string()),
                ("WIRE".to_string(), "WirePayment".to_string()),
            ],
            timing: FetchTiming::Immediate,
        });

        let value = fetch
            .assemble(&[Value::text("WIRE"), Value::Int(9)], &Value::Null)
            .unwrap();
        assert_eq!(
            value,
            Value::EntityRef(EntityRef {
                entity: "WirePayment".to_string(),
                key: Box::new(Value::Long(9)),
            })
        );

        let err = fetch
            .assemble(&[Value::text("CASH"), Value::Int(9)], &Value::Null)
            .unwrap_err();
        assert!(matches!(err, MappingError::UnknownDiscriminator { .. }));
    }

    #[test]
    fn test_composite_of_nulls_is_null() {
        let root = NavigablePath::root("Order");
        let fetch = Fetch::Embeddable(EmbeddableFetch {
            path: root.append("address"),
            name: "address".to_string(),
            fetches: vec![
                basic(&root.append("address"), "city", 0, ValueType::String),
                basic(&root.append("address"), "zip", 1, ValueType::String),
            ],
        });
        assert_eq!(
            fetch.assemble(&[Value::Null, Value::Null], &Value::Null).unwrap(),
            Value::Null
        );
        let Value::Composite(values) = fetch
            .assemble(&[Value::text("Oslo"), Value::Null], &Value::Null)
            .unwrap()
        else {
            panic!("expected composite");
        };
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["city", "zip"]);
    }
}
