/// Domain model definitions.
///
/// Models are defined in YAML (or JSON) with the following structure:
///
/// ```yaml
/// name: shop
/// entities:
///   - name: Order
///     table: orders
///     id: { kind: basic, name: id, column: id, type: long }
///     attributes:
///       - { kind: basic, name: total, column: total, type: decimal }
///       - { kind: to_one, name: customer, target: Customer, columns: [customer_id] }
///       - kind: plural
///         name: tags
///         table: order_tags
///         key_columns: [order_id]
///         element: { kind: basic, column: tag, type: string }
///       - kind: any
///         name: payment
///         discriminator_column: payment_type
///         key_column: payment_id
///         key_type: long
///         targets: { CARD: CardPayment, WIRE: WirePayment }
/// ```
///
/// Building a definition assigns every part its role and checks that
/// associations point at known entities with matching key arity.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::errors::DomainModelError;
use super::model_part::{
    BasicPart, CollectionPartNature, DiscriminatedPart, DiscriminatorTarget, EmbeddedPart,
    EntityCollectionPart, FetchTiming, ForeignKeyDescriptor, ModelPart, ModelPartKind,
    ModelPartRef, PluralPart, SecondaryTable, ToOnePart,
};
use super::types::{JdbcType, ValueType};
use super::{DomainModel, EntityMapping};
use crate::navigable_path::{ELEMENT_SEGMENT, FOREIGN_KEY_SEGMENT, INDEX_SEGMENT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainModelDefinition {
    pub name: String,
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub id: AttributeDefinition,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeDefinition {
    Basic {
        name: String,
        /// Defaults to the attribute name
        #[serde(default)]
        column: Option<String>,
        /// SQL fragment; makes this a computed attribute
        #[serde(default)]
        formula: Option<String>,
        #[serde(rename = "type")]
        value_type: ValueType,
        #[serde(default)]
        jdbc_type: Option<JdbcType>,
    },
    Embedded {
        name: String,
        #[serde(default)]
        secondary_table: Option<SecondaryTableDefinition>,
        attributes: Vec<AttributeDefinition>,
    },
    ToOne {
        name: String,
        target: String,
        columns: Vec<String>,
        #[serde(default)]
        referenced_property: Option<String>,
        #[serde(default)]
        fetch: FetchTiming,
    },
    Plural {
        name: String,
        table: String,
        key_columns: Vec<String>,
        /// Defaults to the owner's identifier columns
        #[serde(default)]
        owner_columns: Option<Vec<String>>,
        element: CollectionPartDefinition,
        #[serde(default)]
        index: Option<CollectionPartDefinition>,
        #[serde(default)]
        fetch: FetchTiming,
    },
    Any {
        name: String,
        discriminator_column: String,
        key_column: String,
        key_type: ValueType,
        targets: IndexMap<String, String>,
        #[serde(default)]
        fetch: FetchTiming,
    },
}

impl AttributeDefinition {
    pub fn name(&self) -> &str {
        match self {
            AttributeDefinition::Basic { name, .. }
            | AttributeDefinition::Embedded { name, .. }
            | AttributeDefinition::ToOne { name, .. }
            | AttributeDefinition::Plural { name, .. }
            | AttributeDefinition::Any { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryTableDefinition {
    pub table: String,
    pub key_columns: Vec<String>,
    /// Defaults to the owner's identifier columns
    #[serde(default)]
    pub owner_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionPartDefinition {
    Basic {
        column: String,
        #[serde(rename = "type")]
        value_type: ValueType,
        #[serde(default)]
        jdbc_type: Option<JdbcType>,
    },
    Embedded {
        attributes: Vec<AttributeDefinition>,
    },
    Entity {
        target: String,
        columns: Vec<String>,
    },
}

impl DomainModelDefinition {
    /// Build and validate the domain model.
    pub fn build(&self) -> Result<DomainModel, DomainModelError> {
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(DomainModelError::DuplicateEntity(entity.name.clone()));
            }
        }

        let mut assembler = ModelAssembler::default();

        // First pass: identifiers and plain (basic/embedded) attributes, which
        // are everything a foreign key can point at.
        for entity in &self.entities {
            assembler.register_key_candidates(entity)?;
        }

        let mut model = DomainModel::new(self.name.clone());
        for entity in &self.entities {
            let mapping = assembler.build_entity(entity)?;
            model.add_entity(mapping)?;
        }

        log::debug!(
            "Built domain model '{}' with {} entities",
            self.name,
            self.entities.len()
        );
        Ok(model)
    }
}

/// Plain parts of one entity, available before associations are built
struct KeyCandidates {
    table: String,
    identifier: ModelPartRef,
    attributes: Vec<ModelPartRef>,
}

impl KeyCandidates {
    fn find(&self, name: &str) -> Option<&ModelPartRef> {
        if self.identifier.name() == name {
            return Some(&self.identifier);
        }
        self.attributes.iter().find(|p| p.name() == name)
    }
}

#[derive(Default)]
struct ModelAssembler {
    candidates: HashMap<String, KeyCandidates>,
}

impl ModelAssembler {
    fn register_key_candidates(&mut self, entity: &EntityDefinition) -> Result<(), DomainModelError> {
        let identifier = self.build_plain(&entity.name, &entity.table, &entity.id)?.ok_or_else(|| {
            DomainModelError::InvalidAttribute {
                role: format!("{}.{}", entity.name, entity.id.name()),
                reason: "identifiers must be basic or embedded".to_string(),
            }
        })?;

        let mut attributes = Vec::new();
        for attribute in &entity.attributes {
            if let Some(part) = self.build_plain(&entity.name, &entity.table, attribute)? {
                attributes.push(part);
            }
        }

        self.candidates.insert(
            entity.name.clone(),
            KeyCandidates {
                table: entity.table.clone(),
                identifier,
                attributes,
            },
        );
        Ok(())
    }

    /// Build a basic or embedded part that contains no associations.
    fn build_plain(
        &self,
        owner_role: &str,
        table: &str,
        definition: &AttributeDefinition,
    ) -> Result<Option<ModelPartRef>, DomainModelError> {
        let role = format!("{}.{}", owner_role, definition.name());
        match definition {
            AttributeDefinition::Basic {
                name,
                column,
                formula,
                value_type,
                jdbc_type,
            } => Ok(Some(basic_part(name, role, table, column, formula, *value_type, *jdbc_type))),
            AttributeDefinition::Embedded {
                name,
                secondary_table,
                attributes,
            } => {
                if secondary_table.is_some() {
                    return Ok(None);
                }
                let mut sub_parts = Vec::with_capacity(attributes.len());
                for sub in attributes {
                    match self.build_plain(&role, table, sub)? {
                        Some(part) => sub_parts.push(part),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Arc::new(ModelPart::new(
                    name.clone(),
                    role,
                    ModelPartKind::Embedded(EmbeddedPart {
                        sub_parts,
                        secondary_table: None,
                    }),
                ))))
            }
            _ => Ok(None),
        }
    }

    fn build_entity(&self, entity: &EntityDefinition) -> Result<EntityMapping, DomainModelError> {
        let candidates = self
            .candidates
            .get(&entity.name)
            .ok_or_else(|| DomainModelError::UnknownEntity(entity.name.clone()))?;
        let identifier = candidates.identifier.clone();

        let mut names = HashSet::new();
        names.insert(identifier.name().to_string());
        let mut attributes = Vec::with_capacity(entity.attributes.len());
        for attribute in &entity.attributes {
            if !names.insert(attribute.name().to_string()) {
                return Err(DomainModelError::DuplicateAttribute {
                    owner: entity.name.clone(),
                    attribute: attribute.name().to_string(),
                });
            }
            let owner = Owner {
                role: &entity.name,
                table: &entity.table,
                identifier: &identifier,
            };
            attributes.push(self.build_attribute(&owner, attribute)?);
        }

        Ok(EntityMapping::new(
            entity.name.clone(),
            entity.table.clone(),
            identifier,
            attributes,
        ))
    }

    fn build_attribute(
        &self,
        owner: &Owner<'_>,
        definition: &AttributeDefinition,
    ) -> Result<ModelPartRef, DomainModelError> {
        let role = format!("{}.{}", owner.role, definition.name());
        let part = match definition {
            AttributeDefinition::Basic {
                name,
                column,
                formula,
                value_type,
                jdbc_type,
            } => basic_part(name, role, owner.table, column, formula, *value_type, *jdbc_type),
            AttributeDefinition::Embedded {
                name,
                secondary_table,
                attributes,
            } => {
                let secondary = secondary_table.as_ref().map(|def| SecondaryTable {
                    table: def.table.clone(),
                    key_columns: def.key_columns.clone(),
                    owner_columns: def
                        .owner_columns
                        .clone()
                        .unwrap_or_else(|| leaf_columns(owner.identifier)),
                });
                let table = secondary.as_ref().map_or(owner.table, |s| s.table.as_str());
                let nested_owner = Owner {
                    role: &role,
                    table,
                    identifier: owner.identifier,
                };
                let mut sub_parts = Vec::with_capacity(attributes.len());
                let mut names = HashSet::new();
                for sub in attributes {
                    if !names.insert(sub.name()) {
                        return Err(DomainModelError::DuplicateAttribute {
                            owner: role.clone(),
                            attribute: sub.name().to_string(),
                        });
                    }
                    sub_parts.push(self.build_attribute(&nested_owner, sub)?);
                }
                Arc::new(ModelPart::new(
                    name.clone(),
                    role,
                    ModelPartKind::Embedded(EmbeddedPart {
                        sub_parts,
                        secondary_table: secondary,
                    }),
                ))
            }
            AttributeDefinition::ToOne {
                name,
                target,
                columns,
                referenced_property,
                fetch,
            } => {
                let foreign_key =
                    self.foreign_key(&role, owner.table, target, referenced_property.as_deref(), columns)?;
                Arc::new(ModelPart::new(
                    name.clone(),
                    role,
                    ModelPartKind::EntityValued(ToOnePart {
                        target_entity: target.clone(),
                        referenced_property: referenced_property.clone(),
                        foreign_key,
                        timing: *fetch,
                    }),
                ))
            }
            AttributeDefinition::Plural {
                name,
                table,
                key_columns,
                owner_columns,
                element,
                index,
                fetch,
            } => {
                let element_part = self.build_collection_part(
                    &role,
                    table,
                    owner.identifier,
                    CollectionPartNature::Element,
                    element,
                )?;
                let index_part = index
                    .as_ref()
                    .map(|def| {
                        self.build_collection_part(
                            &role,
                            table,
                            owner.identifier,
                            CollectionPartNature::Index,
                            def,
                        )
                    })
                    .transpose()?;
                Arc::new(ModelPart::new(
                    name.clone(),
                    role,
                    ModelPartKind::Plural(PluralPart {
                        collection_table: table.clone(),
                        key_columns: key_columns.clone(),
                        owner_columns: owner_columns
                            .clone()
                            .unwrap_or_else(|| leaf_columns(owner.identifier)),
                        element: element_part,
                        index: index_part,
                        timing: *fetch,
                    }),
                ))
            }
            AttributeDefinition::Any {
                name,
                discriminator_column,
                key_column,
                key_type,
                targets,
                fetch,
            } => {
                if targets.is_empty() {
                    return Err(DomainModelError::NoDiscriminatorTargets(role));
                }
                for entity in targets.values() {
                    if !self.candidates.contains_key(entity) {
                        return Err(DomainModelError::UnknownEntity(entity.clone()));
                    }
                }
                Arc::new(ModelPart::new(
                    name.clone(),
                    role,
                    ModelPartKind::Discriminated(DiscriminatedPart {
                        table: owner.table.to_string(),
                        discriminator_column: discriminator_column.clone(),
                        key_column: key_column.clone(),
                        key_type: *key_type,
                        targets: targets
                            .iter()
                            .map(|(value, entity)| DiscriminatorTarget {
                                value: value.clone(),
                                entity: entity.clone(),
                            })
                            .collect(),
                        timing: *fetch,
                    }),
                ))
            }
        };
        Ok(part)
    }

    fn build_collection_part(
        &self,
        collection_role: &str,
        collection_table: &str,
        owner_identifier: &ModelPartRef,
        nature: CollectionPartNature,
        definition: &CollectionPartDefinition,
    ) -> Result<ModelPartRef, DomainModelError> {
        let segment = match nature {
            CollectionPartNature::Element => ELEMENT_SEGMENT,
            CollectionPartNature::Index => INDEX_SEGMENT,
        };
        let role = format!("{}.{}", collection_role, segment);
        let part = match definition {
            CollectionPartDefinition::Basic {
                column,
                value_type,
                jdbc_type,
            } => basic_part(
                segment,
                role,
                collection_table,
                &Some(column.clone()),
                &None,
                *value_type,
                *jdbc_type,
            ),
            CollectionPartDefinition::Embedded { attributes } => {
                let owner = Owner {
                    role: &role,
                    table: collection_table,
                    identifier: owner_identifier,
                };
                let mut sub_parts = Vec::with_capacity(attributes.len());
                for sub in attributes {
                    let sub_part = self.build_attribute(&owner, sub)?;
                    check_collection_element_part(&sub_part)?;
                    sub_parts.push(sub_part);
                }
                Arc::new(ModelPart::new(
                    segment,
                    role,
                    ModelPartKind::Embedded(EmbeddedPart {
                        sub_parts,
                        secondary_table: None,
                    }),
                ))
            }
            CollectionPartDefinition::Entity { target, columns } => {
                let foreign_key = self.foreign_key(&role, collection_table, target, None, columns)?;
                Arc::new(ModelPart::new(
                    segment,
                    role,
                    ModelPartKind::EntityCollectionPart(EntityCollectionPart {
                        nature,
                        target_entity: target.clone(),
                        foreign_key,
                    }),
                ))
            }
        };
        Ok(part)
    }

    /// Describe a foreign key from `key_table.columns` to the target's key.
    fn foreign_key(
        &self,
        role: &str,
        key_table: &str,
        target: &str,
        referenced_property: Option<&str>,
        columns: &[String],
    ) -> Result<ForeignKeyDescriptor, DomainModelError> {
        let candidates = self
            .candidates
            .get(target)
            .ok_or_else(|| DomainModelError::UnknownEntity(target.to_string()))?;

        let target_key = match referenced_property {
            None => candidates.identifier.clone(),
            Some(dotted) => {
                let unknown = || DomainModelError::UnknownAttribute {
                    owner: target.to_string(),
                    attribute: dotted.to_string(),
                };
                let mut segments = dotted.split('.');
                let first = segments.next().ok_or_else(unknown)?;
                let mut current = candidates.find(first).ok_or_else(unknown)?.clone();
                for segment in segments {
                    current = current.find_sub_part(segment).ok_or_else(unknown)?.clone();
                }
                current
            }
        };

        let target_leaves = target_key.basic_leaves();
        if target_leaves.len() != columns.len() {
            return Err(DomainModelError::ForeignKeyArity {
                role: role.to_string(),
                expected: target_leaves.len(),
                actual: columns.len(),
            });
        }

        let fk_role = format!("{}.{}", role, FOREIGN_KEY_SEGMENT);
        let mut remaining = columns.iter();
        let key_part = rebind_columns(&target_key, &fk_role, key_table, &mut remaining);

        Ok(ForeignKeyDescriptor {
            key_table: key_table.to_string(),
            key_part,
            target_table: candidates.table.clone(),
            target_columns: target_leaves
                .iter()
                .filter_map(|leaf| leaf.as_basic().map(|b| b.selection_expression.clone()))
                .collect(),
        })
    }
}

struct Owner<'a> {
    role: &'a str,
    table: &'a str,
    identifier: &'a ModelPartRef,
}

fn basic_part(
    name: &str,
    role: String,
    table: &str,
    column: &Option<String>,
    formula: &Option<String>,
    value_type: ValueType,
    jdbc_type: Option<JdbcType>,
) -> ModelPartRef {
    let (selection_expression, is_formula) = match formula {
        Some(fragment) => (fragment.clone(), true),
        None => (column.clone().unwrap_or_else(|| name.to_string()), false),
    };
    Arc::new(ModelPart::new(
        name,
        role,
        ModelPartKind::Basic(BasicPart {
            table: table.to_string(),
            selection_expression,
            is_formula,
            value_type,
            jdbc_type: jdbc_type.unwrap_or_else(|| value_type.default_jdbc_type()),
        }),
    ))
}

fn leaf_columns(part: &ModelPartRef) -> Vec<String> {
    part.basic_leaves()
        .iter()
        .filter_map(|leaf| leaf.as_basic().map(|b| b.selection_expression.clone()))
        .collect()
}

/// Copy the shape of `template` under `role`, taking columns from `columns`
/// in leaf order.
fn rebind_columns<'a>(
    template: &ModelPartRef,
    role: &str,
    table: &str,
    columns: &mut impl Iterator<Item = &'a String>,
) -> ModelPartRef {
    match template.kind() {
        ModelPartKind::Embedded(embedded) => {
            let sub_parts = embedded
                .sub_parts
                .iter()
                .map(|sub| {
                    let sub_role = format!("{}.{}", role, sub.name());
                    rebind_columns(sub, &sub_role, table, columns)
                })
                .collect();
            Arc::new(ModelPart::new(
                template.name(),
                role,
                ModelPartKind::Embedded(EmbeddedPart {
                    sub_parts,
                    secondary_table: None,
                }),
            ))
        }
        ModelPartKind::Basic(basic) => {
            let column = columns
                .next()
                .cloned()
                .unwrap_or_else(|| basic.selection_expression.clone());
            Arc::new(ModelPart::new(
                template.name(),
                role,
                ModelPartKind::Basic(BasicPart {
                    table: table.to_string(),
                    selection_expression: column,
                    is_formula: false,
                    value_type: basic.value_type,
                    jdbc_type: basic.jdbc_type,
                }),
            ))
        }
        // Key candidates are only ever basic or embedded
        _ => template.clone(),
    }
}

/// Collection elements are read from the collection row: neither nested
/// collections nor any-associations can appear in them, at any depth.
fn check_collection_element_part(part: &ModelPartRef) -> Result<(), DomainModelError> {
    let reason = match part.kind() {
        ModelPartKind::Plural(_) => "collections cannot nest inside collection elements",
        ModelPartKind::Discriminated(_) => {
            "any-associations cannot appear inside collection elements"
        }
        ModelPartKind::Embedded(embedded) => {
            return embedded
                .sub_parts
                .iter()
                .try_for_each(check_collection_element_part)
        }
        _ => return Ok(()),
    };
    Err(DomainModelError::InvalidAttribute {
        role: part.role().to_string(),
        reason: reason.to_string(),
    })
}
