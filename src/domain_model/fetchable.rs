//! What the domain model contributes when a part is materialized
//!
//! Builders decide *which* parts are read; these functions know *how* each
//! part classification maps onto joins and columns: the join a part needs,
//! the fetch for parts whose reading the model owns (collections,
//! any-associations, entity-valued collection parts) and root results for
//! basic parts.

use crate::domain_model::model_part::{FetchTiming, ModelPart, ModelPartKind, ModelPartRef};
use crate::domain_model::EntityMapping;
use crate::navigable_path::NavigablePath;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::errors::MappingError;
use crate::results::graph::{
    BasicFetch, BasicResult, CollectionFetch, DiscriminatedFetch, DomainResult, EmbeddableFetch,
    EntityReferenceFetch, Fetch,
};
use crate::sql::selection::ColumnLocator;
use crate::sql::table_group::{
    AliasGenerator, ColumnRef, JoinPredicate, JoinType, TableGroup, TableGroupCreation,
    TableGroupJoin, TableGroupKind,
};

fn unsupported(part: &ModelPart, context: &str) -> MappingError {
    MappingError::UnsupportedPart {
        role: part.role().to_string(),
        context: context.to_string(),
    }
}

/// Root table group of an entity result.
pub fn create_root_table_group(
    entity: &EntityMapping,
    path: &NavigablePath,
    aliases: &mut AliasGenerator,
) -> TableGroupCreation {
    TableGroupCreation::Root(TableGroup {
        path: path.clone(),
        table: entity.table().to_string(),
        alias: aliases.next_alias(entity.table()),
        kind: TableGroupKind::Root,
    })
}

fn joined(
    path: &NavigablePath,
    table: &str,
    join_type: JoinType,
    fetched: bool,
    aliases: &mut AliasGenerator,
    pairs: impl Fn(&str) -> Vec<(ColumnRef, ColumnRef)>,
) -> TableGroupCreation {
    let alias = aliases.next_alias(table);
    TableGroupCreation::Join(TableGroupJoin {
        join_type,
        predicate: Some(JoinPredicate {
            pairs: pairs(&alias),
        }),
        joined_group: TableGroup {
            path: path.clone(),
            table: table.to_string(),
            alias,
            kind: TableGroupKind::Joined,
        },
        fetched,
    })
}

fn virtual_group(path: &NavigablePath, parent: &TableGroup) -> TableGroupCreation {
    TableGroupCreation::Join(TableGroupJoin {
        join_type: JoinType::Inner,
        predicate: None,
        joined_group: TableGroup {
            path: path.clone(),
            table: parent.table.clone(),
            alias: parent.alias.clone(),
            kind: TableGroupKind::Virtual,
        },
        fetched: false,
    })
}

fn column_pairs(
    lhs_alias: &str,
    lhs_columns: &[String],
    rhs_alias: &str,
    rhs_columns: &[String],
) -> Vec<(ColumnRef, ColumnRef)> {
    lhs_columns
        .iter()
        .zip(rhs_columns)
        .map(|(lhs, rhs)| (ColumnRef::new(lhs_alias, lhs), ColumnRef::new(rhs_alias, rhs)))
        .collect()
}

/// Create the table group `part` needs below `parent`.
///
/// To-one associations and entity-valued collection parts join the target
/// table on the foreign key; collections join their collection table;
/// embeddables stored in a secondary table join it. Inline embeddables and
/// any-associations get a virtual group sharing the parent's alias.
pub fn create_table_group_join(
    part: &ModelPart,
    path: &NavigablePath,
    parent: Option<&TableGroup>,
    join_type: JoinType,
    fetched: bool,
    aliases: &mut AliasGenerator,
) -> Result<TableGroupCreation, MappingError> {
    let parent = parent.ok_or_else(|| MappingError::MissingTableGroup(path.full_path()))?;
    let creation = match part.kind() {
        ModelPartKind::Embedded(embedded) => match &embedded.secondary_table {
            Some(secondary) => joined(path, &secondary.table, join_type, fetched, aliases, |alias| {
                column_pairs(alias, &secondary.key_columns, &parent.alias, &secondary.owner_columns)
            }),
            None => virtual_group(path, parent),
        },
        ModelPartKind::EntityValued(to_one) => {
            let fk = &to_one.foreign_key;
            let key_columns = fk.key_columns();
            joined(path, &fk.target_table, join_type, fetched, aliases, |alias| {
                column_pairs(alias, &fk.target_columns, &parent.alias, &key_columns)
            })
        }
        ModelPartKind::EntityCollectionPart(collection_part) => {
            let fk = &collection_part.foreign_key;
            let key_columns = fk.key_columns();
            joined(path, &fk.target_table, join_type, fetched, aliases, |alias| {
                column_pairs(alias, &fk.target_columns, &parent.alias, &key_columns)
            })
        }
        ModelPartKind::Plural(plural) => {
            joined(path, &plural.collection_table, join_type, fetched, aliases, |alias| {
                column_pairs(alias, &plural.key_columns, &parent.alias, &plural.owner_columns)
            })
        }
        ModelPartKind::Discriminated(_) => virtual_group(path, parent),
        ModelPartKind::Basic(_) => return Err(unsupported(part, "as a join target")),
    };
    Ok(creation)
}

/// Fetch reading a basic part from the column `locator` names.
pub fn basic_fetch(
    part: &ModelPart,
    path: &NavigablePath,
    locator: &ColumnLocator,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    let basic = part
        .as_basic()
        .ok_or_else(|| unsupported(part, "as a single column"))?;
    let selection = state.resolve_selection(locator, Some(basic.value_type))?;
    Ok(Fetch::Basic(BasicFetch {
        path: path.clone(),
        name: part.name().to_string(),
        position: selection.values_array_position,
        basic_type: selection.basic_type,
    }))
}

/// Fetch reading a key-shaped part (basic or composite) by column label.
pub fn key_fetch(
    key_part: &ModelPartRef,
    path: &NavigablePath,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    match key_part.kind() {
        ModelPartKind::Basic(basic) => {
            let locator = ColumnLocator::name(basic.column_label(key_part.name()));
            basic_fetch(key_part, path, &locator, state)
        }
        ModelPartKind::Embedded(embedded) => {
            let mut fetches = Vec::with_capacity(embedded.sub_parts.len());
            for sub in &embedded.sub_parts {
                fetches.push(key_fetch(sub, &path.append(sub.name()), state)?);
            }
            Ok(Fetch::Embeddable(EmbeddableFetch {
                path: path.clone(),
                name: key_part.name().to_string(),
                fetches,
            }))
        }
        _ => Err(unsupported(key_part, "as a key")),
    }
}

/// Fetch for a part whose reading the domain model owns.
///
/// Delayed plural parts produce a collection reference with no join.
/// Any-associations read discriminator and key.
/// Entity-valued collection parts join their target and read its key.
pub fn generate_fetch(
    part: &ModelPartRef,
    fetch_path: &NavigablePath,
    parent_path: &NavigablePath,
    timing: FetchTiming,
    is_collection_fetch: bool,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    log::trace!(
        "Generating {} fetch for {} ({:?}, collection fetch: {})",
        part.kind_name(),
        fetch_path,
        timing,
        is_collection_fetch
    );
    match part.kind() {
        // Immediate collections read element and index through their builders
        ModelPartKind::Plural(_) if timing == FetchTiming::Delayed => {
            Ok(Fetch::Collection(CollectionFetch {
                path: fetch_path.clone(),
                name: part.name().to_string(),
                role: part.role().to_string(),
                timing,
                table_alias: None,
                element: None,
                index: None,
            }))
        }
        ModelPartKind::Discriminated(any) => {
            let discriminator =
                state.resolve_selection(&ColumnLocator::name(&any.discriminator_column), None)?;
            let key = state.resolve_selection(&ColumnLocator::name(&any.key_column), Some(any.key_type))?;
            Ok(Fetch::Discriminated(DiscriminatedFetch {
                path: fetch_path.clone(),
                name: part.name().to_string(),
                role: part.role().to_string(),
                discriminator_position: discriminator.values_array_position,
                key_position: key.values_array_position,
                key_type: any.key_type,
                targets: any
                    .targets
                    .iter()
                    .map(|t| (t.value.clone(), t.entity.clone()))
                    .collect(),
                timing,
            }))
        }
        ModelPartKind::EntityCollectionPart(collection_part) => {
            let group = state.resolve_table_group(
                fetch_path,
                Some(parent_path),
                &mut |parent, aliases| {
                    create_table_group_join(part, fetch_path, parent, JoinType::Inner, true, aliases)
                },
            )?;
            let key_part = &collection_part.foreign_key.key_part;
            let key = key_fetch(key_part, &fetch_path.append(key_part.name()), state)?;
            Ok(Fetch::EntityReference(EntityReferenceFetch {
                path: fetch_path.clone(),
                name: part.name().to_string(),
                entity: collection_part.target_entity.clone(),
                table_alias: Some(group.alias),
                key: Box::new(key),
                timing,
            }))
        }
        _ => Err(unsupported(part, "through the domain model fetch contract")),
    }
}

/// Root result for a basic part living in `table_group`.
pub fn create_domain_result(
    part: &ModelPart,
    path: &NavigablePath,
    table_group: &TableGroup,
    state: &mut DomainResultCreationState<'_>,
) -> Result<DomainResult, MappingError> {
    let basic = part
        .as_basic()
        .ok_or_else(|| unsupported(part, "as a basic result"))?;
    log::trace!(
        "Basic result {} read from table group {}",
        path,
        table_group.alias
    );
    let selection = state.resolve_selection(
        &ColumnLocator::name(basic.column_label(part.name())),
        Some(basic.value_type),
    )?;
    Ok(DomainResult::Basic(BasicResult {
        path: path.clone(),
        column_label: selection.column_label,
        position: selection.values_array_position,
        basic_type: selection.basic_type,
    }))
}
