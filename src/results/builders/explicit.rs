//! Explicit fetch builders: a part bound to caller-named columns.

use std::slice;

use serde::Serialize;

use crate::domain_model::fetchable::{basic_fetch, create_table_group_join};
use crate::domain_model::model_part::{FetchTiming, ModelPartKind, ModelPartRef};
use crate::navigable_path::NavigablePath;
use crate::results::builders::unsupported;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::errors::MappingError;
use crate::results::graph::{DiscriminatedFetch, EmbeddableFetch, EntityReferenceFetch, Fetch};
use crate::sql::selection::ColumnLocator;
use crate::sql::table_group::JoinType;

/// Columns are consumed in the part's leaf order: one for a basic part, one
/// per leaf for an embeddable, one per foreign-key column for an entity
/// reference and `[discriminator, key]` for an any-association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExplicitFetchBuilder {
    part: ModelPartRef,
    columns: Vec<ColumnLocator>,
}

impl ExplicitFetchBuilder {
    pub fn new(part: ModelPartRef, columns: Vec<ColumnLocator>) -> Self {
        ExplicitFetchBuilder { part, columns }
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
    }

    pub fn columns(&self) -> &[ColumnLocator] {
        &self.columns
    }

    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        let expected = column_span(&self.part)?;
        if expected != self.columns.len() {
            return Err(MappingError::ColumnCountMismatch {
                role: self.part.role().to_string(),
                expected,
                actual: self.columns.len(),
            });
        }
        let mut columns = self.columns.iter();
        part_fetch(&self.part, parent_path, fetch_path, &mut columns, state)
    }
}

fn column_span(part: &ModelPartRef) -> Result<usize, MappingError> {
    match part.kind() {
        ModelPartKind::Embedded(embedded) => embedded
            .sub_parts
            .iter()
            .map(column_span)
            .sum::<Result<usize, MappingError>>(),
        ModelPartKind::Plural(_) => Err(unsupported(part, "with explicit columns")),
        _ => Ok(part.column_span()),
    }
}

fn next_column<'c>(
    part: &ModelPartRef,
    columns: &mut slice::Iter<'c, ColumnLocator>,
) -> Result<&'c ColumnLocator, MappingError> {
    columns.next().ok_or_else(|| MappingError::ColumnCountMismatch {
        role: part.role().to_string(),
        expected: part.column_span(),
        actual: 0,
    })
}

fn part_fetch(
    part: &ModelPartRef,
    parent_path: &NavigablePath,
    path: &NavigablePath,
    columns: &mut slice::Iter<'_, ColumnLocator>,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    match part.kind() {
        ModelPartKind::Basic(_) => {
            let locator = next_column(part, columns)?;
            basic_fetch(part, path, locator, state)
        }
        ModelPartKind::Embedded(embedded) => {
            state.resolve_table_group(path, Some(parent_path), &mut |parent, aliases| {
                create_table_group_join(part, path, parent, JoinType::Inner, true, aliases)
            })?;
            let mut fetches = Vec::with_capacity(embedded.sub_parts.len());
            for sub in &embedded.sub_parts {
                fetches.push(part_fetch(sub, path, &path.append(sub.name()), columns, state)?);
            }
            Ok(Fetch::Embeddable(EmbeddableFetch {
                path: path.clone(),
                name: part.name().to_string(),
                fetches,
            }))
        }
        ModelPartKind::EntityValued(to_one) => reference_fetch(
            part,
            &to_one.target_entity,
            &to_one.foreign_key.key_part,
            to_one.timing,
            parent_path,
            path,
            columns,
            state,
        ),
        ModelPartKind::EntityCollectionPart(collection_part) => reference_fetch(
            part,
            &collection_part.target_entity,
            &collection_part.foreign_key.key_part,
            FetchTiming::Immediate,
            parent_path,
            path,
            columns,
            state,
        ),
        ModelPartKind::Discriminated(any) => {
            state.resolve_table_group(path, Some(parent_path), &mut |parent, aliases| {
                create_table_group_join(part, path, parent, JoinType::Inner, true, aliases)
            })?;
            let discriminator = state.resolve_selection(next_column(part, columns)?, None)?;
            let key = state.resolve_selection(next_column(part, columns)?, Some(any.key_type))?;
            Ok(Fetch::Discriminated(DiscriminatedFetch {
                path: path.clone(),
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
                timing: any.timing,
            }))
        }
        ModelPartKind::Plural(_) => Err(unsupported(part, "with explicit columns")),
    }
}

#[allow(clippy::too_many_arguments)]
fn reference_fetch(
    part: &ModelPartRef,
    entity: &str,
    key_part: &ModelPartRef,
    timing: FetchTiming,
    parent_path: &NavigablePath,
    path: &NavigablePath,
    columns: &mut slice::Iter<'_, ColumnLocator>,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    let group = state.resolve_table_group(path, Some(parent_path), &mut |parent, aliases| {
        create_table_group_join(part, path, parent, JoinType::Inner, true, aliases)
    })?;
    let key = key_fetch(key_part, &path.append(key_part.name()), columns, state)?;
    Ok(Fetch::EntityReference(EntityReferenceFetch {
        path: path.clone(),
        name: part.name().to_string(),
        entity: entity.to_string(),
        table_alias: Some(group.alias),
        key: Box::new(key),
        timing,
    }))
}

/// Key parts never need table groups of their own.
fn key_fetch(
    key_part: &ModelPartRef,
    path: &NavigablePath,
    columns: &mut slice::Iter<'_, ColumnLocator>,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Fetch, MappingError> {
    match key_part.kind() {
        ModelPartKind::Embedded(embedded) => {
            let mut fetches = Vec::with_capacity(embedded.sub_parts.len());
            for sub in &embedded.sub_parts {
                fetches.push(key_fetch(sub, &path.append(sub.name()), columns, state)?);
            }
            Ok(Fetch::Embeddable(EmbeddableFetch {
                path: path.clone(),
                name: key_part.name().to_string(),
                fetches,
            }))
        }
        _ => {
            let locator = next_column(key_part, columns)?;
            basic_fetch(key_part, path, locator, state)
        }
    }
}
