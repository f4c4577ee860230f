use serde::Serialize;

use crate::domain_model::fetchable::{create_table_group_join, key_fetch};
use crate::domain_model::model_part::{ModelPartKind, ModelPartRef, ToOnePart};
use crate::navigable_path::NavigablePath;
use crate::results::builders::{fetch_builder_for, unsupported, CacheKeyCopy, FetchBuilderMap};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::{EmbeddableFetch, EntityReferenceFetch, Fetch};
use crate::sql::table_group::JoinType;

/// To-one association read as a key-only reference to the target entity.
///
/// The key part is the target identifier, or the part named by the
/// association's referenced property. An explicit builder for the
/// association replaces key handling and is kept as the only child, keyed by
/// the association part. Composite keys get one child per key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitEntityFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
    key_path: NavigablePath,
    children: FetchBuilderMap,
}

fn to_one(part: &ModelPartRef) -> Result<&ToOnePart, MappingError> {
    match part.kind() {
        ModelPartKind::EntityValued(to_one) => Ok(to_one),
        _ => Err(unsupported(part, "as a to-one association")),
    }
}

impl ImplicitEntityFetchBuilder {
    pub fn new(
        fetch_path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        let association = to_one(part)?;
        let target = ctx.model().entity(&association.target_entity)?;
        let key_part = match &association.referenced_property {
            None => target.identifier(),
            Some(dotted) => target.resolve_property_path(dotted)?,
        };
        let key_path = fetch_path.append(key_part.name());

        let mut children = FetchBuilderMap::new();
        if let Some(explicit) = ctx.resolve_explicit(part)? {
            children.insert(part.clone(), explicit);
        } else if association.foreign_key.is_composite() {
            let fk_key = &association.foreign_key.key_part;
            if let Some(embedded) = fk_key.as_embedded() {
                for component in &embedded.sub_parts {
                    let child = fetch_builder_for(&key_path.append(component.name()), component, ctx)?;
                    children.insert(component.clone(), child);
                }
            }
        }

        log::trace!(
            "Entity fetch builder for {} keyed by {} ({} children)",
            fetch_path,
            key_part.role(),
            children.len()
        );
        Ok(ImplicitEntityFetchBuilder {
            fetch_path: fetch_path.clone(),
            part: part.clone(),
            key_path,
            children,
        })
    }

    pub fn fetch_path(&self) -> &NavigablePath {
        &self.fetch_path
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
    }

    pub fn key_path(&self) -> &NavigablePath {
        &self.key_path
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        let association = to_one(&self.part)?;
        let part = &self.part;
        let group = state.resolve_table_group(fetch_path, Some(parent_path), &mut |parent, aliases| {
            create_table_group_join(part, fetch_path, parent, JoinType::Inner, true, aliases)
        })?;

        if let Some(delegate) = self.children.get(&self.part) {
            return delegate.build_fetch(parent_path, fetch_path, state);
        }

        let fk_key = &association.foreign_key.key_part;
        let key_path = fetch_path.append(fk_key.name());
        let key = if self.children.is_empty() {
            key_fetch(fk_key, &key_path, state)?
        } else {
            // Components are read from the referring row; their groups hang
            // off the association's group.
            let mut fetches = Vec::with_capacity(self.children.len());
            for (component, child) in self.children.iter() {
                fetches.push(child.build_fetch(
                    fetch_path,
                    &key_path.append(component.name()),
                    state,
                )?);
            }
            Fetch::Embeddable(EmbeddableFetch {
                path: key_path,
                name: fk_key.name().to_string(),
                fetches,
            })
        };

        Ok(Fetch::EntityReference(EntityReferenceFetch {
            path: fetch_path.clone(),
            name: self.part.name().to_string(),
            entity: association.target_entity.clone(),
            table_alias: Some(group.alias),
            key: Box::new(key),
            timing: association.timing,
        }))
    }
}

impl CacheKeyCopy for ImplicitEntityFetchBuilder {
    fn cache_key_copy(&self) -> Self {
        ImplicitEntityFetchBuilder {
            fetch_path: self.fetch_path.clone(),
            part: self.part.clone(),
            key_path: self.key_path.clone(),
            children: self.children.cache_key_copy(),
        }
    }
}
