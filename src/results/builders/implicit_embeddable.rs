use serde::Serialize;

use crate::domain_model::fetchable::create_table_group_join;
use crate::domain_model::model_part::ModelPartRef;
use crate::navigable_path::NavigablePath;
use crate::results::builders::{fetch_builder_for, unsupported, CacheKeyCopy, FetchBuilderMap};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::{EmbeddableFetch, Fetch};
use crate::sql::table_group::JoinType;

/// Composite attribute: one child builder per sub-attribute, in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitEmbeddableFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
    children: FetchBuilderMap,
}

impl ImplicitEmbeddableFetchBuilder {
    pub fn new(
        fetch_path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        Ok(ImplicitEmbeddableFetchBuilder {
            fetch_path: fetch_path.clone(),
            part: part.clone(),
            children: embeddable_children(fetch_path, part, ctx)?,
        })
    }

    pub fn fetch_path(&self) -> &NavigablePath {
        &self.fetch_path
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
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
        resolve_embeddable_table_group(&self.part, fetch_path, parent_path, state)?;
        Ok(Fetch::Embeddable(EmbeddableFetch {
            path: fetch_path.clone(),
            name: self.part.name().to_string(),
            fetches: build_children(&self.children, fetch_path, state)?,
        }))
    }
}

impl CacheKeyCopy for ImplicitEmbeddableFetchBuilder {
    fn cache_key_copy(&self) -> Self {
        ImplicitEmbeddableFetchBuilder {
            fetch_path: self.fetch_path.clone(),
            part: self.part.clone(),
            children: self.children.cache_key_copy(),
        }
    }
}

/// Child builders of a composite part, resolver first, in declaration order.
pub(crate) fn embeddable_children(
    path: &NavigablePath,
    part: &ModelPartRef,
    ctx: &mut BuilderContext<'_>,
) -> Result<FetchBuilderMap, MappingError> {
    let embedded = part
        .as_embedded()
        .ok_or_else(|| unsupported(part, "as an embeddable"))?;
    let mut children = FetchBuilderMap::new();
    for sub in &embedded.sub_parts {
        let child = fetch_builder_for(&path.append(sub.name()), sub, ctx)?;
        children.insert(sub.clone(), child);
    }
    Ok(children)
}

/// The composite's own group: virtual for inline storage, a join for a
/// secondary table.
pub(crate) fn resolve_embeddable_table_group(
    part: &ModelPartRef,
    path: &NavigablePath,
    parent_path: &NavigablePath,
    state: &mut DomainResultCreationState<'_>,
) -> Result<(), MappingError> {
    state.resolve_table_group(path, Some(parent_path), &mut |parent, aliases| {
        create_table_group_join(part, path, parent, JoinType::Inner, true, aliases)
    })?;
    Ok(())
}

/// Fetches for `children`, each attached below `path`.
pub(crate) fn build_children(
    children: &FetchBuilderMap,
    path: &NavigablePath,
    state: &mut DomainResultCreationState<'_>,
) -> Result<Vec<Fetch>, MappingError> {
    children
        .iter()
        .map(|(part, child)| child.build_fetch(path, &path.append(part.name()), state))
        .collect()
}
