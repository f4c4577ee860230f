use serde::Serialize;

use crate::domain_model::fetchable::{create_table_group_join, generate_fetch};
use crate::domain_model::model_part::{ModelPartKind, ModelPartRef};
use crate::navigable_path::NavigablePath;
use crate::results::builders::unsupported;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::errors::MappingError;
use crate::results::graph::Fetch;
use crate::sql::table_group::JoinType;

/// Polymorphic association; the concrete target is picked per row from the
/// discriminator. No children: the possible targets belong to the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitDiscriminatedFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
}

impl ImplicitDiscriminatedFetchBuilder {
    pub fn new(fetch_path: &NavigablePath, part: &ModelPartRef) -> Result<Self, MappingError> {
        if !matches!(part.kind(), ModelPartKind::Discriminated(_)) {
            return Err(unsupported(part, "as an any-association"));
        }
        Ok(ImplicitDiscriminatedFetchBuilder {
            fetch_path: fetch_path.clone(),
            part: part.clone(),
        })
    }

    pub fn fetch_path(&self) -> &NavigablePath {
        &self.fetch_path
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
    }

    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        let timing = match self.part.kind() {
            ModelPartKind::Discriminated(any) => any.timing,
            _ => return Err(unsupported(&self.part, "as an any-association")),
        };
        let part = &self.part;
        state.resolve_table_group(fetch_path, Some(parent_path), &mut |parent, aliases| {
            create_table_group_join(part, fetch_path, parent, JoinType::Inner, true, aliases)
        })?;
        generate_fetch(&self.part, fetch_path, parent_path, timing, false, state)
    }
}
