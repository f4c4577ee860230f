use serde::Serialize;

use crate::domain_model::fetchable::generate_fetch;
use crate::domain_model::model_part::{FetchTiming, ModelPartKind, ModelPartRef};
use crate::navigable_path::NavigablePath;
use crate::results::builders::unsupported;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::errors::MappingError;
use crate::results::graph::Fetch;

/// Entity-valued collection element or map key. Always read immediately as
/// part of the collection row; a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitEntityPartFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
}

impl ImplicitEntityPartFetchBuilder {
    pub fn new(fetch_path: &NavigablePath, part: &ModelPartRef) -> Result<Self, MappingError> {
        if !matches!(part.kind(), ModelPartKind::EntityCollectionPart(_)) {
            return Err(unsupported(part, "as an entity collection part"));
        }
        Ok(ImplicitEntityPartFetchBuilder {
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
        generate_fetch(
            &self.part,
            fetch_path,
            parent_path,
            FetchTiming::Immediate,
            true,
            state,
        )
    }
}
