use std::sync::Arc;

use serde::Serialize;

use crate::domain_model::fetchable::basic_fetch;
use crate::domain_model::model_part::ModelPartRef;
use crate::navigable_path::NavigablePath;
use crate::results::builders::{unsupported, CacheKeyCopy, FetchBuilder};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::Fetch;
use crate::sql::selection::ColumnLocator;

/// Single-column attribute without an explicit mapping of its own.
///
/// The resolver is asked once, at construction; an explicit builder found
/// then becomes the delegate and replaces column resolution entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitBasicFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    delegate: Option<Arc<FetchBuilder>>,
}

impl ImplicitBasicFetchBuilder {
    pub fn new(
        fetch_path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        if part.as_basic().is_none() {
            return Err(unsupported(part, "as a basic attribute"));
        }
        Ok(ImplicitBasicFetchBuilder {
            fetch_path: fetch_path.clone(),
            part: part.clone(),
            delegate: ctx.resolve_explicit(part)?,
        })
    }

    pub fn fetch_path(&self) -> &NavigablePath {
        &self.fetch_path
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
    }

    pub fn delegate(&self) -> Option<&Arc<FetchBuilder>> {
        self.delegate.as_ref()
    }

    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        if let Some(delegate) = &self.delegate {
            return delegate.build_fetch(parent_path, fetch_path, state);
        }
        let basic = self
            .part
            .as_basic()
            .ok_or_else(|| unsupported(&self.part, "as a basic attribute"))?;
        let locator = ColumnLocator::name(basic.column_label(self.part.name()));
        basic_fetch(&self.part, fetch_path, &locator, state)
    }
}

impl CacheKeyCopy for ImplicitBasicFetchBuilder {
    fn cache_key_copy(&self) -> Self {
        ImplicitBasicFetchBuilder {
            fetch_path: self.fetch_path.clone(),
            part: self.part.clone(),
            delegate: self
                .delegate
                .as_ref()
                .map(|delegate| Arc::new(delegate.cache_key_copy())),
        }
    }
}
