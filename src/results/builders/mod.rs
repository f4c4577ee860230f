//! Result and fetch builders
//!
//! A builder describes how one position of the result graph is read. The
//! caller may supply explicit builders through a [`FetchBuilderResolver`];
//! every other position gets an implicit builder synthesized from the
//! domain model classification of its part.
//!
//! Builder trees are immutable once constructed. Two equality notions apply:
//! derived structural equality (path, part role, ordered children), and
//! [`CacheKeyCopy`], which produces a detached deep copy suitable for storing
//! in the plan cache.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain_model::model_part::{ModelPartKind, ModelPartRef};
use crate::navigable_path::NavigablePath;
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::Fetch;

pub mod explicit;
pub mod implicit_basic;
pub mod implicit_discriminated;
pub mod implicit_embeddable;
pub mod implicit_entity;
pub mod implicit_entity_part;
pub mod implicit_plural;
pub mod resolver;
pub mod result_builders;
pub mod visitor;

pub use explicit::ExplicitFetchBuilder;
pub use implicit_basic::ImplicitBasicFetchBuilder;
pub use implicit_discriminated::ImplicitDiscriminatedFetchBuilder;
pub use implicit_embeddable::ImplicitEmbeddableFetchBuilder;
pub use implicit_entity::ImplicitEntityFetchBuilder;
pub use implicit_entity_part::ImplicitEntityPartFetchBuilder;
pub use implicit_plural::ImplicitPluralFetchBuilder;
pub use resolver::{ExplicitMappings, FetchBuilderResolver, NoExplicitMappings};
pub use result_builders::{
    ImplicitBasicResultBuilder, ImplicitEmbeddableResultBuilder, ImplicitEntityResultBuilder,
    ImplicitResultClassBuilder, ResultBuilder,
};
pub use visitor::{collect_fetch_paths, walk_fetch_builders};

/// Detached structural copy used as (part of) a plan cache key.
///
/// The copy shares nothing mutable with the original and carries no
/// statement state; copies of structurally equal trees compare equal.
pub trait CacheKeyCopy {
    fn cache_key_copy(&self) -> Self;
}

/// Child builders keyed by part, in domain-model declaration order.
///
/// Equality and hashing respect insertion order: the order mirrors physical
/// column order for composite reads.
#[derive(Debug, Clone, Default)]
pub struct FetchBuilderMap {
    entries: IndexMap<ModelPartRef, Arc<FetchBuilder>>,
}

impl FetchBuilderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, part: ModelPartRef, builder: Arc<FetchBuilder>) {
        self.entries.insert(part, builder);
    }

    pub fn get(&self, part: &ModelPartRef) -> Option<&Arc<FetchBuilder>> {
        self.entries.get(part)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelPartRef, &Arc<FetchBuilder>)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModelPartRef> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FetchBuilderMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((part_a, a), (part_b, b))| part_a == part_b && a == b)
    }
}

impl Eq for FetchBuilderMap {}

impl Hash for FetchBuilderMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (part, builder) in &self.entries {
            part.hash(state);
            builder.hash(state);
        }
    }
}

impl CacheKeyCopy for FetchBuilderMap {
    fn cache_key_copy(&self) -> Self {
        FetchBuilderMap {
            entries: self
                .entries
                .iter()
                .map(|(part, builder)| (part.clone(), Arc::new(builder.cache_key_copy())))
                .collect(),
        }
    }
}

impl Serialize for FetchBuilderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (part, builder) in &self.entries {
            map.serialize_entry(part.role(), builder.as_ref())?;
        }
        map.end()
    }
}

/// Closed set of fetch builder variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "builder", rename_all = "snake_case")]
pub enum FetchBuilder {
    Explicit(ExplicitFetchBuilder),
    Basic(ImplicitBasicFetchBuilder),
    Embeddable(ImplicitEmbeddableFetchBuilder),
    Entity(ImplicitEntityFetchBuilder),
    EntityPart(ImplicitEntityPartFetchBuilder),
    Plural(ImplicitPluralFetchBuilder),
    Discriminated(ImplicitDiscriminatedFetchBuilder),
}

impl FetchBuilder {
    pub fn model_part(&self) -> &ModelPartRef {
        match self {
            FetchBuilder::Explicit(b) => b.part(),
            FetchBuilder::Basic(b) => b.part(),
            FetchBuilder::Embeddable(b) => b.part(),
            FetchBuilder::Entity(b) => b.part(),
            FetchBuilder::EntityPart(b) => b.part(),
            FetchBuilder::Plural(b) => b.part(),
            FetchBuilder::Discriminated(b) => b.part(),
        }
    }

    /// Path the builder was synthesized for; explicit builders have none.
    pub fn fetch_path(&self) -> Option<&NavigablePath> {
        match self {
            FetchBuilder::Explicit(_) => None,
            FetchBuilder::Basic(b) => Some(b.fetch_path()),
            FetchBuilder::Embeddable(b) => Some(b.fetch_path()),
            FetchBuilder::Entity(b) => Some(b.fetch_path()),
            FetchBuilder::EntityPart(b) => Some(b.fetch_path()),
            FetchBuilder::Plural(b) => Some(b.fetch_path()),
            FetchBuilder::Discriminated(b) => Some(b.fetch_path()),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, FetchBuilder::Explicit(_))
    }

    /// Produce the fetch node for `fetch_path`, attached below `parent_path`.
    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        match self {
            FetchBuilder::Explicit(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::Basic(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::Embeddable(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::Entity(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::EntityPart(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::Plural(b) => b.build_fetch(parent_path, fetch_path, state),
            FetchBuilder::Discriminated(b) => b.build_fetch(parent_path, fetch_path, state),
        }
    }

    /// Visit direct child builders, including explicit delegates.
    pub fn visit_fetch_builders(&self, visitor: &mut dyn FnMut(&ModelPartRef, &Arc<FetchBuilder>)) {
        match self {
            FetchBuilder::Basic(b) => {
                if let Some(delegate) = b.delegate() {
                    visitor(b.part(), delegate);
                }
            }
            FetchBuilder::Embeddable(b) => {
                b.children().iter().for_each(|(part, child)| visitor(part, child))
            }
            FetchBuilder::Entity(b) => {
                b.children().iter().for_each(|(part, child)| visitor(part, child))
            }
            FetchBuilder::Plural(b) => {
                b.children().iter().for_each(|(part, child)| visitor(part, child))
            }
            FetchBuilder::Explicit(_)
            | FetchBuilder::EntityPart(_)
            | FetchBuilder::Discriminated(_) => {}
        }
    }
}

impl CacheKeyCopy for FetchBuilder {
    fn cache_key_copy(&self) -> Self {
        match self {
            FetchBuilder::Explicit(b) => FetchBuilder::Explicit(b.clone()),
            FetchBuilder::Basic(b) => FetchBuilder::Basic(b.cache_key_copy()),
            FetchBuilder::Embeddable(b) => FetchBuilder::Embeddable(b.cache_key_copy()),
            FetchBuilder::Entity(b) => FetchBuilder::Entity(b.cache_key_copy()),
            FetchBuilder::EntityPart(b) => FetchBuilder::EntityPart(b.clone()),
            FetchBuilder::Plural(b) => FetchBuilder::Plural(b.cache_key_copy()),
            FetchBuilder::Discriminated(b) => FetchBuilder::Discriminated(b.clone()),
        }
    }
}

/// Builder for `part` at `path`: the caller's explicit builder when the
/// resolver has one, an implicit builder otherwise. A (path, part) pair
/// reached twice during one construction yields the same shared builder.
pub fn fetch_builder_for(
    path: &NavigablePath,
    part: &ModelPartRef,
    ctx: &mut BuilderContext<'_>,
) -> Result<Arc<FetchBuilder>, MappingError> {
    if let Some(existing) = ctx.shared_builder(path, part) {
        return Ok(existing);
    }
    let builder = match ctx.resolve_explicit(part)? {
        Some(explicit) => explicit,
        None => Arc::new(implicit_fetch_builder(path, part, ctx)?),
    };
    ctx.register_builder(path, part, builder.clone());
    Ok(builder)
}

/// Synthesize the implicit builder matching the classification of `part`.
pub fn implicit_fetch_builder(
    path: &NavigablePath,
    part: &ModelPartRef,
    ctx: &mut BuilderContext<'_>,
) -> Result<FetchBuilder, MappingError> {
    ctx.check_depth(path)?;
    log::trace!("Implicit {} fetch builder for {}", part.kind_name(), path);
    let builder = match part.kind() {
        ModelPartKind::Basic(_) => {
            FetchBuilder::Basic(ImplicitBasicFetchBuilder::new(path, part, ctx)?)
        }
        ModelPartKind::Embedded(_) => {
            FetchBuilder::Embeddable(ImplicitEmbeddableFetchBuilder::new(path, part, ctx)?)
        }
        ModelPartKind::EntityValued(_) => {
            FetchBuilder::Entity(ImplicitEntityFetchBuilder::new(path, part, ctx)?)
        }
        ModelPartKind::EntityCollectionPart(_) => {
            FetchBuilder::EntityPart(ImplicitEntityPartFetchBuilder::new(path, part)?)
        }
        ModelPartKind::Plural(_) => {
            FetchBuilder::Plural(ImplicitPluralFetchBuilder::new(path, part, ctx)?)
        }
        ModelPartKind::Discriminated(_) => {
            FetchBuilder::Discriminated(ImplicitDiscriminatedFetchBuilder::new(path, part)?)
        }
    };
    Ok(builder)
}

pub(crate) fn unsupported(part: &ModelPartRef, context: &str) -> MappingError {
    MappingError::UnsupportedPart {
        role: part.role().to_string(),
        context: context.to_string(),
    }
}
