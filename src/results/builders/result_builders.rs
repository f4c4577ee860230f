//! Builders for the single root result of a mapping

use std::sync::Arc;

use serde::Serialize;

use crate::domain_model::fetchable::{create_domain_result, create_root_table_group};
use crate::domain_model::model_part::{ModelPartKind, ModelPartRef};
use crate::domain_model::types::ValueType;
use crate::navigable_path::NavigablePath;
use crate::results::builders::implicit_embeddable::{
    build_children, embeddable_children, resolve_embeddable_table_group,
};
use crate::results::builders::{
    fetch_builder_for, unsupported, CacheKeyCopy, FetchBuilder, FetchBuilderMap,
};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::{BasicResult, DomainResult, EmbeddableResult, EntityResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "builder", rename_all = "snake_case")]
pub enum ResultBuilder {
    Basic(ImplicitBasicResultBuilder),
    Embeddable(ImplicitEmbeddableResultBuilder),
    Entity(ImplicitEntityResultBuilder),
    ResultClass(ImplicitResultClassBuilder),
}

impl ResultBuilder {
    /// Root entity result with implicit builders for every attribute.
    pub fn entity(entity_name: &str, ctx: &mut BuilderContext<'_>) -> Result<Self, MappingError> {
        Ok(ResultBuilder::Entity(ImplicitEntityResultBuilder::new(
            entity_name,
            ctx,
        )?))
    }

    /// Root result for a basic or embedded part of an owner whose table
    /// group the caller registers.
    pub fn model_part(
        path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        match part.kind() {
            ModelPartKind::Basic(_) => Ok(ResultBuilder::Basic(ImplicitBasicResultBuilder::new(
                path, part,
            ))),
            ModelPartKind::Embedded(_) => Ok(ResultBuilder::Embeddable(
                ImplicitEmbeddableResultBuilder::new(path, part, ctx)?,
            )),
            _ => Err(unsupported(part, "as a root result")),
        }
    }

    /// Whole-row scalar of the given type read from the first column.
    pub fn result_class(result_type: ValueType) -> Self {
        ResultBuilder::ResultClass(ImplicitResultClassBuilder::new(result_type))
    }

    pub fn navigable_path(&self) -> Option<&NavigablePath> {
        match self {
            ResultBuilder::Basic(b) => Some(&b.path),
            ResultBuilder::Embeddable(b) => Some(&b.path),
            ResultBuilder::Entity(b) => Some(&b.path),
            ResultBuilder::ResultClass(_) => None,
        }
    }

    pub fn build_result(
        &self,
        result_position: usize,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult, MappingError> {
        match self {
            ResultBuilder::Basic(b) => b.build_result(state),
            ResultBuilder::Embeddable(b) => b.build_result(state),
            ResultBuilder::Entity(b) => b.build_result(state),
            ResultBuilder::ResultClass(b) => b.build_result(result_position, state),
        }
    }

    /// Visit direct child builders; for entities the identifier comes first.
    pub fn visit_fetch_builders(&self, visitor: &mut dyn FnMut(&ModelPartRef, &Arc<FetchBuilder>)) {
        match self {
            ResultBuilder::Embeddable(b) => {
                b.children.iter().for_each(|(part, child)| visitor(part, child))
            }
            ResultBuilder::Entity(b) => {
                visitor(b.identifier.model_part(), &b.identifier);
                b.children.iter().for_each(|(part, child)| visitor(part, child))
            }
            ResultBuilder::Basic(_) | ResultBuilder::ResultClass(_) => {}
        }
    }
}

impl CacheKeyCopy for ResultBuilder {
    fn cache_key_copy(&self) -> Self {
        match self {
            ResultBuilder::Basic(b) => ResultBuilder::Basic(b.clone()),
            ResultBuilder::Embeddable(b) => ResultBuilder::Embeddable(ImplicitEmbeddableResultBuilder {
                path: b.path.clone(),
                part: b.part.clone(),
                children: b.children.cache_key_copy(),
            }),
            ResultBuilder::Entity(b) => ResultBuilder::Entity(ImplicitEntityResultBuilder {
                path: b.path.clone(),
                entity: b.entity.clone(),
                identifier: Arc::new(b.identifier.cache_key_copy()),
                children: b.children.cache_key_copy(),
            }),
            ResultBuilder::ResultClass(b) => ResultBuilder::ResultClass(b.clone()),
        }
    }
}

/// Scalar result read from the owner's table group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitBasicResultBuilder {
    path: NavigablePath,
    part: ModelPartRef,
}

impl ImplicitBasicResultBuilder {
    pub fn new(path: &NavigablePath, part: &ModelPartRef) -> Self {
        ImplicitBasicResultBuilder {
            path: path.clone(),
            part: part.clone(),
        }
    }

    fn build_result(
        &self,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult, MappingError> {
        let parent_path = self
            .path
            .parent()
            .ok_or_else(|| MappingError::MissingTableGroup(self.path.full_path()))?;
        let group = state
            .find_table_group(parent_path)
            .ok_or_else(|| MappingError::MissingTableGroup(parent_path.full_path()))?;
        create_domain_result(&self.part, &self.path, &group, state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitEmbeddableResultBuilder {
    path: NavigablePath,
    part: ModelPartRef,
    children: FetchBuilderMap,
}

impl ImplicitEmbeddableResultBuilder {
    pub fn new(
        path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        Ok(ImplicitEmbeddableResultBuilder {
            path: path.clone(),
            part: part.clone(),
            children: embeddable_children(path, part, ctx)?,
        })
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    fn build_result(
        &self,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult, MappingError> {
        state.disallow_positional_selections();
        let parent_path = self
            .path
            .parent()
            .ok_or_else(|| MappingError::MissingTableGroup(self.path.full_path()))?;
        resolve_embeddable_table_group(&self.part, &self.path, parent_path, state)?;
        Ok(DomainResult::Embeddable(EmbeddableResult {
            path: self.path.clone(),
            fetches: build_children(&self.children, &self.path, state)?,
        }))
    }
}

/// Root entity: the identifier builder plus one builder per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitEntityResultBuilder {
    path: NavigablePath,
    entity: String,
    identifier: Arc<FetchBuilder>,
    children: FetchBuilderMap,
}

impl ImplicitEntityResultBuilder {
    pub fn new(entity_name: &str, ctx: &mut BuilderContext<'_>) -> Result<Self, MappingError> {
        let entity = ctx.model().entity(entity_name)?;
        let path = NavigablePath::root(entity.name());
        let id = entity.identifier();
        let identifier = fetch_builder_for(&path.append(id.name()), id, ctx)?;

        let mut children = FetchBuilderMap::new();
        for attribute in entity.attributes() {
            let child = fetch_builder_for(&path.append(attribute.name()), attribute, ctx)?;
            children.insert(attribute.clone(), child);
        }
        log::debug!(
            "Built implicit entity result for {} with {} attribute builders",
            entity.name(),
            children.len()
        );
        Ok(ImplicitEntityResultBuilder {
            path,
            entity: entity.name().to_string(),
            identifier,
            children,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn identifier(&self) -> &Arc<FetchBuilder> {
        &self.identifier
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    fn build_result(
        &self,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult, MappingError> {
        state.disallow_positional_selections();
        let entity = state.model().entity(&self.entity)?;
        let path = &self.path;
        let group = state.resolve_table_group(path, None, &mut |_, aliases| {
            Ok(create_root_table_group(entity, path, aliases))
        })?;

        let id_part = self.identifier.model_part();
        let identifier = self
            .identifier
            .build_fetch(path, &path.append(id_part.name()), state)?;
        let fetches = build_children(&self.children, path, state)?;
        Ok(DomainResult::Entity(EntityResult {
            path: path.clone(),
            entity: self.entity.clone(),
            table_alias: group.alias,
            identifier: Box::new(identifier),
            fetches,
        }))
    }
}

/// Whole-row scalar of a caller-supplied type, with no model part behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitResultClassBuilder {
    result_type: ValueType,
}

impl ImplicitResultClassBuilder {
    pub fn new(result_type: ValueType) -> Self {
        ImplicitResultClassBuilder { result_type }
    }

    pub fn result_type(&self) -> ValueType {
        self.result_type
    }

    fn build_result(
        &self,
        result_position: usize,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult, MappingError> {
        if result_position != 0 {
            return Err(MappingError::NonZeroResultPosition(result_position));
        }
        let selection = state.resolve_selection_at(1, Some(self.result_type))?;
        Ok(DomainResult::Basic(BasicResult {
            path: NavigablePath::root(selection.column_label.clone()),
            column_label: selection.column_label,
            position: selection.values_array_position,
            basic_type: selection.basic_type,
        }))
    }
}
