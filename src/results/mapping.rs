//! Result-set mappings and their resolution against row metadata
//!
//! A `ResultSetMapping` holds the root builder of a query. Resolving it
//! against the metadata of an executed statement yields a
//! `JdbcValuesMapping`: the selected columns plus the root result node that
//! the row reader runs once per row.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::domain_model::types::{TypeRegistry, ValueType};
use crate::domain_model::DomainModel;
use crate::results::builders::{
    CacheKeyCopy, FetchBuilderResolver, ResultBuilder,
};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::DomainResult;
use crate::sql::jdbc_metadata::JdbcValuesMetadata;
use crate::sql::selection::SqlSelection;
use crate::sql::table_group::TableGroupResolver;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ResultSetMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    root: Option<ResultBuilder>,
}

impl ResultSetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        ResultSetMapping {
            name: Some(name.into()),
            root: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declare the root result. A mapping has exactly one.
    pub fn add_result_builder(&mut self, builder: ResultBuilder) -> Result<(), MappingError> {
        if self.root.is_some() {
            return Err(MappingError::MultipleRootResults);
        }
        self.root = Some(builder);
        Ok(())
    }

    pub fn with_result_builder(mut self, builder: ResultBuilder) -> Result<Self, MappingError> {
        self.add_result_builder(builder)?;
        Ok(self)
    }

    pub fn result_builder(&self) -> Option<&ResultBuilder> {
        self.root.as_ref()
    }

    /// Implicit mapping of a whole entity, honouring the caller's explicit
    /// builders.
    pub fn for_entity(
        model: &DomainModel,
        entity_name: &str,
        resolver: &dyn FetchBuilderResolver,
        config: &EngineConfig,
    ) -> Result<Self, MappingError> {
        let mut ctx =
            BuilderContext::new(model, resolver).with_max_fetch_depth(config.max_fetch_depth);
        let root = ResultBuilder::entity(entity_name, &mut ctx)?;
        log::debug!(
            "Implicit mapping for {} built with {} fetch builders",
            entity_name,
            ctx.builder_count()
        );
        ResultSetMapping::named(entity_name).with_result_builder(root)
    }

    /// Mapping of a single scalar column
    pub fn for_result_class(result_type: ValueType) -> Self {
        ResultSetMapping {
            name: None,
            root: Some(ResultBuilder::result_class(result_type)),
        }
    }

    pub fn resolve(
        &self,
        jdbc: &dyn JdbcValuesMetadata,
        model: &DomainModel,
        from_clause: &mut dyn TableGroupResolver,
        config: &EngineConfig,
    ) -> Result<JdbcValuesMapping, MappingError> {
        self.resolve_with_types(jdbc, model, TypeRegistry::shared(), from_clause, config)
    }

    /// Build the root result node against `jdbc`, registering table groups
    /// in `from_clause`.
    pub fn resolve_with_types(
        &self,
        jdbc: &dyn JdbcValuesMetadata,
        model: &DomainModel,
        types: &TypeRegistry,
        from_clause: &mut dyn TableGroupResolver,
        config: &EngineConfig,
    ) -> Result<JdbcValuesMapping, MappingError> {
        let root = self.root.as_ref().ok_or(MappingError::MissingRootResult)?;
        let mut state = DomainResultCreationState::new(model, jdbc, types, from_clause)
            .with_positional_selections(config.allow_positional_selections);
        let result = root.build_result(0, &mut state)?;
        let selections = state.into_selections().selections();
        log::debug!(
            "Resolved mapping {} against {} columns: {} selections",
            self.name.as_deref().unwrap_or("<anonymous>"),
            jdbc.column_count(),
            selections.len()
        );
        Ok(JdbcValuesMapping {
            selections,
            result,
            column_count: jdbc.column_count(),
        })
    }
}

impl CacheKeyCopy for ResultSetMapping {
    fn cache_key_copy(&self) -> Self {
        ResultSetMapping {
            name: self.name.clone(),
            root: self.root.as_ref().map(CacheKeyCopy::cache_key_copy),
        }
    }
}

/// A mapping bound to the columns of one result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JdbcValuesMapping {
    pub selections: Vec<SqlSelection>,
    pub result: DomainResult,
    pub column_count: usize,
}
