//! State threaded through the two phases of building a mapping
//!
//! `BuilderContext` is used while synthesizing the builder tree: it carries
//! the domain model, the caller's resolver and the registry that makes a
//! (path, part) pair map to one shared builder. `DomainResultCreationState`
//! is used while turning builders into result/fetch nodes against live row
//! metadata and a table-group resolver.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain_model::model_part::ModelPartRef;
use crate::domain_model::types::{TypeRegistry, ValueType};
use crate::domain_model::DomainModel;
use crate::navigable_path::NavigablePath;
use crate::results::builders::resolver::FetchBuilderResolver;
use crate::results::builders::FetchBuilder;
use crate::results::errors::MappingError;
use crate::sql::jdbc_metadata::JdbcValuesMetadata;
use crate::sql::selection::{ColumnLocator, SqlSelection, SqlSelectionRegistry};
use crate::sql::table_group::{TableGroup, TableGroupCreator, TableGroupResolver};

pub const DEFAULT_MAX_FETCH_DEPTH: usize = 16;

/// Construction-phase context for one plan.
pub struct BuilderContext<'a> {
    model: &'a DomainModel,
    resolver: &'a dyn FetchBuilderResolver,
    max_fetch_depth: usize,
    shared: HashMap<(NavigablePath, String), Arc<FetchBuilder>>,
}

impl<'a> BuilderContext<'a> {
    pub fn new(model: &'a DomainModel, resolver: &'a dyn FetchBuilderResolver) -> Self {
        BuilderContext {
            model,
            resolver,
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
            shared: HashMap::new(),
        }
    }

    pub fn with_max_fetch_depth(mut self, max_fetch_depth: usize) -> Self {
        self.max_fetch_depth = max_fetch_depth;
        self
    }

    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    /// Ask the caller's resolver for an explicit builder for `part`.
    /// Resolver errors are returned as-is.
    pub fn resolve_explicit(
        &self,
        part: &ModelPartRef,
    ) -> Result<Option<Arc<FetchBuilder>>, MappingError> {
        let explicit = self.resolver.resolve(part)?;
        if explicit.is_some() {
            log::trace!("Explicit fetch builder registered for {}", part.role());
        }
        Ok(explicit.map(|builder| Arc::new(FetchBuilder::Explicit(builder))))
    }

    pub fn check_depth(&self, path: &NavigablePath) -> Result<(), MappingError> {
        if path.depth() > self.max_fetch_depth {
            return Err(MappingError::FetchDepthExceeded {
                path: path.full_path(),
                max: self.max_fetch_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn shared_builder(
        &self,
        path: &NavigablePath,
        part: &ModelPartRef,
    ) -> Option<Arc<FetchBuilder>> {
        self.shared
            .get(&(path.clone(), part.role().to_string()))
            .cloned()
    }

    pub(crate) fn register_builder(
        &mut self,
        path: &NavigablePath,
        part: &ModelPartRef,
        builder: Arc<FetchBuilder>,
    ) {
        self.shared
            .insert((path.clone(), part.role().to_string()), builder);
    }

    /// Number of distinct (path, part) builders created so far
    pub fn builder_count(&self) -> usize {
        self.shared.len()
    }
}

/// Materialization-phase state for one statement.
pub struct DomainResultCreationState<'a> {
    model: &'a DomainModel,
    jdbc: &'a dyn JdbcValuesMetadata,
    types: &'a TypeRegistry,
    from_clause: &'a mut dyn TableGroupResolver,
    selections: SqlSelectionRegistry,
    allow_positional_selections: bool,
}

impl<'a> DomainResultCreationState<'a> {
    pub fn new(
        model: &'a DomainModel,
        jdbc: &'a dyn JdbcValuesMetadata,
        types: &'a TypeRegistry,
        from_clause: &'a mut dyn TableGroupResolver,
    ) -> Self {
        DomainResultCreationState {
            model,
            jdbc,
            types,
            from_clause,
            selections: SqlSelectionRegistry::new(),
            allow_positional_selections: true,
        }
    }

    pub fn with_positional_selections(mut self, allowed: bool) -> Self {
        self.allow_positional_selections = allowed;
        self
    }

    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    pub fn jdbc(&self) -> &'a dyn JdbcValuesMetadata {
        self.jdbc
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Entity and embeddable roots bind columns by name only.
    pub fn disallow_positional_selections(&mut self) {
        self.allow_positional_selections = false;
    }

    pub fn allows_positional_selections(&self) -> bool {
        self.allow_positional_selections
    }

    /// Register the column `locator` names and return its selection.
    pub fn resolve_selection(
        &mut self,
        locator: &ColumnLocator,
        fallback: Option<ValueType>,
    ) -> Result<SqlSelection, MappingError> {
        let position = match locator {
            ColumnLocator::Name(label) => self.jdbc.resolve_column_position(label)?,
            ColumnLocator::Position(position) => {
                if !self.allow_positional_selections {
                    return Err(MappingError::PositionalSelectionNotAllowed {
                        position: *position,
                    });
                }
                *position
            }
        };
        self.resolve_selection_at(position, fallback)
    }

    /// Register the column at a 1-based position regardless of the
    /// positional-selection setting.
    pub fn resolve_selection_at(
        &mut self,
        position: usize,
        fallback: Option<ValueType>,
    ) -> Result<SqlSelection, MappingError> {
        let label = self.jdbc.resolve_column_name(position)?;
        let basic_type = self.jdbc.resolve_type(position, fallback, self.types)?;
        Ok(self.selections.resolve(position, &label, basic_type))
    }

    pub fn find_table_group(&self, path: &NavigablePath) -> Option<TableGroup> {
        self.from_clause.find_table_group(path).cloned()
    }

    pub fn resolve_table_group(
        &mut self,
        path: &NavigablePath,
        parent_path: Option<&NavigablePath>,
        create: &mut TableGroupCreator<'_>,
    ) -> Result<TableGroup, MappingError> {
        self.from_clause.resolve_or_create(path, parent_path, create)
    }

    pub fn selections(&self) -> &SqlSelectionRegistry {
        &self.selections
    }

    pub fn into_selections(self) -> SqlSelectionRegistry {
        self.selections
    }
}
