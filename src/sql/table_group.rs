//! Table groups: the SQL join targets behind navigable paths
//!
//! Every path that needs physical table access gets exactly one table group
//! per statement. `FromClauseIndex` is the registry: asking it for a path a
//! second time hands back the group created the first time, so sibling
//! fetches that reach the same association share one join.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::navigable_path::NavigablePath;
use crate::results::errors::MappingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinType {
    Inner,
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "join"),
            JoinType::Left => write!(f, "left join"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableGroupKind {
    /// The FROM clause root
    Root,
    /// Backed by its own joined table
    Joined,
    /// Reuses the parent's table (inline embeddables, any-associations)
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGroup {
    pub path: NavigablePath,
    pub table: String,
    pub alias: String,
    pub kind: TableGroupKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: &str, column: &str) -> Self {
        ColumnRef {
            table_alias: table_alias.to_string(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_alias, self.column)
    }
}

/// Pairwise column equality between the two sides of a join
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPredicate {
    pub pairs: Vec<(ColumnRef, ColumnRef)>,
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (lhs, rhs)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{}={}", lhs, rhs)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGroupJoin {
    pub join_type: JoinType,
    pub joined_group: TableGroup,
    /// None for virtual groups
    pub predicate: Option<JoinPredicate>,
    /// Whether the joined data is read into the result
    pub fetched: bool,
}

/// What a table-group creator produced
#[derive(Debug, Clone)]
pub enum TableGroupCreation {
    Root(TableGroup),
    Join(TableGroupJoin),
}

/// Hands out unique SQL aliases per statement (`o1_0`, `o2_0`, `c1_0`).
#[derive(Debug, Default, Clone)]
pub struct AliasGenerator {
    counters: HashMap<String, usize>,
}

impl AliasGenerator {
    pub fn next_alias(&mut self, table: &str) -> String {
        let stem = table
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase().to_string())
            .unwrap_or_else(|| "t".to_string());
        let counter = self.counters.entry(stem.clone()).or_insert(0);
        *counter += 1;
        format!("{}{}_0", stem, counter)
    }
}

/// Callback creating a table group; receives the parent's group (None for roots).
pub type TableGroupCreator<'c> = dyn FnMut(Option<&TableGroup>, &mut AliasGenerator) -> Result<TableGroupCreation, MappingError>
    + 'c;

/// Registry of table groups for one statement.
pub trait TableGroupResolver {
    fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup>;

    /// Return the group registered for `path`, creating it through `create`
    /// exactly once when none exists yet.
    fn resolve_or_create(
        &mut self,
        path: &NavigablePath,
        parent_path: Option<&NavigablePath>,
        create: &mut TableGroupCreator<'_>,
    ) -> Result<TableGroup, MappingError>;
}

/// In-memory `TableGroupResolver` keeping groups and joins in creation order.
#[derive(Debug, Default, Clone)]
pub struct FromClauseIndex {
    groups: IndexMap<NavigablePath, TableGroup>,
    joins: Vec<TableGroupJoin>,
    aliases: AliasGenerator,
}

impl FromClauseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_groups(&self) -> impl Iterator<Item = &TableGroup> {
        self.groups.values()
    }

    pub fn joins(&self) -> &[TableGroupJoin] {
        &self.joins
    }

    /// Joins that add a table to the statement (virtual groups excluded)
    pub fn physical_join_count(&self) -> usize {
        self.joins
            .iter()
            .filter(|j| j.joined_group.kind != TableGroupKind::Virtual)
            .count()
    }

    /// Render the FROM clause, e.g. `orders o1_0 join customers c1_0 on c1_0.id=o1_0.customer_id`
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for group in self.groups.values().filter(|g| g.kind == TableGroupKind::Root) {
            if !sql.is_empty() {
                sql.push_str(", ");
            }
            sql.push_str(&format!("{} {}", group.table, group.alias));
        }
        for join in &self.joins {
            if let Some(predicate) = &join.predicate {
                sql.push_str(&format!(
                    " {} {} {} on {}",
                    join.join_type, join.joined_group.table, join.joined_group.alias, predicate
                ));
            }
        }
        sql
    }
}

impl TableGroupResolver for FromClauseIndex {
    fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        self.groups.get(path)
    }

    fn resolve_or_create(
        &mut self,
        path: &NavigablePath,
        parent_path: Option<&NavigablePath>,
        create: &mut TableGroupCreator<'_>,
    ) -> Result<TableGroup, MappingError> {
        if let Some(existing) = self.groups.get(path) {
            return Ok(existing.clone());
        }

        let parent = match parent_path {
            Some(parent_path) => Some(
                self.groups
                    .get(parent_path)
                    .cloned()
                    .ok_or_else(|| MappingError::MissingTableGroup(parent_path.full_path()))?,
            ),
            None => None,
        };

        let group = match create(parent.as_ref(), &mut self.aliases)? {
            TableGroupCreation::Root(group) => group,
            TableGroupCreation::Join(join) => {
                let group = join.joined_group.clone();
                log::debug!(
                    "Registered {:?} table group {} ({}) for {}",
                    group.kind,
                    group.alias,
                    group.table,
                    path
                );
                self.joins.push(join);
                group
            }
        };
        self.groups.insert(path.clone(), group.clone());
        Ok(group)
    }
}
