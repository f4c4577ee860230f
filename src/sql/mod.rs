//! SQL-side collaborators of the engine: table groups, selections and row
//! metadata.

pub mod jdbc_metadata;
pub mod selection;
pub mod table_group;

pub use jdbc_metadata::{ColumnMetadata, JdbcValuesMetadata, ResultSetMetadata};
pub use selection::{ColumnLocator, SqlSelection, SqlSelectionRegistry};
pub use table_group::{
    AliasGenerator, ColumnRef, FromClauseIndex, JoinPredicate, JoinType, TableGroup,
    TableGroupCreation, TableGroupJoin, TableGroupKind, TableGroupResolver,
};
