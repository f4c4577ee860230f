//! Row metadata: column labels and wire types of a result set.

use serde::{Deserialize, Serialize};

use crate::domain_model::types::{BasicType, JdbcType, TypeRegistry, ValueType};
use crate::results::errors::MappingError;

/// What the engine needs to know about the columns of a result set.
pub trait JdbcValuesMetadata {
    fn column_count(&self) -> usize;

    /// 1-based position of the column with this label
    fn resolve_column_position(&self, label: &str) -> Result<usize, MappingError>;

    /// Label of the column at a 1-based position
    fn resolve_column_name(&self, position: usize) -> Result<String, MappingError>;

    /// Basic type for the column at a 1-based position, preferring the
    /// fallback domain type when the caller has one.
    fn resolve_type(
        &self,
        position: usize,
        fallback: Option<ValueType>,
        registry: &TypeRegistry,
    ) -> Result<BasicType, MappingError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub label: String,
    pub jdbc_type: JdbcType,
}

/// Column metadata captured from a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSetMetadata {
    columns: Vec<ColumnMetadata>,
}

impl ResultSetMetadata {
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        ResultSetMetadata { columns }
    }

    /// Labels only; every column reports `JdbcType::Other`.
    pub fn from_labels(labels: &[&str]) -> Self {
        ResultSetMetadata {
            columns: labels
                .iter()
                .map(|label| ColumnMetadata {
                    label: label.to_string(),
                    jdbc_type: JdbcType::Other,
                })
                .collect(),
        }
    }

    pub fn with_column(mut self, label: &str, jdbc_type: JdbcType) -> Self {
        self.columns.push(ColumnMetadata {
            label: label.to_string(),
            jdbc_type,
        });
        self
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    fn column(&self, position: usize) -> Result<&ColumnMetadata, MappingError> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .ok_or(MappingError::ColumnPositionOutOfRange {
                position,
                column_count: self.columns.len(),
            })
    }
}

impl JdbcValuesMetadata for ResultSetMetadata {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn resolve_column_position(&self, label: &str) -> Result<usize, MappingError> {
        self.columns
            .iter()
            .position(|c| c.label.eq_ignore_ascii_case(label))
            .map(|index| index + 1)
            .ok_or_else(|| MappingError::UnknownColumn(label.to_string()))
    }

    fn resolve_column_name(&self, position: usize) -> Result<String, MappingError> {
        self.column(position).map(|c| c.label.clone())
    }

    fn resolve_type(
        &self,
        position: usize,
        fallback: Option<ValueType>,
        registry: &TypeRegistry,
    ) -> Result<BasicType, MappingError> {
        let column = self.column(position)?;
        Ok(registry.resolve(column.jdbc_type, fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based_and_case_insensitive() {
        let metadata = ResultSetMetadata::default()
            .with_column("ID", JdbcType::BigInt)
            .with_column("Total", JdbcType::Numeric);
        assert_eq!(metadata.resolve_column_position("id").unwrap(), 1);
        assert_eq!(metadata.resolve_column_position("TOTAL").unwrap(), 2);
        assert_eq!(metadata.resolve_column_name(2).unwrap(), "Total");
        assert_eq!(
            metadata.resolve_column_position("missing").unwrap_err(),
            MappingError::UnknownColumn("missing".to_string())
        );
        assert!(matches!(
            metadata.resolve_column_name(0),
            Err(MappingError::ColumnPositionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_resolve_type_uses_registry_and_fallback() {
        let registry = TypeRegistry::standard();
        let metadata = ResultSetMetadata::default().with_column("amount", JdbcType::Numeric);
        assert_eq!(
            metadata.resolve_type(1, None, &registry).unwrap().value_type,
            ValueType::Decimal
        );
        assert_eq!(
            metadata
                .resolve_type(1, Some(ValueType::Double), &registry)
                .unwrap()
                .value_type,
            ValueType::Double
        );
    }
}
