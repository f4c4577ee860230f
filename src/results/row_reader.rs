//! Reads rows through a resolved mapping, one value graph per row.

use crate::domain_model::types::Value;
use crate::results::errors::MappingError;
use crate::results::mapping::JdbcValuesMapping;

pub struct RowReader<'m> {
    mapping: &'m JdbcValuesMapping,
    rows_read: usize,
}

impl<'m> RowReader<'m> {
    pub fn new(mapping: &'m JdbcValuesMapping) -> Self {
        RowReader {
            mapping,
            rows_read: 0,
        }
    }

    /// Assemble the value graph of one row. The row must carry exactly the
    /// columns the mapping was resolved against.
    pub fn read_row(&mut self, row: &[Value]) -> Result<Value, MappingError> {
        if row.len() != self.mapping.column_count {
            return Err(MappingError::RowWidthMismatch {
                expected: self.mapping.column_count,
                actual: row.len(),
            });
        }
        let value = self.mapping.result.assemble(row)?;
        self.rows_read += 1;
        log::trace!("Row {} materialized as {}", self.rows_read, value);
        Ok(value)
    }

    /// Read every row, stopping at the first failure.
    pub fn read_all<I, R>(&mut self, rows: I) -> Result<Vec<Value>, MappingError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Value]>,
    {
        rows.into_iter()
            .map(|row| self.read_row(row.as_ref()))
            .collect()
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}
