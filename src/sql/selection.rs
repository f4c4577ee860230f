//! SQL selections: which result-set column feeds which slot of the row buffer.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain_model::types::BasicType;

/// How an explicit mapping names a result-set column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLocator {
    /// Column label, matched case-insensitively
    Name(String),
    /// 1-based column position
    Position(usize),
}

impl ColumnLocator {
    pub fn name(label: impl Into<String>) -> Self {
        ColumnLocator::Name(label.into())
    }
}

impl fmt::Display for ColumnLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLocator::Name(name) => write!(f, "{}", name),
            ColumnLocator::Position(position) => write!(f, "#{}", position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlSelection {
    /// 1-based position in the result set
    pub jdbc_position: usize,
    /// 0-based slot in the row buffer handed to the row reader
    pub values_array_position: usize,
    pub column_label: String,
    pub basic_type: BasicType,
}

/// Selections registered while building one mapping, one per column.
#[derive(Debug, Default, Clone)]
pub struct SqlSelectionRegistry {
    by_position: IndexMap<usize, SqlSelection>,
}

impl SqlSelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the column at `jdbc_position`, or return the selection already
    /// registered for it. The first registration decides the basic type.
    pub fn resolve(
        &mut self,
        jdbc_position: usize,
        column_label: &str,
        basic_type: BasicType,
    ) -> SqlSelection {
        self.by_position
            .entry(jdbc_position)
            .or_insert_with(|| SqlSelection {
                jdbc_position,
                values_array_position: jdbc_position.saturating_sub(1),
                column_label: column_label.to_string(),
                basic_type,
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    /// Selections in registration order
    pub fn selections(&self) -> Vec<SqlSelection> {
        self.by_position.values().cloned().collect()
    }
}
