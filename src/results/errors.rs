use thiserror::Error;

use crate::domain_model::errors::DomainModelError;
use crate::domain_model::types::ValueType;

/// Failures while building a result mapping or reading rows through it.
///
/// None of these are recovered from inside the engine; a failed build is
/// never cached.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error(transparent)]
    DomainModel(#[from] DomainModelError),

    #[error("Attribute `{role}` cannot be mapped {context}")]
    UnsupportedPart { role: String, context: String },

    #[error("Fetch depth {max} exceeded at `{path}`")]
    FetchDepthExceeded { path: String, max: usize },

    #[error("Positional column selection (#{position}) is not allowed for entity or embeddable results")]
    PositionalSelectionNotAllowed { position: usize },

    #[error("Result set has no column `{0}`")]
    UnknownColumn(String),

    #[error("Column position {position} is out of range (result set has {column_count} columns)")]
    ColumnPositionOutOfRange { position: usize, column_count: usize },

    #[error("Explicit mapping for `{role}` lists {actual} column(s), expected {expected}")]
    ColumnCountMismatch {
        role: String,
        expected: usize,
        actual: usize,
    },

    #[error("No table group registered for `{0}`")]
    MissingTableGroup(String),

    #[error("Result class mapping must be the only result (result position {0}, expected 0)")]
    NonZeroResultPosition(usize),

    #[error("Result set mapping already declares a root result")]
    MultipleRootResults,

    #[error("Result set mapping declares no root result")]
    MissingRootResult,

    #[error("Row has {actual} values, mapping expects {expected}")]
    RowWidthMismatch { expected: usize, actual: usize },

    #[error("Unknown discriminator value `{value}` for `{role}`")]
    UnknownDiscriminator { role: String, value: String },

    #[error("Cannot convert `{value}` to {target:?}")]
    TypeCoercion { value: String, target: ValueType },

    #[error("Fetch builder resolver failed: {0}")]
    Resolver(String),
}
