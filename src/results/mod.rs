//! The result-graph engine
//!
//! Construction synthesizes a builder tree for a query's root result
//! (`builders`); resolution turns it into result and fetch nodes bound to
//! row positions (`mapping`, `graph`); the row reader runs those nodes once
//! per row.

pub mod builders;
pub mod creation_state;
pub mod errors;
pub mod graph;
pub mod mapping;
pub mod row_reader;

pub use builders::{
    CacheKeyCopy, ExplicitFetchBuilder, ExplicitMappings, FetchBuilder, FetchBuilderResolver,
    NoExplicitMappings, ResultBuilder,
};
pub use creation_state::{BuilderContext, DomainResultCreationState};
pub use errors::MappingError;
pub use graph::{DomainResult, Fetch};
pub use mapping::{JdbcValuesMapping, ResultSetMapping};
pub use row_reader::RowReader;
