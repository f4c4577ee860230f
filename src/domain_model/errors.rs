//! Error types for domain model definitions.
//!
//! These errors occur while a model is being loaded or validated, before any
//! result mapping is built against it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainModelError {
    #[error("Unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("Duplicate entity `{0}`")]
    DuplicateEntity(String),

    #[error("Duplicate attribute `{attribute}` on `{owner}`")]
    DuplicateAttribute { owner: String, attribute: String },

    #[error("Unknown attribute `{attribute}` on `{owner}`")]
    UnknownAttribute { owner: String, attribute: String },

    #[error("Foreign key `{role}` has {actual} column(s) but the target key needs {expected}")]
    ForeignKeyArity {
        role: String,
        expected: usize,
        actual: usize,
    },

    #[error("Discriminated association `{0}` declares no targets")]
    NoDiscriminatorTargets(String),

    #[error("Attribute `{role}` is not allowed here: {reason}")]
    InvalidAttribute { role: String, reason: String },

    #[error("Failed to parse model definition: {0}")]
    Parse(String),

    #[error("Failed to read model definition `{path}`: {message}")]
    Io { path: String, message: String },
}
