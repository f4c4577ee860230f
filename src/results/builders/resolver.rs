//! Caller-supplied explicit builders
//!
//! The resolver is consulted once per part while a plan is constructed. It
//! must answer the same way every time it is asked about a part during one
//! construction; its errors abort the construction unchanged.

use std::collections::HashMap;

use crate::domain_model::model_part::ModelPartRef;
use crate::results::builders::explicit::ExplicitFetchBuilder;
use crate::results::errors::MappingError;

pub trait FetchBuilderResolver {
    fn resolve(&self, part: &ModelPartRef) -> Result<Option<ExplicitFetchBuilder>, MappingError>;
}

impl<F> FetchBuilderResolver for F
where
    F: Fn(&ModelPartRef) -> Result<Option<ExplicitFetchBuilder>, MappingError>,
{
    fn resolve(&self, part: &ModelPartRef) -> Result<Option<ExplicitFetchBuilder>, MappingError> {
        self(part)
    }
}

/// Resolver that never supplies an explicit builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExplicitMappings;

impl FetchBuilderResolver for NoExplicitMappings {
    fn resolve(&self, _part: &ModelPartRef) -> Result<Option<ExplicitFetchBuilder>, MappingError> {
        Ok(None)
    }
}

/// Explicit builders registered up front, keyed by part role.
#[derive(Debug, Default, Clone)]
pub struct ExplicitMappings {
    by_role: HashMap<String, ExplicitFetchBuilder>,
}

impl ExplicitMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for its part, replacing an earlier registration.
    pub fn register(&mut self, builder: ExplicitFetchBuilder) -> &mut Self {
        self.by_role
            .insert(builder.part().role().to_string(), builder);
        self
    }

    pub fn len(&self) -> usize {
        self.by_role.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_role.is_empty()
    }
}

impl FetchBuilderResolver for ExplicitMappings {
    fn resolve(&self, part: &ModelPartRef) -> Result<Option<ExplicitFetchBuilder>, MappingError> {
        Ok(self.by_role.get(part.role()).cloned())
    }
}
