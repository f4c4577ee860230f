//! Resultgraph - result-graph materialization for relational queries
//!
//! This crate turns a domain model and a query's row metadata into a plan
//! that materializes each row as an object graph:
//! - Domain model definitions loaded from YAML or JSON
//! - Implicit and explicit fetch builders for every kind of mapped attribute
//! - Table group registration and SQL join rendering
//! - Row assembly and an LRU cache of resolved plans

pub mod config;
pub mod domain_model;
pub mod navigable_path;
pub mod plan_cache;
pub mod results;
pub mod sql;

pub use config::{ConfigError, EngineConfig};
pub use domain_model::DomainModel;
pub use navigable_path::NavigablePath;
pub use plan_cache::{PlanCache, PlanCacheConfig, PlanCacheKey};
pub use results::{MappingError, ResultSetMapping, RowReader};
