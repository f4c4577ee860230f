//! Domain model consumed by the result-graph engine
//!
//! The engine only reads the model: entities with their identifier and
//! attributes, each attribute classified by a [`ModelPart`]. Models are
//! normally loaded from a YAML/JSON definition (see [`config`]).

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

pub mod config;
pub mod errors;
pub mod fetchable;
pub mod model_part;
pub mod types;

pub use errors::DomainModelError;
pub use model_part::{
    CollectionPartNature, FetchTiming, ModelPart, ModelPartKind, ModelPartRef,
};
pub use types::{BasicType, JdbcType, TypeRegistry, Value, ValueType};

/// One mapped entity
#[derive(Debug, Clone)]
pub struct EntityMapping {
    name: String,
    table: String,
    identifier: ModelPartRef,
    /// Non-identifier attributes in declaration order
    attributes: Vec<ModelPartRef>,
}

impl EntityMapping {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        identifier: ModelPartRef,
        attributes: Vec<ModelPartRef>,
    ) -> Self {
        EntityMapping {
            name: name.into(),
            table: table.into(),
            identifier,
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identifier(&self) -> &ModelPartRef {
        &self.identifier
    }

    pub fn attributes(&self) -> &[ModelPartRef] {
        &self.attributes
    }

    /// Identifier or attribute by name
    pub fn find_sub_part(&self, name: &str) -> Option<&ModelPartRef> {
        if self.identifier.name() == name {
            return Some(&self.identifier);
        }
        self.attributes.iter().find(|p| p.name() == name)
    }

    /// Walk a dotted property path (`details.code`) through embeddables and
    /// return the part named by its final segment.
    pub fn resolve_property_path(&self, dotted: &str) -> Result<&ModelPartRef, DomainModelError> {
        let unknown = || DomainModelError::UnknownAttribute {
            owner: self.name.clone(),
            attribute: dotted.to_string(),
        };
        let mut segments = dotted.split('.');
        let first = segments.next().ok_or_else(unknown)?;
        let mut current = self.find_sub_part(first).ok_or_else(unknown)?;
        for segment in segments {
            current = current.find_sub_part(segment).ok_or_else(unknown)?;
        }
        Ok(current)
    }
}

/// Registry of entities, looked up by name.
#[derive(Debug, Clone)]
pub struct DomainModel {
    name: String,
    entities: IndexMap<String, Arc<EntityMapping>>,
}

impl DomainModel {
    pub fn new(name: impl Into<String>) -> Self {
        DomainModel {
            name: name.into(),
            entities: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_entity(&mut self, entity: EntityMapping) -> Result<(), DomainModelError> {
        if self.entities.contains_key(entity.name()) {
            return Err(DomainModelError::DuplicateEntity(entity.name().to_string()));
        }
        self.entities
            .insert(entity.name().to_string(), Arc::new(entity));
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Result<&Arc<EntityMapping>, DomainModelError> {
        self.entities
            .get(name)
            .ok_or_else(|| DomainModelError::UnknownEntity(name.to_string()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityMapping>> {
        self.entities.values()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, DomainModelError> {
        let definition: config::DomainModelDefinition =
            serde_yaml::from_str(yaml).map_err(|e| DomainModelError::Parse(e.to_string()))?;
        definition.build()
    }

    pub fn from_json_str(json: &str) -> Result<Self, DomainModelError> {
        let definition: config::DomainModelDefinition =
            serde_json::from_str(json).map_err(|e| DomainModelError::Parse(e.to_string()))?;
        definition.build()
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, DomainModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DomainModelError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }
}
