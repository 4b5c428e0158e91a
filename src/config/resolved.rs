//! Resolved entity model: declarations validated and flattened into descriptors for runtime use.

use crate::config::{EnumDisplay, PreInsertHook, PropertyType, StorageType, ValueGenerator};
use crate::error::AppError;
use crate::policy::EntityPolicies;
use crate::store::ID_COLUMN;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub type_name: String,
    pub name_singular: String,
    pub name_plural: String,
    pub slug: String,
    /// Storage column used as the human-readable label of a row.
    pub prop_identifier: String,
    pub seed_count: u64,
    pub policies: EntityPolicies,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationOptions {
    /// Slug of the target entity.
    pub entity: String,
    pub eager: bool,
    pub foreign_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumOptions {
    pub values: Vec<String>,
    pub display: EnumDisplay,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationOptions>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<EnumOptions>,
    pub show_in_list: bool,
    pub show_in_detail: bool,
    pub nullable: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub prop_name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Storage column: the property name, or the foreign key for relations.
    pub column: String,
    pub storage: StorageType,
    pub options: PropertyOptions,
    /// Declared generator, else the type default (relation/enum generators are bound here).
    #[serde(skip)]
    pub generator: ValueGenerator,
}

impl PropertyDescriptor {
    pub fn relation(&self) -> Option<&RelationOptions> {
        self.options.relation.as_ref()
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        self.options.enumeration.as_ref().map(|e| e.values.as_slice())
    }

    /// Never returned by read operations.
    pub fn is_sensitive(&self) -> bool {
        self.property_type == PropertyType::Password
    }
}

/// Runtime handle for one entity: definition, property descriptors, storage table and hooks.
#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub definition: EntityDefinition,
    pub table_name: String,
    pub properties: Vec<PropertyDescriptor>,
    pub pre_insert: Vec<PreInsertHook>,
}

impl ResolvedEntity {
    pub fn slug(&self) -> &str {
        &self.definition.slug
    }

    /// Storage columns in declaration order; the primary identifier comes first.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(ID_COLUMN).chain(self.properties.iter().map(|p| p.column.as_str()))
    }

    pub fn property(&self, prop_name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.prop_name == prop_name)
    }

    pub fn property_by_column(&self, column: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.column == column)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&PropertyDescriptor, &RelationOptions)> {
        self.properties.iter().filter_map(|p| p.relation().map(|r| (p, r)))
    }

    pub fn has_relations(&self) -> bool {
        self.relations().next().is_some()
    }
}

/// Build-once registry of every declared entity. Never mutated after startup.
#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub(crate) index_by_slug: HashMap<String, usize>,
    pub(crate) index_by_name: HashMap<String, usize>,
}

impl ResolvedModel {
    pub(crate) fn new(entities: Vec<ResolvedEntity>) -> Self {
        let index_by_slug = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.definition.slug.clone(), i))
            .collect();
        let index_by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.definition.type_name.clone(), i))
            .collect();
        ResolvedModel {
            entities,
            index_by_slug,
            index_by_name,
        }
    }

    pub fn entity_by_slug(&self, slug: &str) -> Option<&ResolvedEntity> {
        self.index_by_slug.get(slug).map(|&i| &self.entities[i])
    }

    /// Look up by slug, falling back to type name.
    pub fn entity(&self, reference: &str) -> Result<&ResolvedEntity, AppError> {
        self.index_by_slug
            .get(reference)
            .or_else(|| self.index_by_name.get(reference))
            .map(|&i| &self.entities[i])
            .ok_or_else(|| AppError::NotFound(format!("entity '{}'", reference)))
    }

    pub fn describe_entity(&self, reference: &str) -> Result<&EntityDefinition, AppError> {
        self.entity(reference).map(|e| &e.definition)
    }

    /// Property descriptors of an entity, excluding the primary identifier.
    pub fn describe_properties(&self, definition: &EntityDefinition) -> Result<&[PropertyDescriptor], AppError> {
        self.entity(&definition.slug).map(|e| e.properties.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
