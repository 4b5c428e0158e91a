//! Entity and property declarations: the registration input, built in code or loaded from JSON.

use crate::config::{PropertyType, ValueGenerator};
use crate::error::{AppError, GeneratorError};
use crate::policy::{Operation, Policy};
use crate::store::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Related rows loaded before insert, keyed by relation property name.
pub type RelatedRows = HashMap<String, Row>;

type HookFn = dyn Fn(&mut Row, &RelatedRows) -> Result<(), AppError> + Send + Sync;

/// Callback run before a row is inserted, with the rows it refers to already loaded.
#[derive(Clone)]
pub struct PreInsertHook(Arc<HookFn>);

impl PreInsertHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Row, &RelatedRows) -> Result<(), AppError> + Send + Sync + 'static,
    {
        PreInsertHook(Arc::new(f))
    }

    pub fn run(&self, row: &mut Row, related: &RelatedRows) -> Result<(), AppError> {
        (self.0)(row, related)
    }
}

impl fmt::Debug for PreInsertHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PreInsertHook")
    }
}

/// How a UI should present an enum field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumDisplay {
    #[default]
    Select,
    Radio,
    Badge,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PropertyOptionsDeclaration {
    /// Relation target: type name or slug.
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub eager: Option<bool>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub display: Option<EnumDisplay>,
    #[serde(default)]
    pub show_in_list: Option<bool>,
    #[serde(default)]
    pub show_in_detail: Option<bool>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: PropertyType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub options: PropertyOptionsDeclaration,
    #[serde(skip)]
    pub generator: Option<ValueGenerator>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, type_: PropertyType) -> Self {
        PropertyDeclaration {
            name: name.into(),
            type_,
            label: None,
            options: PropertyOptionsDeclaration::default(),
            generator: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Text)
    }

    /// Relation to another declared entity, by type name or slug.
    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        let mut p = Self::new(name, PropertyType::Relation);
        p.options.entity = Some(target.into());
        p
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut p = Self::new(name, PropertyType::Enum);
        p.options.enum_values = Some(values.into_iter().map(Into::into).collect());
        p
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn eager(mut self, eager: bool) -> Self {
        self.options.eager = Some(eager);
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.options.foreign_key = Some(column.into());
        self
    }

    pub fn display(mut self, display: EnumDisplay) -> Self {
        self.options.display = Some(display);
        self
    }

    pub fn required(mut self) -> Self {
        self.options.nullable = Some(false);
        self
    }

    pub fn hidden_in_list(mut self) -> Self {
        self.options.show_in_list = Some(false);
        self
    }

    pub fn hidden_in_detail(mut self) -> Self {
        self.options.show_in_detail = Some(false);
        self
    }

    pub fn generator<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) -> Result<Value, GeneratorError> + Send + Sync + 'static,
    {
        self.generator = Some(ValueGenerator::new(f));
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntityDeclaration {
    /// Type name, e.g. `OrderItem`. Conventions derive everything else from it.
    pub name: String,
    #[serde(default)]
    pub name_singular: Option<String>,
    #[serde(default)]
    pub name_plural: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub prop_identifier: Option<String>,
    #[serde(default)]
    pub seed_count: Option<u64>,
    #[serde(default)]
    pub policies: BTreeMap<Operation, Policy>,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    #[serde(skip)]
    pub pre_insert: Vec<PreInsertHook>,
}

impl EntityDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        EntityDeclaration {
            name: name.into(),
            name_singular: None,
            name_plural: None,
            slug: None,
            prop_identifier: None,
            seed_count: None,
            policies: BTreeMap::new(),
            properties: Vec::new(),
            pre_insert: Vec::new(),
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn names(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.name_singular = Some(singular.into());
        self.name_plural = Some(plural.into());
        self
    }

    pub fn prop_identifier(mut self, column: impl Into<String>) -> Self {
        self.prop_identifier = Some(column.into());
        self
    }

    pub fn seed_count(mut self, count: u64) -> Self {
        self.seed_count = Some(count);
        self
    }

    pub fn policy(mut self, operation: Operation, policy: Policy) -> Self {
        self.policies.insert(operation, policy);
        self
    }

    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    pub fn pre_insert<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Row, &RelatedRows) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.pre_insert.push(PreInsertHook::new(f));
        self
    }
}

/// Top-level JSON document: `{ "entities": [ ... ] }`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeclarationSet {
    #[serde(default)]
    pub entities: Vec<EntityDeclaration>,
}
