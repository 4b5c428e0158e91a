//! Property-type registry: storage representation and default synthetic-value generator per type.

use crate::error::GeneratorError;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Supported property kinds. Unknown names parse to `Custom` and must be registered before resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    Text,
    TextArea,
    Number,
    Currency,
    Date,
    Email,
    Boolean,
    Password,
    File,
    Image,
    Enum,
    Relation,
    Location,
    Custom(String),
}

impl PropertyType {
    pub const BUILTIN: [PropertyType; 13] = [
        PropertyType::Text,
        PropertyType::TextArea,
        PropertyType::Number,
        PropertyType::Currency,
        PropertyType::Date,
        PropertyType::Email,
        PropertyType::Boolean,
        PropertyType::Password,
        PropertyType::File,
        PropertyType::Image,
        PropertyType::Enum,
        PropertyType::Relation,
        PropertyType::Location,
    ];

    pub fn name(&self) -> &str {
        match self {
            PropertyType::Text => "text",
            PropertyType::TextArea => "text_area",
            PropertyType::Number => "number",
            PropertyType::Currency => "currency",
            PropertyType::Date => "date",
            PropertyType::Email => "email",
            PropertyType::Boolean => "boolean",
            PropertyType::Password => "password",
            PropertyType::File => "file",
            PropertyType::Image => "image",
            PropertyType::Enum => "enum",
            PropertyType::Relation => "relation",
            PropertyType::Location => "location",
            PropertyType::Custom(name) => name,
        }
    }

    /// Accepts snake_case, kebab-case or PascalCase spellings of the builtin names.
    pub fn parse(name: &str) -> PropertyType {
        let normalized = crate::case::to_snake_case(name.trim());
        PropertyType::BUILTIN
            .iter()
            .find(|t| t.name() == normalized || t.name().replace('_', "") == normalized)
            .cloned()
            .unwrap_or_else(|| PropertyType::Custom(name.trim().to_string()))
    }
}

impl From<String> for PropertyType {
    fn from(s: String) -> Self {
        PropertyType::parse(&s)
    }
}

impl From<PropertyType> for String {
    fn from(t: PropertyType) -> Self {
        t.name().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Underlying primitive representation of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    String,
    Number,
    /// Carried as a string with two fractional digits.
    Decimal,
    Boolean,
    /// ISO `YYYY-MM-DD` string.
    Date,
    Json,
    Enum,
}

type GeneratorFn = dyn Fn(u64, u64) -> Result<Value, GeneratorError> + Send + Sync;

/// Synthetic value generator of shape `(row_index, related_seed_count) -> value`.
#[derive(Clone)]
pub struct ValueGenerator(Arc<GeneratorFn>);

impl ValueGenerator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u64, u64) -> Result<Value, GeneratorError> + Send + Sync + 'static,
    {
        ValueGenerator(Arc::new(f))
    }

    /// Wraps an infallible closure.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(u64, u64) -> Value + Send + Sync + 'static,
    {
        ValueGenerator(Arc::new(move |i, n| Ok(f(i, n))))
    }

    pub fn generate(&self, row_index: u64, related_seed_count: u64) -> Result<Value, GeneratorError> {
        (self.0)(row_index, related_seed_count)
    }
}

impl fmt::Debug for ValueGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueGenerator")
    }
}

#[derive(Clone, Debug)]
pub struct PropertyTypeCharacteristics {
    pub storage: StorageType,
    pub default_generator: ValueGenerator,
}

impl PropertyTypeCharacteristics {
    pub fn new(storage: StorageType, default_generator: ValueGenerator) -> Self {
        PropertyTypeCharacteristics {
            storage,
            default_generator,
        }
    }
}

/// Read-only after startup; extend with [`PropertyTypeRegistry::register`] before resolving declarations.
#[derive(Clone, Debug)]
pub struct PropertyTypeRegistry {
    by_type: HashMap<PropertyType, PropertyTypeCharacteristics>,
}

impl Default for PropertyTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do", "eiusmod",
    "tempor", "incididunt", "labore", "dolore", "magna", "aliqua", "enim", "minim", "veniam", "quis",
    "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip", "commodo", "consequat",
];

fn lorem(words: usize) -> String {
    let mut rng = rand::rng();
    let mut out = String::new();
    for i in 0..words.max(1) {
        let word = WORDS[rng.random_range(0..WORDS.len())];
        if i == 0 {
            out.push_str(&capitalize(word));
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}

fn capitalize(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `randomInt(1, related_seed_count)`; null when the target seeds no rows.
pub fn relation_generator() -> ValueGenerator {
    ValueGenerator::infallible(|_, related| {
        if related == 0 {
            Value::Null
        } else {
            json!(rand::rng().random_range(1..=related))
        }
    })
}

/// Picks a random member of `values`.
pub fn enum_generator(values: Vec<String>) -> ValueGenerator {
    ValueGenerator::new(move |_, _| {
        if values.is_empty() {
            return Err(GeneratorError("enum has no values".into()));
        }
        let i = rand::rng().random_range(0..values.len());
        Ok(Value::String(values[i].clone()))
    })
}

impl PropertyTypeRegistry {
    /// Registry covering every builtin property type.
    pub fn builtin() -> Self {
        let mut by_type = HashMap::new();
        for t in PropertyType::BUILTIN {
            let characteristics = builtin_characteristics(&t);
            by_type.insert(t, characteristics);
        }
        PropertyTypeRegistry { by_type }
    }

    /// Add or replace the characteristics of a type.
    pub fn register(&mut self, property_type: PropertyType, characteristics: PropertyTypeCharacteristics) -> &mut Self {
        self.by_type.insert(property_type, characteristics);
        self
    }

    pub fn characteristics_of(&self, property_type: &PropertyType) -> Option<&PropertyTypeCharacteristics> {
        self.by_type.get(property_type)
    }

    pub fn contains(&self, property_type: &PropertyType) -> bool {
        self.by_type.contains_key(property_type)
    }
}

fn builtin_characteristics(t: &PropertyType) -> PropertyTypeCharacteristics {
    use PropertyTypeCharacteristics as C;
    match t {
        PropertyType::Text => C::new(StorageType::String, ValueGenerator::infallible(|_, _| Value::String(lorem(3)))),
        PropertyType::TextArea => C::new(
            StorageType::String,
            ValueGenerator::infallible(|_, _| Value::String(format!("{}. {}.", lorem(12), lorem(9)))),
        ),
        PropertyType::Number => C::new(
            StorageType::Number,
            ValueGenerator::infallible(|_, _| json!(rand::rng().random_range(0..=1000))),
        ),
        PropertyType::Currency => C::new(
            StorageType::Decimal,
            ValueGenerator::infallible(|_, _| {
                let mut rng = rand::rng();
                Value::String(format!("{}.{:02}", rng.random_range(1..10_000), rng.random_range(0..100)))
            }),
        ),
        PropertyType::Date => C::new(
            StorageType::Date,
            ValueGenerator::infallible(|_, _| {
                let days = rand::rng().random_range(0..365);
                let date = Utc::now().date_naive() - Duration::days(days);
                Value::String(date.format("%Y-%m-%d").to_string())
            }),
        ),
        PropertyType::Email => C::new(
            StorageType::String,
            ValueGenerator::infallible(|i, _| Value::String(format!("user{}@example.com", i + 1))),
        ),
        PropertyType::Boolean => C::new(
            StorageType::Boolean,
            ValueGenerator::infallible(|_, _| Value::Bool(rand::rng().random_bool(0.5))),
        ),
        PropertyType::Password => C::new(
            StorageType::String,
            ValueGenerator::infallible(|_, _| Value::String("changeme".into())),
        ),
        PropertyType::File => C::new(
            StorageType::String,
            ValueGenerator::infallible(|i, _| Value::String(format!("files/sample-{}.pdf", i + 1))),
        ),
        PropertyType::Image => C::new(
            StorageType::String,
            ValueGenerator::infallible(|i, _| Value::String(format!("https://picsum.photos/seed/{}/640/480", i + 1))),
        ),
        // Replaced per property by the resolver once the declared values are known.
        PropertyType::Enum => C::new(StorageType::Enum, ValueGenerator::infallible(|_, _| Value::Null)),
        PropertyType::Relation => C::new(StorageType::Number, relation_generator()),
        PropertyType::Location => C::new(
            StorageType::Json,
            ValueGenerator::infallible(|_, _| {
                let mut rng = rand::rng();
                let lat: f64 = rng.random_range(-90.0..90.0);
                let lng: f64 = rng.random_range(-180.0..180.0);
                json!({ "lat": (lat * 1e6).round() / 1e6, "lng": (lng * 1e6).round() / 1e6 })
            }),
        ),
        PropertyType::Custom(_) => C::new(StorageType::String, ValueGenerator::infallible(|_, _| Value::Null)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_builtin_type() {
        let registry = PropertyTypeRegistry::builtin();
        for t in PropertyType::BUILTIN {
            assert!(registry.contains(&t), "missing {}", t);
        }
        assert!(!registry.contains(&PropertyType::Custom("color".into())));
    }

    #[test]
    fn storage_types() {
        let registry = PropertyTypeRegistry::builtin();
        let storage = |t: PropertyType| registry.characteristics_of(&t).map(|c| c.storage);
        assert_eq!(storage(PropertyType::Currency), Some(StorageType::Decimal));
        assert_eq!(storage(PropertyType::Relation), Some(StorageType::Number));
        assert_eq!(storage(PropertyType::Location), Some(StorageType::Json));
        assert_eq!(storage(PropertyType::Enum), Some(StorageType::Enum));
        assert_eq!(storage(PropertyType::Email), Some(StorageType::String));
    }

    #[test]
    fn parse_accepts_spellings() {
        assert_eq!(PropertyType::parse("TextArea"), PropertyType::TextArea);
        assert_eq!(PropertyType::parse("text_area"), PropertyType::TextArea);
        assert_eq!(PropertyType::parse("textarea"), PropertyType::TextArea);
        assert_eq!(PropertyType::parse("Relation"), PropertyType::Relation);
        assert_eq!(PropertyType::parse("color"), PropertyType::Custom("color".into()));
    }

    #[test]
    fn relation_generator_stays_in_range() {
        let g = relation_generator();
        for i in 0..200 {
            let v = g.generate(i, 7).unwrap().as_u64().unwrap();
            assert!((1..=7).contains(&v));
        }
        assert_eq!(g.generate(0, 0).unwrap(), Value::Null);
    }

    #[test]
    fn enum_generator_picks_members() {
        let values = vec!["draft".to_string(), "sent".to_string()];
        let g = enum_generator(values.clone());
        for i in 0..50 {
            let v = g.generate(i, 0).unwrap();
            assert!(values.iter().any(|m| v == Value::String(m.clone())));
        }
        assert!(enum_generator(Vec::new()).generate(0, 0).is_err());
    }

    #[test]
    fn email_generator_is_unique_per_row() {
        let registry = PropertyTypeRegistry::builtin();
        let g = &registry.characteristics_of(&PropertyType::Email).unwrap().default_generator;
        assert_eq!(g.generate(0, 0).unwrap(), json!("user1@example.com"));
        assert_eq!(g.generate(9, 0).unwrap(), json!("user10@example.com"));
    }
}
