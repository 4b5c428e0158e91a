//! Declaration validation: type registration, relation targets, enum values and slug uniqueness.

use crate::config::loader::{entity_slug, entity_table, identifier_column, property_column};
use crate::config::{EntityDeclaration, PropertyType, PropertyTypeRegistry};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Slugs taken by static routes (`/meta`, `/health`, `/version`).
pub const RESERVED_SLUGS: &[&str] = &["meta", "health", "version"];

pub fn validate(declarations: &[EntityDeclaration], registry: &PropertyTypeRegistry) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut slugs = HashSet::new();
    let mut tables: HashMap<String, &str> = HashMap::new();
    for decl in declarations {
        if !names.insert(decl.name.as_str()) {
            return Err(ConfigError::DuplicateEntityName(decl.name.clone()));
        }
        let slug = entity_slug(decl);
        if RESERVED_SLUGS.contains(&slug.as_str()) {
            return Err(ConfigError::ReservedSlug(slug));
        }
        if !slugs.insert(slug.clone()) {
            return Err(ConfigError::DuplicateSlug(slug));
        }
        let table = entity_table(decl);
        if let Some(first) = tables.insert(table.clone(), decl.name.as_str()) {
            return Err(ConfigError::DuplicateTable {
                table,
                first: first.to_string(),
                second: decl.name.clone(),
            });
        }
    }

    for decl in declarations {
        let mut prop_names = HashSet::new();
        let mut columns = HashSet::from([crate::store::ID_COLUMN.to_string()]);
        for prop in &decl.properties {
            let duplicate = || ConfigError::DuplicateProperty {
                entity: decl.name.clone(),
                property: prop.name.clone(),
            };
            if !prop_names.insert(prop.name.as_str()) || !columns.insert(property_column(prop)) {
                return Err(duplicate());
            }
            if !registry.contains(&prop.type_) {
                return Err(ConfigError::UnknownPropertyType {
                    entity: decl.name.clone(),
                    property: prop.name.clone(),
                    type_name: prop.type_.name().to_string(),
                });
            }
            match prop.type_ {
                PropertyType::Relation => {
                    let target = prop
                        .options
                        .entity
                        .as_deref()
                        .filter(|t| !t.trim().is_empty())
                        .ok_or_else(|| ConfigError::MissingRelationTarget {
                            entity: decl.name.clone(),
                            property: prop.name.clone(),
                        })?;
                    if !names.contains(target) && !slugs.contains(target) {
                        return Err(ConfigError::UnknownRelationTarget {
                            entity: decl.name.clone(),
                            property: prop.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
                PropertyType::Enum => {
                    let has_values = prop.options.enum_values.as_ref().map(|v| !v.is_empty()).unwrap_or(false);
                    if !has_values {
                        return Err(ConfigError::MissingEnumValues {
                            entity: decl.name.clone(),
                            property: prop.name.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        if let Some(identifier) = decl.prop_identifier.as_deref() {
            if identifier_column(decl, identifier).is_none() {
                return Err(ConfigError::UnknownIdentifier {
                    entity: decl.name.clone(),
                    identifier: identifier.to_string(),
                });
            }
        }
    }
    Ok(())
}
