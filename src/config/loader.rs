//! Resolve declarations into the runtime model, and load declarations from JSON.

use crate::case::{pluralize, to_kebab_case, to_snake_case};
use crate::config::resolved::{
    EntityDefinition, EnumOptions, PropertyDescriptor, PropertyOptions, RelationOptions, ResolvedEntity, ResolvedModel,
};
use crate::config::{
    enum_generator, validate, DeclarationSet, EntityDeclaration, PropertyDeclaration, PropertyType,
    PropertyTypeRegistry,
};
use crate::error::ConfigError;
use crate::policy::EntityPolicies;
use crate::store::ID_COLUMN;
use std::collections::HashMap;
use std::path::Path;

/// Rows generated per entity when `seed_count` is not declared.
pub const DEFAULT_SEED_COUNT: u64 = 50;

/// Declared slug, else the dasherized plural of the type name.
pub fn entity_slug(decl: &EntityDeclaration) -> String {
    decl.slug
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| to_kebab_case(&pluralize(&decl.name)))
}

/// Table of an entity, derived from its (unique) slug.
pub fn entity_table(decl: &EntityDeclaration) -> String {
    to_snake_case(&entity_slug(decl))
}

/// Column a declared `prop_identifier` refers to: `id`, a storage column, or a property name
/// (relations map to their foreign key). None when it names nothing on the entity.
pub fn identifier_column(decl: &EntityDeclaration, identifier: &str) -> Option<String> {
    if identifier == ID_COLUMN {
        return Some(ID_COLUMN.to_string());
    }
    decl.properties
        .iter()
        .find(|p| property_column(p) == identifier)
        .or_else(|| decl.properties.iter().find(|p| p.name == identifier))
        .map(property_column)
}

/// Storage column of a property: the declared/derived foreign key for relations, else the name.
pub fn property_column(prop: &PropertyDeclaration) -> String {
    if prop.type_ == PropertyType::Relation {
        prop.options
            .foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", to_snake_case(&prop.name)))
    } else {
        prop.name.clone()
    }
}

/// Validate and resolve declarations against the builtin property-type registry.
pub fn resolve(declarations: &[EntityDeclaration]) -> Result<ResolvedModel, ConfigError> {
    resolve_with(declarations, &PropertyTypeRegistry::builtin())
}

/// Validate and resolve declarations. Fails on the first configuration error.
pub fn resolve_with(
    declarations: &[EntityDeclaration],
    registry: &PropertyTypeRegistry,
) -> Result<ResolvedModel, ConfigError> {
    validate(declarations, registry)?;

    let slug_by_reference: HashMap<String, String> = declarations
        .iter()
        .flat_map(|d| {
            let slug = entity_slug(d);
            [(d.name.clone(), slug.clone()), (slug.clone(), slug)]
        })
        .collect();

    let mut entities = Vec::with_capacity(declarations.len());
    for decl in declarations {
        let properties = decl
            .properties
            .iter()
            .map(|p| describe_property(decl, p, registry, &slug_by_reference))
            .collect::<Result<Vec<_>, _>>()?;
        let definition = describe_entity(decl, &properties);
        tracing::debug!(
            slug = %definition.slug,
            properties = properties.len(),
            seed_count = definition.seed_count,
            "resolved entity"
        );
        entities.push(ResolvedEntity {
            table_name: entity_table(decl),
            definition,
            properties,
            pre_insert: decl.pre_insert.clone(),
        });
    }
    Ok(ResolvedModel::new(entities))
}

fn describe_entity(decl: &EntityDeclaration, properties: &[PropertyDescriptor]) -> EntityDefinition {
    let name_singular = decl.name_singular.clone().unwrap_or_else(|| decl.name.clone());
    let name_plural = decl.name_plural.clone().unwrap_or_else(|| pluralize(&decl.name));
    // The primary identifier is the first storage field, so the label defaults to the second.
    let prop_identifier = decl
        .prop_identifier
        .as_deref()
        .and_then(|id| identifier_column(decl, id))
        .or_else(|| properties.first().map(|p| p.column.clone()))
        .unwrap_or_else(|| ID_COLUMN.to_string());
    let mut policies = EntityPolicies::default();
    for (op, policy) in &decl.policies {
        policies.set(*op, policy.clone());
    }
    EntityDefinition {
        type_name: decl.name.clone(),
        name_singular,
        name_plural,
        slug: entity_slug(decl),
        prop_identifier,
        seed_count: decl.seed_count.unwrap_or(DEFAULT_SEED_COUNT),
        policies,
    }
}

fn describe_property(
    decl: &EntityDeclaration,
    prop: &PropertyDeclaration,
    registry: &PropertyTypeRegistry,
    slug_by_reference: &HashMap<String, String>,
) -> Result<PropertyDescriptor, ConfigError> {
    let characteristics = registry
        .characteristics_of(&prop.type_)
        .ok_or_else(|| ConfigError::UnknownPropertyType {
            entity: decl.name.clone(),
            property: prop.name.clone(),
            type_name: prop.type_.name().to_string(),
        })?;
    let opts = &prop.options;

    let relation = match prop.type_ {
        PropertyType::Relation => {
            let target = opts.entity.as_deref().ok_or_else(|| ConfigError::MissingRelationTarget {
                entity: decl.name.clone(),
                property: prop.name.clone(),
            })?;
            let slug = slug_by_reference
                .get(target)
                .ok_or_else(|| ConfigError::UnknownRelationTarget {
                    entity: decl.name.clone(),
                    property: prop.name.clone(),
                    target: target.to_string(),
                })?;
            Some(RelationOptions {
                entity: slug.clone(),
                eager: opts.eager.unwrap_or(false),
                foreign_key: property_column(prop),
            })
        }
        _ => None,
    };

    let enumeration = match prop.type_ {
        PropertyType::Enum => {
            let values = opts
                .enum_values
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnumValues {
                    entity: decl.name.clone(),
                    property: prop.name.clone(),
                })?;
            Some(EnumOptions {
                values,
                display: opts.display.unwrap_or_default(),
            })
        }
        _ => None,
    };

    let generator = match (&prop.generator, &enumeration) {
        (Some(g), _) => g.clone(),
        (None, Some(e)) => enum_generator(e.values.clone()),
        (None, None) => characteristics.default_generator.clone(),
    };

    Ok(PropertyDescriptor {
        prop_name: prop.name.clone(),
        label: prop.label.clone().unwrap_or_else(|| prop.name.clone()),
        property_type: prop.type_.clone(),
        column: property_column(prop),
        storage: characteristics.storage,
        options: PropertyOptions {
            relation,
            enumeration,
            show_in_list: opts.show_in_list.unwrap_or(true),
            show_in_detail: opts.show_in_detail.unwrap_or(true),
            nullable: opts.nullable.unwrap_or(true),
        },
        generator,
    })
}

/// Parse a JSON declarations document.
pub fn parse_declarations(json: &str) -> Result<Vec<EntityDeclaration>, ConfigError> {
    let set: DeclarationSet = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    Ok(set.entities)
}

/// Read and parse a JSON declarations file.
pub fn load_declarations(path: impl AsRef<Path>) -> Result<Vec<EntityDeclaration>, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let declarations = parse_declarations(&json)?;
    tracing::info!(path = %path.display(), entities = declarations.len(), "loaded declarations");
    Ok(declarations)
}
