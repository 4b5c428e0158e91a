//! Type-driven payload checks derived from property descriptors.

use crate::config::{PropertyDescriptor, PropertyType, ResolvedEntity, StorageType};
use crate::error::AppError;
use crate::store::{value_as_id, Row, ID_COLUMN};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

pub struct RequestValidator;

impl RequestValidator {
    /// Keep declared columns only (never the identifier), normalizing values to their storage form.
    /// Relation properties may be addressed by property name or foreign-key column.
    pub fn sanitize(entity: &ResolvedEntity, payload: Row) -> Result<Row, AppError> {
        let mut out = Row::new();
        for (key, value) in payload {
            if key == ID_COLUMN {
                continue;
            }
            let Some(prop) = entity.property_by_column(&key).or_else(|| entity.property(&key)) else {
                tracing::warn!(entity = %entity.slug(), key = %key, "dropping undeclared payload key");
                continue;
            };
            let value = normalize(prop, value)?;
            out.insert(prop.column.clone(), value);
        }
        Ok(out)
    }

    /// Non-nullable columns must hold a value.
    pub fn require(entity: &ResolvedEntity, row: &Row) -> Result<(), AppError> {
        for prop in entity.properties.iter().filter(|p| !p.options.nullable) {
            if row.get(&prop.column).map(Value::is_null).unwrap_or(true) {
                return Err(AppError::Validation(format!("{} is required", prop.prop_name)));
            }
        }
        Ok(())
    }
}

fn invalid(prop: &PropertyDescriptor, expected: &str) -> AppError {
    AppError::Validation(format!("{} must be {}", prop.prop_name, expected))
}

fn normalize(prop: &PropertyDescriptor, value: Value) -> Result<Value, AppError> {
    if value.is_null() {
        return Ok(value);
    }
    if prop.property_type == PropertyType::Relation {
        // Expanded relation objects are accepted and reduced to their id.
        let id = match &value {
            Value::Object(o) => o.get(ID_COLUMN).and_then(value_as_id),
            other => value_as_id(other),
        };
        return id.map(Value::from).ok_or_else(|| invalid(prop, "an integer id"));
    }
    match prop.storage {
        StorageType::String => {
            let s = value.as_str().ok_or_else(|| invalid(prop, "a string"))?;
            if prop.property_type == PropertyType::Email {
                let re = Regex::new(EMAIL_PATTERN)
                    .map_err(|_| AppError::Validation(format!("invalid email pattern for {}", prop.prop_name)))?;
                if !re.is_match(s) {
                    return Err(invalid(prop, "a valid email"));
                }
            }
            Ok(value)
        }
        StorageType::Number => {
            if value.is_number() {
                Ok(value)
            } else {
                Err(invalid(prop, "a number"))
            }
        }
        StorageType::Decimal => match &value {
            Value::Number(n) => n
                .as_f64()
                .map(|f| Value::String(format!("{:.2}", f)))
                .ok_or_else(|| invalid(prop, "a decimal")),
            Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(Value::String(s.trim().to_string())),
            _ => Err(invalid(prop, "a decimal")),
        },
        StorageType::Boolean => {
            if value.is_boolean() {
                Ok(value)
            } else {
                Err(invalid(prop, "a boolean"))
            }
        }
        StorageType::Date => {
            let s = value.as_str().ok_or_else(|| invalid(prop, "a date"))?;
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::String(dt.date_naive().format("%Y-%m-%d").to_string()))
                .map_err(|_| invalid(prop, "a date (YYYY-MM-DD)"))
        }
        StorageType::Json => Ok(value),
        StorageType::Enum => {
            let values = prop.enum_values().unwrap_or_default();
            match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Ok(value),
                _ => Err(invalid(prop, &format!("one of: {}", values.join(", ")))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityDeclaration, PropertyDeclaration};
    use serde_json::json;

    fn entity() -> ResolvedEntity {
        let model = resolve(&[
            EntityDeclaration::new("Customer").property(PropertyDeclaration::text("name")),
            EntityDeclaration::new("Order")
                .property(PropertyDeclaration::text("title").required())
                .property(PropertyDeclaration::relation("customer", "Customer"))
                .property(PropertyDeclaration::new("contact", PropertyType::Email))
                .property(PropertyDeclaration::new("total", PropertyType::Currency))
                .property(PropertyDeclaration::new("due", PropertyType::Date))
                .property(PropertyDeclaration::new("paid", PropertyType::Boolean))
                .property(PropertyDeclaration::enumeration("status", ["open", "closed"])),
        ])
        .unwrap();
        model.entity("orders").unwrap().clone()
    }

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn drops_id_and_undeclared_keys() {
        let out = RequestValidator::sanitize(&entity(), row(json!({"id": 4, "title": "t", "x": 1}))).unwrap();
        assert_eq!(out, row(json!({"title": "t"})));
    }

    #[test]
    fn relation_by_name_or_column() {
        let e = entity();
        let a = RequestValidator::sanitize(&e, row(json!({"customer": 3}))).unwrap();
        let b = RequestValidator::sanitize(&e, row(json!({"customer_id": "3"}))).unwrap();
        let c = RequestValidator::sanitize(&e, row(json!({"customer": {"id": 3, "name": "x"}}))).unwrap();
        assert_eq!(a, row(json!({"customer_id": 3})));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(RequestValidator::sanitize(&e, row(json!({"customer": "abc"}))).is_err());
    }

    #[test]
    fn type_mismatches_are_validation_errors() {
        let e = entity();
        for bad in [
            json!({"title": 5}),
            json!({"contact": "nope"}),
            json!({"total": "ten"}),
            json!({"due": "yesterday"}),
            json!({"paid": "yes"}),
            json!({"status": "archived"}),
        ] {
            assert!(
                matches!(RequestValidator::sanitize(&e, row(bad.clone())), Err(AppError::Validation(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn normalizes_decimals_and_dates() {
        let out = RequestValidator::sanitize(&entity(), row(json!({"total": 12.5, "due": "2024-03-01T10:00:00Z"}))).unwrap();
        assert_eq!(out["total"], json!("12.50"));
        assert_eq!(out["due"], json!("2024-03-01"));
    }

    #[test]
    fn nulls_pass_sanitize_but_not_require() {
        let e = entity();
        let out = RequestValidator::sanitize(&e, row(json!({"title": null, "status": null}))).unwrap();
        assert!(matches!(RequestValidator::require(&e, &out), Err(AppError::Validation(_))));
        assert!(RequestValidator::require(&e, &row(json!({"title": "x"}))).is_ok());
    }
}
