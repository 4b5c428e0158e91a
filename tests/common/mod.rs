#![allow(dead_code)]

use entity_engine::{
    resolve, AppError, AppState, EntityDeclaration, MemoryStore, Operation, Policy, PropertyDeclaration,
    PropertyType, Row,
};
use serde_json::Value;
use std::sync::Arc;

pub const CUSTOMER_SEED: u64 = 7;
pub const PRODUCT_SEED: u64 = 4;
pub const ORDER_SEED: u64 = 12;

/// Small shop: orders refer to customers and products; secrets need a principal.
pub fn shop() -> Vec<EntityDeclaration> {
    vec![
        EntityDeclaration::new("Order")
            .seed_count(ORDER_SEED)
            .property(PropertyDeclaration::relation("customer", "Customer"))
            .property(PropertyDeclaration::relation("product", "Product"))
            .property(PropertyDeclaration::new("quantity", PropertyType::Number).generator(|i, _| Ok(Value::from(i % 3 + 1))))
            .property(PropertyDeclaration::new("total", PropertyType::Currency))
            .property(PropertyDeclaration::text("customer_name"))
            .property(PropertyDeclaration::enumeration("status", ["pending", "shipped"]))
            .pre_insert(|row, related| {
                if let Some(name) = related.get("customer").and_then(|c| c.get("name")) {
                    row.insert("customer_name".into(), name.clone());
                }
                let price = related
                    .get("product")
                    .and_then(|p| p.get("price"))
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<f64>().ok());
                let quantity = row.get("quantity").and_then(Value::as_f64);
                if let (Some(price), Some(quantity)) = (price, quantity) {
                    row.insert("total".into(), Value::String(format!("{:.2}", price * quantity)));
                }
                Ok(())
            }),
        EntityDeclaration::new("Customer")
            .seed_count(CUSTOMER_SEED)
            .property(PropertyDeclaration::text("name").required())
            .property(PropertyDeclaration::new("email", PropertyType::Email))
            .property(PropertyDeclaration::new("password", PropertyType::Password))
            .property(PropertyDeclaration::enumeration("tier", ["standard", "gold"]))
            .policy(Operation::Delete, Policy::Role("admin".into())),
        EntityDeclaration::new("Product")
            .seed_count(PRODUCT_SEED)
            .property(PropertyDeclaration::text("name"))
            .property(PropertyDeclaration::new("price", PropertyType::Currency)),
        EntityDeclaration::new("Secret")
            .seed_count(2)
            .property(PropertyDeclaration::text("value"))
            .policy(Operation::Read, Policy::Authenticated)
            .policy(Operation::Create, Policy::Role("admin".into())),
    ]
}

pub fn state() -> AppState {
    let model = resolve(&shop()).unwrap();
    AppState::new(model, Arc::new(MemoryStore::new()))
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

pub async fn create(state: &AppState, slug: &str, value: Value) -> Result<Value, AppError> {
    state.crud().create(slug, row(value)).await
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}
