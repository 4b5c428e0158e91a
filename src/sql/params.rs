//! Convert serde_json::Value into values sqlx can bind.
//!
//! Column values are bound as text and cast in SQL (`$n::<type>`), so one
//! representation covers every storage type.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Text(Option<String>),
    Id(i64),
    IdList(Vec<i64>),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        BindValue::Text(match v {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => Some(v.to_string()),
        })
    }
}

/// Bind every parameter of a built query, in order.
pub fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, params: &[BindValue]) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            BindValue::Text(s) => query.bind(s.clone()),
            BindValue::Id(id) => query.bind(*id),
            BindValue::IdList(ids) => query.bind(ids.clone()),
        };
    }
    query
}
