//! PostgreSQL row store via sqlx.

use crate::config::{PropertyType, ResolvedEntity, ResolvedModel, StorageType};
use crate::error::AppError;
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{InFilter, Row, RowQuery, RowStore, ID_COLUMN};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row as _;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema and one table per entity if missing. Does not diff existing tables.
    pub async fn ensure_tables(&self, model: &ResolvedModel) -> Result<(), AppError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema.replace('"', "\"\"")))
            .execute(&self.pool)
            .await?;
        for entity in model.iter() {
            let ddl = sql::create_table(entity, &self.schema);
            tracing::debug!(sql = %ddl, "ensure table");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_all(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_json(entity, r)).collect()
    }

    async fn fetch_optional(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_json(entity, &r)).transpose()
    }
}

#[async_trait]
impl RowStore for PgStore {
    async fn select(&self, entity: &ResolvedEntity, query: &RowQuery) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(entity, &self.schema, query);
        self.fetch_all(entity, &q).await
    }

    async fn count(&self, entity: &ResolvedEntity, filters: &[InFilter]) -> Result<u64, AppError> {
        let q = sql::count(entity, &self.schema, filters);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn find_by_ids(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let q = sql::select_by_ids(entity, &self.schema, ids);
        self.fetch_all(entity, &q).await
    }

    async fn find_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError> {
        let mut q = sql::select_by_id(entity, &self.schema);
        q.params.push(sql::BindValue::Id(id));
        self.fetch_optional(entity, &q).await
    }

    async fn insert(&self, entity: &ResolvedEntity, values: Row) -> Result<Row, AppError> {
        let q = sql::insert(entity, &self.schema, &values);
        self.fetch_optional(entity, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, entity: &ResolvedEntity, id: i64, values: Row) -> Result<Option<Row>, AppError> {
        let q = sql::update(entity, &self.schema, id, &values);
        self.fetch_optional(entity, &q).await
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, &self.schema, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn truncate(&self, entity: &ResolvedEntity) -> Result<(), AppError> {
        let sql = sql::truncate(entity, &self.schema);
        tracing::debug!(sql = %sql, "truncate");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

/// Decode by declared storage type; select lists cast decimal/date columns to text.
fn row_to_json(entity: &ResolvedEntity, row: &PgRow) -> Result<Row, AppError> {
    let mut map = Row::new();
    let id: i64 = row.try_get(ID_COLUMN)?;
    map.insert(ID_COLUMN.to_string(), Value::from(id));
    for prop in &entity.properties {
        let name = prop.column.as_str();
        let v = if prop.property_type == PropertyType::Relation {
            row.try_get::<Option<i64>, _>(name)?.map(Value::from)
        } else {
            match prop.storage {
                StorageType::String | StorageType::Enum | StorageType::Decimal | StorageType::Date => {
                    row.try_get::<Option<String>, _>(name)?.map(Value::String)
                }
                StorageType::Number => row.try_get::<Option<f64>, _>(name)?.map(number_to_json),
                StorageType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
                StorageType::Json => row.try_get::<Option<Value>, _>(name)?,
            }
        };
        map.insert(name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(map)
}

/// Whole floats come back as JSON integers.
fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_numbers_decode_as_integers() {
        assert_eq!(number_to_json(42.0), json!(42));
        assert_eq!(number_to_json(-3.5), json!(-3.5));
        assert_eq!(number_to_json(f64::NAN), Value::Null);
    }
}
