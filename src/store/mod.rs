//! Row storage behind a trait: in-memory for tests and demos, PostgreSQL for deployments.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::ResolvedEntity;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One stored record: column name -> value.
pub type Row = Map<String, Value>;

/// Primary identifier column of every entity table.
pub const ID_COLUMN: &str = "id";

/// `column IN (values)` constraint on an integer (foreign key) column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InFilter {
    pub column: String,
    pub values: Vec<i64>,
}

/// List query. Rows always come back ordered by identifier, most recent first.
#[derive(Clone, Debug, Default)]
pub struct RowQuery {
    pub filters: Vec<InFilter>,
    pub limit: Option<u64>,
    pub offset: u64,
}

#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, entity: &ResolvedEntity, query: &RowQuery) -> Result<Vec<Row>, AppError>;

    async fn count(&self, entity: &ResolvedEntity, filters: &[InFilter]) -> Result<u64, AppError>;

    async fn find_by_ids(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError>;

    async fn find_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError>;

    /// Insert declared columns from `values`; the store assigns the identifier.
    async fn insert(&self, entity: &ResolvedEntity, values: Row) -> Result<Row, AppError>;

    /// Overwrite the columns present in `values`. None if the id does not exist.
    async fn update(&self, entity: &ResolvedEntity, id: i64, values: Row) -> Result<Option<Row>, AppError>;

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError>;

    /// Remove every row and restart the identity counter at 1.
    async fn truncate(&self, entity: &ResolvedEntity) -> Result<(), AppError>;
}

/// Reads an identifier out of a JSON value (number or numeric string).
pub fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
