//! In-memory row store. One table per entity, identity assignment serialized by the write lock.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::store::{value_as_id, InFilter, Row, RowQuery, RowStore, ID_COLUMN};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(row: &Row, filters: &[InFilter]) -> bool {
    filters.iter().all(|f| {
        row.get(&f.column)
            .and_then(value_as_id)
            .map(|v| f.values.contains(&v))
            .unwrap_or(false)
    })
}

/// Keep only declared columns; absent ones become null.
fn project(entity: &ResolvedEntity, id: i64, mut values: Row) -> Row {
    let mut row = Row::new();
    row.insert(ID_COLUMN.to_string(), Value::from(id));
    for prop in &entity.properties {
        let v = values.remove(&prop.column).unwrap_or(Value::Null);
        row.insert(prop.column.clone(), v);
    }
    row
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, entity: &ResolvedEntity, query: &RowQuery) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&entity.table_name) else {
            return Ok(Vec::new());
        };
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        Ok(table
            .rows
            .values()
            .rev()
            .filter(|row| matches(row, &query.filters))
            .skip(query.offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, entity: &ResolvedEntity, filters: &[InFilter]) -> Result<u64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&entity.table_name)
            .map(|t| t.rows.values().filter(|row| matches(row, filters)).count() as u64)
            .unwrap_or(0))
    }

    async fn find_by_ids(&self, entity: &ResolvedEntity, ids: &[i64]) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&entity.table_name) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| table.rows.get(id).cloned()).collect())
    }

    async fn find_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Row>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&entity.table_name).and_then(|t| t.rows.get(&id).cloned()))
    }

    async fn insert(&self, entity: &ResolvedEntity, values: Row) -> Result<Row, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(entity.table_name.clone()).or_default();
        let id = table.next_id;
        table.next_id += 1;
        let row = project(entity, id, values);
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, entity: &ResolvedEntity, id: i64, values: Row) -> Result<Option<Row>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.get_mut(&entity.table_name).and_then(|t| t.rows.get_mut(&id)) else {
            return Ok(None);
        };
        for (column, v) in values {
            if entity.property_by_column(&column).is_some() {
                row.insert(column, v);
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(&entity.table_name)
            .map(|t| t.rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn truncate(&self, entity: &ResolvedEntity) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.insert(entity.table_name.clone(), Table::default());
        Ok(())
    }
}
