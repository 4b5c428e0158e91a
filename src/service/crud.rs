//! Generic CRUD over any registered entity, driven entirely by its descriptors.

use crate::config::{RelatedRows, ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::store::{value_as_id, InFilter, Row, RowQuery, RowStore, ID_COLUMN};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Rows per page of a paginated list.
pub const PER_PAGE: u64 = 10;

#[derive(Clone, Copy, Debug)]
pub struct ListOptions {
    pub paginated: bool,
    /// 1-indexed; values below 1 are treated as 1.
    pub page: u64,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            paginated: false,
            page: 1,
        }
    }
}

impl ListOptions {
    pub fn page(page: u64) -> Self {
        ListOptions { paginated: true, page }
    }
}

/// Row offset of a 1-indexed page. Pages whose offset does not fit a signed 64-bit
/// SQL `OFFSET` are rejected.
pub fn page_offset(page: u64) -> Result<u64, AppError> {
    page.max(1)
        .saturating_sub(1)
        .checked_mul(PER_PAGE)
        .filter(|offset| *offset <= i64::MAX as u64)
        .ok_or_else(|| AppError::BadRequest(format!("page {} is out of range", page)))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u64,
    pub last_page: u64,
    /// 1-based position of the first row on this page; 0 when the page is empty.
    pub from: u64,
    pub to: u64,
    pub total: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u64, total: u64, per_page: u64) -> Self {
        let offset = current_page.saturating_sub(1).saturating_mul(per_page);
        let (from, to) = if data.is_empty() {
            (0, 0)
        } else {
            (offset.saturating_add(1), offset.saturating_add(data.len() as u64))
        };
        Page {
            last_page: total.div_ceil(per_page),
            data,
            current_page,
            from,
            to,
            total,
            per_page,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Page(Page<Value>),
    All(Vec<Value>),
}

impl Listing {
    pub fn rows(&self) -> &[Value] {
        match self {
            Listing::Page(p) => &p.data,
            Listing::All(rows) => rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectOption {
    pub id: i64,
    pub label: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeleteResult {
    pub id: i64,
    pub affected: u64,
}

/// One service instance serves every entity; each operation resolves its entity from the slug.
#[derive(Clone)]
pub struct CrudService {
    model: Arc<ResolvedModel>,
    store: Arc<dyn RowStore>,
}

impl CrudService {
    pub fn new(model: Arc<ResolvedModel>, store: Arc<dyn RowStore>) -> Self {
        CrudService { model, store }
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    fn entity(&self, slug: &str) -> Result<&ResolvedEntity, AppError> {
        self.model
            .entity_by_slug(slug)
            .ok_or_else(|| AppError::NotFound(format!("entity '{}'", slug)))
    }

    /// List rows, most recent first, with relations expanded.
    /// Filter keys naming a relation become IN constraints on its foreign key; other keys are ignored.
    pub async fn find_all(
        &self,
        slug: &str,
        filters: &[(String, Value)],
        options: ListOptions,
    ) -> Result<Listing, AppError> {
        let entity = self.entity(slug)?;
        let filters = relation_filters(entity, filters)?;
        if !options.paginated {
            let rows = self
                .store
                .select(
                    entity,
                    &RowQuery {
                        filters,
                        ..RowQuery::default()
                    },
                )
                .await?;
            return Ok(Listing::All(self.expand(entity, rows).await?));
        }

        let page = options.page.max(1);
        let offset = page_offset(page)?;
        let total = self.store.count(entity, &filters).await?;
        let rows = self
            .store
            .select(
                entity,
                &RowQuery {
                    filters,
                    limit: Some(PER_PAGE),
                    offset,
                },
            )
            .await?;
        let data = self.expand(entity, rows).await?;
        Ok(Listing::Page(Page::new(data, page, total, PER_PAGE)))
    }

    /// Identifier + label pairs for relation pickers.
    pub async fn find_select_options(&self, slug: &str) -> Result<Vec<SelectOption>, AppError> {
        let entity = self.entity(slug)?;
        let label_column = entity.definition.prop_identifier.as_str();
        let rows = self.store.select(entity, &RowQuery::default()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get(ID_COLUMN).and_then(value_as_id)?;
                let label = row.get(label_column).cloned().unwrap_or(Value::Null);
                Some(SelectOption { id, label })
            })
            .collect())
    }

    pub async fn find_one(&self, slug: &str, id: i64) -> Result<Value, AppError> {
        let entity = self.entity(slug)?;
        let row = self
            .store
            .find_one(entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", slug, id)))?;
        self.expand_one(entity, row).await
    }

    /// Insert a row. Related rows are loaded first and handed to the entity's pre-insert hooks.
    pub async fn create(&self, slug: &str, payload: Row) -> Result<Value, AppError> {
        let entity = self.entity(slug)?;
        let mut row = RequestValidator::sanitize(entity, payload)?;
        if !entity.pre_insert.is_empty() || entity.has_relations() {
            let related = load_related(self.store.as_ref(), &self.model, entity, &row, true).await?;
            run_pre_insert(entity, &mut row, &related)?;
        }
        RequestValidator::require(entity, &row)?;
        let created = self.store.insert(entity, row).await?;
        tracing::debug!(entity = %slug, id = ?created.get(ID_COLUMN), "created row");
        self.expand_one(entity, created).await
    }

    /// Partial update: keys present in the payload overwrite (an explicit null clears), absent keys are kept.
    pub async fn update(&self, slug: &str, id: i64, payload: Row) -> Result<Value, AppError> {
        let entity = self.entity(slug)?;
        let existing = self
            .store
            .find_one(entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", slug, id)))?;
        let changes = RequestValidator::sanitize(entity, payload)?;
        if entity.has_relations() {
            load_related(self.store.as_ref(), &self.model, entity, &changes, true).await?;
        }
        let mut merged = existing;
        merged.remove(ID_COLUMN);
        merged.extend(changes);
        RequestValidator::require(entity, &merged)?;
        let updated = self
            .store
            .update(entity, id, merged)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", slug, id)))?;
        self.expand_one(entity, updated).await
    }

    pub async fn delete(&self, slug: &str, id: i64) -> Result<DeleteResult, AppError> {
        let entity = self.entity(slug)?;
        if !self.store.delete(entity, id).await? {
            return Err(AppError::NotFound(format!("{} {}", slug, id)));
        }
        tracing::debug!(entity = %slug, id, "deleted row");
        Ok(DeleteResult { id, affected: 1 })
    }

    async fn expand_one(&self, entity: &ResolvedEntity, row: Row) -> Result<Value, AppError> {
        let mut rows = self.expand(entity, vec![row]).await?;
        Ok(rows.pop().unwrap_or(Value::Null))
    }

    /// Strip sensitive columns and nest each related row under its relation property name.
    async fn expand(&self, entity: &ResolvedEntity, rows: Vec<Row>) -> Result<Vec<Value>, AppError> {
        let mut rows = rows;
        for (prop, rel) in entity.relations() {
            let target = self.model.entity(&rel.entity)?;
            let mut ids: Vec<i64> = rows
                .iter()
                .filter_map(|r| r.get(&rel.foreign_key).and_then(value_as_id))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            let related: HashMap<i64, Row> = self
                .store
                .find_by_ids(target, &ids)
                .await?
                .into_iter()
                .filter_map(|r| r.get(ID_COLUMN).and_then(value_as_id).map(|id| (id, strip_sensitive(target, r))))
                .collect();
            for row in rows.iter_mut() {
                let nested = row
                    .get(&rel.foreign_key)
                    .and_then(value_as_id)
                    .and_then(|id| related.get(&id).cloned())
                    .map(Value::Object)
                    .unwrap_or(Value::Null);
                row.insert(prop.prop_name.clone(), nested);
            }
        }
        Ok(rows
            .into_iter()
            .map(|r| Value::Object(strip_sensitive(entity, r)))
            .collect())
    }
}

fn strip_sensitive(entity: &ResolvedEntity, mut row: Row) -> Row {
    for prop in entity.properties.iter().filter(|p| p.is_sensitive()) {
        row.remove(&prop.column);
    }
    row
}

/// Coerce filter values on relation keys into IN lists. Keys may name the property or its foreign key.
pub(crate) fn relation_filters(entity: &ResolvedEntity, filters: &[(String, Value)]) -> Result<Vec<InFilter>, AppError> {
    let mut by_column: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (key, value) in filters {
        let snake = crate::case::to_snake_case(key);
        let Some((_, rel)) = entity
            .relations()
            .find(|(p, r)| p.prop_name == *key || r.foreign_key == *key || r.foreign_key == snake)
        else {
            continue;
        };
        let ids = by_column.entry(rel.foreign_key.clone()).or_default();
        for item in filter_items(value) {
            let id = value_as_id(&item)
                .ok_or_else(|| AppError::BadRequest(format!("filter {} expects integer ids, got {}", key, item)))?;
            ids.push(id);
        }
    }
    Ok(by_column
        .into_iter()
        .map(|(column, values)| InFilter { column, values })
        .collect())
}

fn filter_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(filter_items).collect(),
        Value::String(s) if s.contains(',') => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Load the rows referenced by `row`'s relation columns, keyed by relation property name.
/// With `strict`, a dangling reference is a validation error; otherwise it is skipped.
pub(crate) async fn load_related(
    store: &dyn RowStore,
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    row: &Row,
    strict: bool,
) -> Result<RelatedRows, AppError> {
    let mut related = RelatedRows::new();
    for (prop, rel) in entity.relations() {
        let Some(id) = row.get(&rel.foreign_key).and_then(value_as_id) else { continue };
        let target = model.entity(&rel.entity)?;
        match store.find_one(target, id).await? {
            Some(r) => {
                related.insert(prop.prop_name.clone(), r);
            }
            None if strict => {
                return Err(AppError::Validation(format!(
                    "{}: no {} row with id {}",
                    prop.prop_name, rel.entity, id
                )));
            }
            None => {}
        }
    }
    Ok(related)
}

pub(crate) fn run_pre_insert(entity: &ResolvedEntity, row: &mut Row, related: &RelatedRows) -> Result<(), AppError> {
    for hook in &entity.pre_insert {
        hook.run(row, related)?;
    }
    if !entity.pre_insert.is_empty() {
        tracing::debug!(entity = %entity.slug(), hooks = entity.pre_insert.len(), "ran pre-insert hooks");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityDeclaration, PropertyDeclaration};
    use serde_json::json;

    #[test]
    fn page_math() {
        let p = Page::new(vec![1, 2, 3], 3, 23, 10);
        assert_eq!((p.last_page, p.from, p.to), (3, 21, 23));
        let p = Page::new(vec![0; 10], 1, 23, 10);
        assert_eq!((p.from, p.to), (1, 10));
        let p: Page<i32> = Page::new(Vec::new(), 4, 23, 10);
        assert_eq!((p.last_page, p.from, p.to), (3, 0, 0));
        let p: Page<i32> = Page::new(Vec::new(), 1, 0, 10);
        assert_eq!(p.last_page, 0);
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        assert_eq!(page_offset(0).unwrap(), 0);
        assert_eq!(page_offset(3).unwrap(), 20);
        assert!(matches!(page_offset(u64::MAX), Err(AppError::BadRequest(_))));
        let p: Page<i32> = Page::new(vec![1], u64::MAX, 5, 10);
        assert_eq!(p.from, u64::MAX);
    }

    #[test]
    fn page_serializes_camel_case() {
        let v = serde_json::to_value(Page::new(vec![1], 1, 1, 10)).unwrap();
        assert_eq!(
            v,
            json!({"data": [1], "currentPage": 1, "lastPage": 1, "from": 1, "to": 1, "total": 1, "perPage": 10})
        );
    }

    #[test]
    fn filters_coerce_to_in_lists() {
        let model = resolve(&[
            EntityDeclaration::new("Customer"),
            EntityDeclaration::new("Order")
                .property(PropertyDeclaration::relation("customer", "Customer"))
                .property(PropertyDeclaration::text("note")),
        ])
        .unwrap();
        let orders = model.entity("orders").unwrap();
        let filters = vec![
            ("customer".to_string(), json!("1,2")),
            ("customerId".to_string(), json!(5)),
            ("note".to_string(), json!("ignored")),
            ("page".to_string(), json!("2")),
        ];
        let out = relation_filters(orders, &filters).unwrap();
        assert_eq!(
            out,
            vec![InFilter {
                column: "customer_id".into(),
                values: vec![1, 2, 5]
            }]
        );
        let bad = vec![("customer".to_string(), json!(["x"]))];
        assert!(matches!(relation_filters(orders, &bad), Err(AppError::BadRequest(_))));
    }
}
