//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and DDL from a resolved entity.

use crate::config::{PropertyDescriptor, PropertyType, ResolvedEntity, StorageType};
use crate::sql::BindValue;
use crate::store::{InFilter, Row, RowQuery, ID_COLUMN};

/// Quote identifier for PostgreSQL (safe: only from declarations).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Column type used in DDL and as the cast target of bound text parameters.
pub fn pg_type(prop: &PropertyDescriptor) -> &'static str {
    if prop.property_type == PropertyType::Relation {
        return "bigint";
    }
    match prop.storage {
        StorageType::String | StorageType::Enum => "text",
        StorageType::Number => "double precision",
        StorageType::Decimal => "numeric(14,2)",
        StorageType::Boolean => "boolean",
        StorageType::Date => "date",
        StorageType::Json => "jsonb",
    }
}

/// SELECT list: decimal and date columns as text so they decode to strings.
fn select_column_list(entity: &ResolvedEntity) -> String {
    std::iter::once(quoted(ID_COLUMN))
        .chain(entity.properties.iter().map(|p| {
            let q = quoted(&p.column);
            match p.storage {
                StorageType::Decimal | StorageType::Date => format!("{}::text AS {}", q, q),
                _ => q,
            }
        }))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholder(prop: &PropertyDescriptor, n: u32) -> String {
    format!("${}::{}", n, pg_type(prop))
}

fn where_clause(q: &mut QueryBuf, filters: &[InFilter]) -> String {
    let parts: Vec<String> = filters
        .iter()
        .map(|f| {
            let n = q.push_param(BindValue::IdList(f.values.clone()));
            format!("{} = ANY(${})", quoted(&f.column), n)
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT list with IN filters, ORDER BY id DESC, optional LIMIT/OFFSET.
/// Filter columns must already be checked against the entity by the caller.
pub fn select_list(entity: &ResolvedEntity, schema: &str, query: &RowQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let where_clause = where_clause(&mut q, &query.filters);
    let limit_clause = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = if query.offset > 0 {
        format!(" OFFSET {}", query.offset)
    } else {
        String::new()
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} DESC{}{}",
        select_column_list(entity),
        table,
        where_clause,
        quoted(ID_COLUMN),
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(entity: &ResolvedEntity, schema: &str, filters: &[InFilter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let where_clause = where_clause(&mut q, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);
    q
}

/// SELECT by primary key. Caller adds id as sole param.
pub fn select_by_id(entity: &ResolvedEntity, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_column_list(entity),
        table,
        quoted(ID_COLUMN)
    );
    q
}

/// SELECT rows whose id is in `ids`. Used for batch-loading related rows.
pub fn select_by_ids(entity: &ResolvedEntity, schema: &str, ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let n = q.push_param(BindValue::IdList(ids.to_vec()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ANY(${})",
        select_column_list(entity),
        table,
        quoted(ID_COLUMN),
        n
    );
    q
}

/// INSERT the declared columns present in `values`; the id comes from the identity column.
pub fn insert(entity: &ResolvedEntity, schema: &str, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for prop in &entity.properties {
        let Some(v) = values.get(&prop.column) else { continue };
        let n = q.push_param(BindValue::from_json(v));
        cols.push(quoted(&prop.column));
        placeholders.push(placeholder(prop, n));
    }
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only declared columns present in `values`.
pub fn update(entity: &ResolvedEntity, schema: &str, id: i64, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let mut sets = Vec::new();
    for (column, v) in values {
        let Some(prop) = entity.property_by_column(column) else { continue };
        let n = q.push_param(BindValue::from_json(v));
        sets.push(format!("{} = {}", quoted(column), placeholder(prop, n)));
    }
    let id_param = q.push_param(BindValue::Id(id));
    let returning = select_column_list(entity);
    q.sql = if sets.is_empty() {
        format!("SELECT {} FROM {} WHERE {} = ${}", returning, table, quoted(ID_COLUMN), id_param)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            table,
            sets.join(", "),
            quoted(ID_COLUMN),
            id_param,
            returning
        )
    };
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let n = q.push_param(BindValue::Id(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${} RETURNING {}",
        table,
        quoted(ID_COLUMN),
        n,
        quoted(ID_COLUMN)
    );
    q
}

pub fn truncate(entity: &ResolvedEntity, schema: &str) -> String {
    format!(
        "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
        qualified_table(schema, &entity.table_name)
    )
}

/// CREATE TABLE IF NOT EXISTS from storage types. Existing tables are left untouched.
pub fn create_table(entity: &ResolvedEntity, schema: &str) -> String {
    let mut col_defs = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted(ID_COLUMN))];
    for prop in &entity.properties {
        let mut def = format!("{} {}", quoted(&prop.column), pg_type(prop).to_uppercase());
        if !prop.options.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(values) = prop.enum_values() {
            let list: Vec<String> = values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect();
            def.push_str(&format!(" CHECK ({} IN ({}))", quoted(&prop.column), list.join(", ")));
        }
        col_defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table(schema, &entity.table_name),
        col_defs.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityDeclaration, PropertyDeclaration, PropertyType};
    use serde_json::json;

    fn orders() -> ResolvedEntity {
        let model = resolve(&[
            EntityDeclaration::new("Customer").property(PropertyDeclaration::text("name")),
            EntityDeclaration::new("Order")
                .property(PropertyDeclaration::relation("customer", "Customer"))
                .property(PropertyDeclaration::new("total", PropertyType::Currency).required())
                .property(PropertyDeclaration::enumeration("status", ["open", "o'clock"])),
        ])
        .unwrap();
        model.entity("orders").unwrap().clone()
    }

    #[test]
    fn select_list_with_filters_and_paging() {
        let q = select_list(
            &orders(),
            "public",
            &RowQuery {
                filters: vec![InFilter {
                    column: "customer_id".into(),
                    values: vec![1, 2],
                }],
                limit: Some(10),
                offset: 20,
            },
        );
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"customer_id\", \"total\"::text AS \"total\", \"status\" FROM \"public\".\"orders\" \
             WHERE \"customer_id\" = ANY($1) ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn insert_casts_placeholders() {
        let values = json!({"customer_id": 3, "total": "9.99"}).as_object().cloned().unwrap();
        let q = insert(&orders(), "shop", &values);
        assert!(q
            .sql
            .starts_with("INSERT INTO \"shop\".\"orders\" (\"customer_id\", \"total\") VALUES ($1::bigint, $2::numeric(14,2))"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn update_ignores_undeclared_columns() {
        let values = json!({"status": "open", "evil\"col": 1}).as_object().cloned().unwrap();
        let q = update(&orders(), "public", 7, &values);
        assert!(q.sql.starts_with("UPDATE \"public\".\"orders\" SET \"status\" = $1::text WHERE \"id\" = $2"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn empty_update_is_a_select() {
        let q = update(&orders(), "public", 7, &Row::new());
        assert!(q.sql.starts_with("SELECT "));
        assert!(q.sql.ends_with("WHERE \"id\" = $1"));
    }

    #[test]
    fn ddl_from_storage_types() {
        let ddl = create_table(&orders(), "public");
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS \"public\".\"orders\" (\"id\" BIGSERIAL PRIMARY KEY, \
             \"customer_id\" BIGINT, \"total\" NUMERIC(14,2) NOT NULL, \
             \"status\" TEXT CHECK (\"status\" IN ('open', 'o''clock')))"
        );
    }

    #[test]
    fn truncate_restarts_identity() {
        assert_eq!(
            truncate(&orders(), "public"),
            "TRUNCATE TABLE \"public\".\"orders\" RESTART IDENTITY CASCADE"
        );
    }
}
