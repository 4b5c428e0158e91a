//! Entity CRUD handlers keyed by slug. Each checks the access policy before touching rows.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::extractors::MaybePrincipal;
use crate::policy::{Operation, PolicyGate};
use crate::response::{success_created, success_many, success_one};
use crate::service::{page_offset, ListOptions, Listing};
use crate::state::AppState;
use crate::store::Row;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

const PAGE_PARAM: &str = "page";
const PAGINATED_PARAM: &str = "paginated";

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))
}

fn body_to_row(value: Value) -> Result<Row, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Resolve the slug and check the policy. Unknown slugs and denials both surface as 404.
fn authorized<'a>(
    state: &'a AppState,
    slug: &str,
    operation: Operation,
    principal: &MaybePrincipal,
) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("entity '{}'", slug)))?;
    PolicyGate::authorize(operation, entity, principal.principal())?;
    Ok(entity)
}

/// Split query pairs into list options and filters. Repeated filter keys collect into an array.
fn list_params(params: Vec<(String, String)>) -> Result<(ListOptions, Vec<(String, Value)>), AppError> {
    let mut options = ListOptions::page(1);
    let mut filters: Vec<(String, Value)> = Vec::new();
    for (key, value) in params {
        match key.as_str() {
            PAGE_PARAM => {
                options.page = value
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("invalid page '{}'", value)))?;
                page_offset(options.page)?;
            }
            PAGINATED_PARAM => {
                options.paginated = !matches!(value.as_str(), "false" | "0");
            }
            _ => match filters.iter_mut().find(|(k, _)| *k == key) {
                Some((_, Value::Array(items))) => items.push(Value::String(value)),
                Some((_, existing)) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
                None => filters.push((key, Value::String(value))),
            },
        }
    }
    Ok((options, filters))
}

pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    principal: MaybePrincipal,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    authorized(&state, &slug, Operation::Read, &principal)?;
    let (options, filters) = list_params(params)?;
    Ok(match state.crud().find_all(&slug, &filters, options).await? {
        Listing::Page(page) => Json(page).into_response(),
        Listing::All(rows) => success_many(rows).into_response(),
    })
}

pub async fn select_options(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    principal: MaybePrincipal,
) -> Result<impl IntoResponse, AppError> {
    authorized(&state, &slug, Operation::Read, &principal)?;
    let options = state.crud().find_select_options(&slug).await?;
    Ok(success_many(options))
}

pub async fn read(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
    principal: MaybePrincipal,
) -> Result<impl IntoResponse, AppError> {
    authorized(&state, &slug, Operation::Read, &principal)?;
    let id = parse_id(&id_str)?;
    let row = state.crud().find_one(&slug, id).await?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    principal: MaybePrincipal,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    authorized(&state, &slug, Operation::Create, &principal)?;
    let row = state.crud().create(&slug, body_to_row(body)?).await?;
    Ok(success_created(row))
}

/// Serves both PUT and PATCH: only the keys present in the body are changed.
pub async fn update(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
    principal: MaybePrincipal,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    authorized(&state, &slug, Operation::Update, &principal)?;
    let id = parse_id(&id_str)?;
    let row = state.crud().update(&slug, id, body_to_row(body)?).await?;
    Ok(success_one(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
    principal: MaybePrincipal,
) -> Result<impl IntoResponse, AppError> {
    authorized(&state, &slug, Operation::Delete, &principal)?;
    let id = parse_id(&id_str)?;
    let result = state.crud().delete(&slug, id).await?;
    Ok(success_one(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn list_params_split_options_from_filters() {
        let (options, filters) =
            list_params(pairs(&[("page", "3"), ("customer", "1"), ("customer", "2"), ("status", "x")])).unwrap();
        assert!(options.paginated);
        assert_eq!(options.page, 3);
        assert_eq!(
            filters,
            vec![
                ("customer".to_string(), json!(["1", "2"])),
                ("status".to_string(), json!("x")),
            ]
        );
    }

    #[test]
    fn list_params_reject_bad_page() {
        assert!(matches!(list_params(pairs(&[("page", "two")])), Err(AppError::BadRequest(_))));
        assert!(matches!(
            list_params(pairs(&[("page", "18446744073709551615")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            list_params(pairs(&[("page", "99999999999999999999")])),
            Err(AppError::BadRequest(_))
        ));
        let (options, _) = list_params(pairs(&[("paginated", "false")])).unwrap();
        assert!(!options.paginated);
    }

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
    }
}
