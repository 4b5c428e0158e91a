//! Model metadata for generic UI collaborators.

use crate::config::{EntityDefinition, PropertyDescriptor};
use crate::error::AppError;
use crate::extractors::MaybePrincipal;
use crate::policy::{Operation, PolicyGate};
use crate::response::success_many;
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct EntityMeta<'a> {
    pub entity: &'a EntityDefinition,
    pub properties: &'a [PropertyDescriptor],
}

/// Every entity the principal may read, with its property descriptors.
pub async fn meta(State(state): State<AppState>, principal: MaybePrincipal) -> Result<Response, AppError> {
    let entries: Vec<EntityMeta<'_>> = state
        .model
        .iter()
        .filter(|e| PolicyGate::can_perform(Operation::Read, e, principal.principal()))
        .map(|e| EntityMeta {
            entity: &e.definition,
            properties: &e.properties,
        })
        .collect();
    Ok(success_many(entries).into_response())
}
