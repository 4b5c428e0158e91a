//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Raised while resolving declarations. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown property type '{type_name}' on {entity}.{property}")]
    UnknownPropertyType {
        entity: String,
        property: String,
        type_name: String,
    },
    #[error("relation {entity}.{property} does not declare a target entity")]
    MissingRelationTarget { entity: String, property: String },
    #[error("relation {entity}.{property} targets unregistered entity '{target}'")]
    UnknownRelationTarget {
        entity: String,
        property: String,
        target: String,
    },
    #[error("enum {entity}.{property} does not declare any values")]
    MissingEnumValues { entity: String, property: String },
    #[error("duplicate slug: {0}")]
    DuplicateSlug(String),
    #[error("slug '{0}' is reserved by a built-in route")]
    ReservedSlug(String),
    #[error("entities {first} and {second} both map to table '{table}'")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },
    #[error("{entity} identifier '{identifier}' is not a property of the entity")]
    UnknownIdentifier { entity: String, identifier: String },
    #[error("duplicate entity name: {0}")]
    DuplicateEntityName(String),
    #[error("duplicate property {entity}.{property}")]
    DuplicateProperty { entity: String, property: String },
    #[error("declarations load: {0}")]
    Load(String),
}

/// A synthetic value generator failed; aborts the seeding run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct GeneratorError(pub String);

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{operation} denied on {entity}")]
    PolicyDenied { operation: String, entity: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("generator for {entity}.{property} failed: {source}")]
    Generator {
        entity: String,
        property: String,
        #[source]
        source: GeneratorError,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            // Denials look exactly like unknown entities to the client.
            AppError::NotFound(_) | AppError::PolicyDenied { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Generator { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "seed_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
        };
        let message = match &self {
            AppError::PolicyDenied { entity, .. } => format!("not found: {}", entity),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
