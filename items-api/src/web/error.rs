use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::item::{InvalidField, StoreError};

/// One entry of a validation error list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|part| part.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// Errors returned by the item handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn item_not_found() -> Self {
        ApiError::NotFound("Item not found".to_string())
    }

    /// Wraps body-field problems found by the item validators.
    pub fn invalid_body(problems: Vec<InvalidField>) -> Self {
        ApiError::Validation(
            problems
                .into_iter()
                .map(|problem| {
                    FieldError::new(&["body", problem.field], problem.message, "value_error")
                })
                .collect(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "detail": errors }),
            ),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "detail": message }))
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "detail": "Internal server error" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Item store failed: {}", err);
        ApiError::Internal
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["body"],
            rejection.body_text(),
            "json_invalid",
        )])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["path"],
            rejection.body_text(),
            "path_invalid",
        )])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["query"],
            rejection.body_text(),
            "query_invalid",
        )])
    }
}
