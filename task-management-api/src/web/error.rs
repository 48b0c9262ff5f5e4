use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::task::TaskServiceError;

/// One entry of a validation error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Where the bad input came from, e.g. `["body", "title"]`
    pub loc: Vec<String>,
    /// Human-readable description of the problem
    pub msg: String,
    /// Machine-readable error kind
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

/// JSON body for 422 responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub detail: Vec<FieldError>,
}

/// JSON body for 404 and 500 responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailResponse {
    pub detail: String,
}

/// Errors returned by the JSON handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse { detail: errors }),
            )
                .into_response(),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(DetailResponse { detail: message })).into_response()
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DetailResponse {
                    detail: "Internal server error".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        let description = err.to_string();
        match err {
            TaskServiceError::InvalidField { field, message } => {
                let error = FieldError::new(&["body", field], message, "value_error");
                ApiError::Validation(vec![error])
            }
            TaskServiceError::TaskNotFound(_) => {
                tracing::info!("{}", description);
                ApiError::NotFound(description)
            }
            TaskServiceError::Database(_) => {
                tracing::error!("Task storage failed: {}", description);
                ApiError::Internal
            }
        }
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
