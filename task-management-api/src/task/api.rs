use crate::entities::sea_orm_active_enums::{TaskPriority, TaskStatus};
use crate::task::{NewTask, Task, TaskChanges, TaskService};
use crate::web::error::{ApiError, DetailResponse, FieldError, ValidationErrorResponse};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A client-supplied timestamp.
///
/// Accepts RFC 3339 (`2025-12-31T23:59:59Z`), date-times with a `+HHMM` or
/// `+HH:MM` offset, naive date-times with `T` or a space and optional
/// seconds, and bare dates. Anything without an offset is read as UTC, a
/// bare date as midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate(DateTime<Utc>);

impl DueDate {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(timestamp.with_timezone(&Utc)));
        }
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(raw, format).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .or_else(|| {
                NAIVE_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
            .map(Self)
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DueDate::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid datetime '{}'", raw)))
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// JSON payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreate {
    /// Short name of the task; must not be empty
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    priority: TaskPriority,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = DateTime)]
    due_date: Option<DueDate>,
}

impl From<TaskCreate> for NewTask {
    fn from(payload: TaskCreate) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            status: payload.status,
            priority: payload.priority,
            due_date: payload.due_date.map(DueDate::into_inner),
        }
    }
}

/// JSON payload for a partial update. Absent keys are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskUpdate {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    title: Option<Option<String>>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<TaskStatus>)]
    status: Option<Option<TaskStatus>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<TaskPriority>)]
    priority: Option<Option<TaskPriority>>,
    /// `null` clears the due date
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    due_date: Option<Option<DueDate>>,
}

impl TryFrom<TaskUpdate> for TaskChanges {
    type Error = ApiError;

    fn try_from(payload: TaskUpdate) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        let title = reject_null(payload.title, "title", &mut errors);
        let status = reject_null(payload.status, "status", &mut errors);
        let priority = reject_null(payload.priority, "priority", &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(Self {
            title,
            description: payload.description,
            status,
            priority,
            due_date: payload
                .due_date
                .map(|due_date| due_date.map(DueDate::into_inner)),
        })
    }
}

fn reject_null<T>(
    value: Option<Option<T>>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match value {
        Some(None) => {
            errors.push(FieldError::new(
                &["body", field],
                format!("'{}' may not be null", field),
                "null_invalid",
            ));
            None
        }
        Some(Some(value)) => Some(value),
        None => None,
    }
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier assigned by the store
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            status: task.status(),
            priority: task.priority(),
            due_date: task.due_date(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Query parameters for paging through tasks.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Number of tasks to skip (>= 0)
    #[serde(default)]
    skip: i64,
    /// Maximum number of tasks to return (1..=100)
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    MAX_PAGE_SIZE
}

impl Pagination {
    /// Checks the bounds and returns `(skip, limit)` ready for the store.
    fn validate(&self) -> Result<(u64, u64), ApiError> {
        let mut errors = Vec::new();
        if self.skip < 0 {
            errors.push(FieldError::new(
                &["query", "skip"],
                "Input should be greater than or equal to 0",
                "greater_than_equal",
            ));
        }
        if self.limit < 1 {
            errors.push(FieldError::new(
                &["query", "limit"],
                "Input should be greater than or equal to 1",
                "greater_than_equal",
            ));
        } else if self.limit > MAX_PAGE_SIZE {
            errors.push(FieldError::new(
                &["query", "limit"],
                format!("Input should be less than or equal to {}", MAX_PAGE_SIZE),
                "less_than_equal",
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok((self.skip as u64, self.limit as u64))
    }
}

/// Handler for POST /tasks/ - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks/",
    request_body = TaskCreate,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 422, description = "Invalid task", body = ValidationErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    WithRejection(Json(payload), _): WithRejection<Json<TaskCreate>, ApiError>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let task = TaskService::new(&state.db).create_task(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for GET /tasks/ - Returns one page of tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/",
    params(Pagination),
    responses(
        (status = 200, description = "Page of tasks", body = Vec<TaskJson>),
        (status = 422, description = "Invalid paging parameters", body = ValidationErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, ApiError>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let (skip, limit) = pagination.validate()?;
    let tasks = TaskService::new(&state.db).list_tasks(skip, limit).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/{task_id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    params(("task_id" = i32, Path, description = "ID of the task")),
    responses(
        (status = 200, description = "The task", body = TaskJson),
        (status = 404, description = "No task with that ID", body = DetailResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    WithRejection(Path(task_id), _): WithRejection<Path<i32>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let task = TaskService::new(&state.db).get_task_by_id(task_id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PATCH /tasks/{task_id} - Applies a partial update.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/tasks/{task_id}",
    params(("task_id" = i32, Path, description = "ID of the task")),
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "The updated task", body = TaskJson),
        (status = 404, description = "No task with that ID", body = DetailResponse),
        (status = 422, description = "Invalid field value", body = ValidationErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    WithRejection(Path(task_id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<TaskUpdate>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let changes = TaskChanges::try_from(payload)?;
    let task = TaskService::new(&state.db)
        .update_task_by_id(task_id, changes)
        .await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /tasks/{task_id} - Removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    params(("task_id" = i32, Path, description = "ID of the task")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No task with that ID", body = DetailResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    WithRejection(Path(task_id), _): WithRejection<Path<i32>, ApiError>,
) -> Result<StatusCode, ApiError> {
    TaskService::new(&state.db).delete_task_by_id(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Task Management API",
        description = "A RESTful API for managing tasks with full CRUD operations"
    ),
    paths(
        create_task_handler,
        list_tasks_handler,
        get_task_handler,
        update_task_handler,
        delete_task_handler
    )
)]
pub struct TaskApiDoc;

/// Creates and returns the tasks router. `/tasks` and `/tasks/` both address
/// the collection.
pub fn create_task_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{task_id}",
            get(get_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn can_parse_naive_due_date_as_utc() {
        let due_date = DueDate::parse("2025-12-31T23:59:59").unwrap();
        assert_eq!(
            due_date.into_inner(),
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn can_parse_offset_due_date() {
        let due_date = DueDate::parse("2026-01-01T01:00:00+02:00").unwrap();
        assert_eq!(
            due_date.into_inner(),
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn can_parse_compact_offset_due_date() {
        let due_date = DueDate::parse("2025-12-31T23:59:59+0200").unwrap();
        assert_eq!(
            due_date.into_inner(),
            Utc.with_ymd_and_hms(2025, 12, 31, 21, 59, 59).unwrap()
        );
    }

    #[test]
    fn can_parse_loose_naive_due_dates_as_utc() {
        for (raw, expected) in [
            ("2025-12-31", Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0)),
            ("2025-12-31 23:59:59", Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59)),
            ("2025-12-31T23:59", Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0)),
            ("2025-12-31 23:59", Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0)),
        ] {
            let due_date = DueDate::parse(raw).unwrap();
            assert_eq!(due_date.into_inner(), expected.unwrap(), "{}", raw);
        }
    }

    #[test]
    fn can_reject_garbage_due_date() {
        for raw in ["next tuesday", "2025-13-01", "2025-12-31T25:00", "31/12/2025"] {
            assert!(DueDate::parse(raw).is_none(), "{}", raw);
        }
    }

    #[test]
    fn can_default_create_payload_fields() {
        let payload: TaskCreate =
            serde_json::from_str(r#"{"title": "Complete project"}"#).unwrap();
        let new_task = NewTask::from(payload);
        assert_eq!(new_task, NewTask::new("Complete project"));
    }

    #[test]
    fn can_tell_null_from_absent_in_update() {
        let payload: TaskUpdate =
            serde_json::from_str(r#"{"description": null, "status": "completed"}"#).unwrap();
        let changes = TaskChanges::try_from(payload).unwrap();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.status, Some(TaskStatus::Completed));
        assert_eq!(changes.title, None);
        assert_eq!(changes.due_date, None);
    }

    #[test]
    fn can_reject_null_for_required_fields() {
        let payload: TaskUpdate =
            serde_json::from_str(r#"{"title": null, "priority": null}"#).unwrap();
        match TaskChanges::try_from(payload) {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.loc[1].as_str()).collect();
                assert_eq!(fields, vec!["title", "priority"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn can_validate_page_bounds() {
        let ok = Pagination { skip: 2, limit: 3 };
        assert_eq!(ok.validate().unwrap(), (2, 3));

        let too_big = Pagination { skip: 0, limit: 101 };
        assert!(too_big.validate().is_err());

        let negative = Pagination { skip: -1, limit: 0 };
        match negative.validate() {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
