use crate::entities::sea_orm_active_enums::{TaskPriority, TaskStatus};
use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::*;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i32,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns the storage-assigned ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the task was last changed. Never earlier than `created_at`.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A partial update. `None` leaves a field untouched; for the nullable
/// fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// A supplied field breaks one of the task invariants.
    #[error("Invalid value for '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct TaskService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TaskService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        TaskService { db }
    }

    /// Creates a new task. The store assigns the ID; both timestamps are set
    /// to the same instant.
    ///
    /// # Returns
    ///
    /// The stored task, or `InvalidField` when the title is blank.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskServiceError> {
        validate_title(&new_task.title)?;

        let now = Utc::now();
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(new_task.description),
            status: ActiveValue::Set(new_task.status),
            priority: ActiveValue::Set(new_task.priority),
            due_date: ActiveValue::Set(new_task.due_date),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        tracing::info!(task_id = created_model.id, "Created task");
        Ok(Task::from(created_model))
    }

    /// Retrieves one page of tasks in storage order.
    ///
    /// # Arguments
    ///
    /// * `skip` - Number of tasks to pass over.
    /// * `limit` - Maximum number of tasks to return.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, skip: u64, limit: u64) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        let task_model = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        Ok(Task::from(task_model))
    }

    /// Applies a partial update to a task.
    ///
    /// Only the fields present in `changes` are written. `updated_at` is
    /// refreshed even when every supplied value equals the stored one. The
    /// read and the write share one transaction; any early return drops it
    /// uncommitted.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_by_id(
        &self,
        id: i32,
        changes: TaskChanges,
    ) -> Result<Task, TaskServiceError> {
        if let Some(title) = &changes.title {
            validate_title(title)?;
        }

        let txn = self.db.begin().await?;
        let task_to_update = task::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        let updated_at = Utc::now().max(task_to_update.created_at);
        let mut active_model: task::ActiveModel = task_to_update.into();
        if let Some(title) = changes.title {
            active_model.title = ActiveValue::Set(title);
        }
        if let Some(description) = changes.description {
            active_model.description = ActiveValue::Set(description);
        }
        if let Some(status) = changes.status {
            active_model.status = ActiveValue::Set(status);
        }
        if let Some(priority) = changes.priority {
            active_model.priority = ActiveValue::Set(priority);
        }
        if let Some(due_date) = changes.due_date {
            active_model.due_date = ActiveValue::Set(due_date);
        }
        active_model.updated_at = ActiveValue::Set(updated_at);

        let updated_model = active_model.update(&txn).await?;
        txn.commit().await?;
        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID. The row is removed for good.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: i32) -> Result<(), TaskServiceError> {
        let result = task::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(TaskServiceError::TaskNotFound(id));
        }
        tracing::info!(task_id = id, "Deleted task");
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), TaskServiceError> {
    if title.trim().is_empty() {
        return Err(TaskServiceError::InvalidField {
            field: "title",
            message: "Title must not be empty".to_string(),
        });
    }
    Ok(())
}
