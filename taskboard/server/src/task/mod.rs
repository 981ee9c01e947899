use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::storage::{Record, StorageError};
use crate::timestamp;
use crate::web::response::ErrorResponse;

pub mod handlers;

/// Table every task lives in.
pub const TASKS_TABLE: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task with a fresh id. Both timestamps share one instant.
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<Task> for Record {
    fn from(task: Task) -> Self {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(task.id.to_string()));
        record.insert("name".to_string(), Value::String(task.name));
        record.insert("description".to_string(), Value::String(task.description));
        record.insert(
            "completed_at".to_string(),
            task.completed_at
                .map(|at| Value::String(timestamp::format(&at)))
                .unwrap_or(Value::Null),
        );
        record.insert(
            "created_at".to_string(),
            Value::String(timestamp::format(&task.created_at)),
        );
        record.insert(
            "updated_at".to_string(),
            Value::String(timestamp::format(&task.updated_at)),
        );
        record
    }
}

/// The validated fields of a create request.
#[derive(Debug, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
}

impl NewTask {
    /// Pulls `name` and `description` out of a request body.
    ///
    /// Checks run in order and the first failure wins. A field only counts
    /// when it is a non-empty string.
    pub fn from_body(body: &Record) -> Result<Self, TaskError> {
        if body.is_empty() {
            return Err(TaskError::MissingFields);
        }
        let name = required_text(body, "name").ok_or(TaskError::MissingName)?;
        let description =
            required_text(body, "description").ok_or(TaskError::MissingDescription)?;

        Ok(Self { name, description })
    }
}

fn required_text(body: &Record, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The create body was empty or not a JSON object.
    #[error("Properties name and description are required.")]
    MissingFields,
    #[error("Property name is required.")]
    MissingName,
    #[error("Property description is required.")]
    MissingDescription,
    /// The update body carried no fields at all.
    #[error(
        "Properties name and description are missing. At least one of these properties is required."
    )]
    EmptyPatch,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            TaskError::Storage(err) => err.status(),
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Task request failed: {}", self);
        }
        ErrorResponse::new(status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn can_create_open_task_with_matching_timestamps() {
        let task = Task::new("Buy milk".to_string(), "2% lowfat".to_string());

        assert_eq!(task.completed_at, None);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.id.get_version_num(), 4);
    }

    #[test]
    fn can_convert_task_into_record() {
        let task = Task::new("Buy milk".to_string(), "2% lowfat".to_string());
        let id = task.id.to_string();

        let record = Record::from(task);

        assert_eq!(record["id"], json!(id));
        assert_eq!(record["name"], "Buy milk");
        assert_eq!(record["description"], "2% lowfat");
        assert_eq!(record["completed_at"], Value::Null);
        assert_eq!(record["created_at"], record["updated_at"]);
    }

    #[test]
    fn can_read_task_back_from_record() {
        let task = Task::new("a".to_string(), "b".to_string());
        let record = Record::from(task.clone());

        let parsed: Task = serde_json::from_value(Value::Object(record)).unwrap();

        assert_eq!(parsed.id, task.id);
        assert_eq!(parsed.name, task.name);
        assert_eq!(parsed.completed_at, None);
        // Stored timestamps are truncated to milliseconds.
        assert_eq!(
            parsed.created_at.timestamp_millis(),
            task.created_at.timestamp_millis()
        );
    }

    #[test]
    fn can_accept_complete_body() {
        let new_task =
            NewTask::from_body(&body(json!({"name": "Buy milk", "description": "2% lowfat"})))
                .unwrap();

        assert_eq!(
            new_task,
            NewTask {
                name: "Buy milk".to_string(),
                description: "2% lowfat".to_string(),
            }
        );
    }

    #[test]
    fn can_reject_empty_body() {
        let err = NewTask::from_body(&Record::new()).unwrap_err();
        assert!(matches!(err, TaskError::MissingFields));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn can_report_name_before_description() {
        let err = NewTask::from_body(&body(json!({"other": 1}))).unwrap_err();
        assert_eq!(err.to_string(), "Property name is required.");
    }

    #[test]
    fn can_report_missing_description() {
        let err = NewTask::from_body(&body(json!({"name": "x"}))).unwrap_err();
        assert_eq!(err.to_string(), "Property description is required.");
    }

    #[test]
    fn can_treat_blank_or_non_text_fields_as_missing() {
        let err = NewTask::from_body(&body(json!({"name": "", "description": "d"}))).unwrap_err();
        assert!(matches!(err, TaskError::MissingName));

        let err = NewTask::from_body(&body(json!({"name": "n", "description": 5}))).unwrap_err();
        assert!(matches!(err, TaskError::MissingDescription));
    }

    #[test]
    fn can_map_not_found_to_404() {
        let err = TaskError::from(StorageError::RecordNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Record not found.");
    }
}
