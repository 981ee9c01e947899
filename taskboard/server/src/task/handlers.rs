use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::storage::{Filter, Record, Storage};
use crate::task::{NewTask, TASKS_TABLE, Task, TaskError};
use crate::web::response::DataResponse;
use crate::web::routing::{HandlerFuture, Route, RouteRequest};

/// The task route table, in match order.
pub fn routes() -> Vec<Route> {
    vec![
        Route::new(Method::POST, "/tasks", |storage, request| -> HandlerFuture {
            Box::pin(async move { create_task(storage, request).await.into_response() })
        }),
        Route::new(Method::GET, "/tasks", |storage, request| -> HandlerFuture {
            Box::pin(async move { list_tasks(storage, request).await.into_response() })
        }),
        Route::new(Method::PUT, "/tasks/:id", |storage, request| -> HandlerFuture {
            Box::pin(async move { update_task(storage, request).await.into_response() })
        }),
        Route::new(Method::DELETE, "/tasks/:id", |storage, request| -> HandlerFuture {
            Box::pin(async move { delete_task(storage, request).await.into_response() })
        }),
        Route::new(
            Method::PATCH,
            "/tasks/:id/complete",
            |storage, request| -> HandlerFuture {
                Box::pin(async move { complete_task(storage, request).await.into_response() })
            },
        ),
    ]
}

/// Handler for POST /tasks.
#[tracing::instrument(skip(storage, request))]
pub async fn create_task(
    storage: Arc<Storage>,
    request: RouteRequest,
) -> Result<DataResponse<Record>, TaskError> {
    let NewTask { name, description } = NewTask::from_body(&request.body)?;
    let task = Task::new(name, description);
    tracing::info!("Creating task {}", task.id);

    Ok(storage.insert(TASKS_TABLE, task.into()).await.into())
}

/// Handler for GET /tasks, narrowed by `search` when given.
#[tracing::instrument(skip(storage, request), fields(search = ?request.query.get("search")))]
pub async fn list_tasks(storage: Arc<Storage>, request: RouteRequest) -> DataResponse<Vec<Record>> {
    let filter = request
        .query
        .get("search")
        .filter(|search| !search.is_empty())
        .map(|search| {
            Filter::from([
                ("name".to_string(), search.clone()),
                ("description".to_string(), search.clone()),
            ])
        });

    storage.select(TASKS_TABLE, filter.as_ref()).await.into()
}

/// Handler for PUT /tasks/:id. The whole body is merged as-is.
#[tracing::instrument(skip(storage, request), fields(id = ?request.param("id")))]
pub async fn update_task(
    storage: Arc<Storage>,
    request: RouteRequest,
) -> Result<DataResponse<Record>, TaskError> {
    let RouteRequest { params, body, .. } = request;
    if body.is_empty() {
        return Err(TaskError::EmptyPatch);
    }
    let id = params.get("id").map(String::as_str).unwrap_or_default();

    Ok(storage.update(TASKS_TABLE, id, body).await?.into())
}

/// Handler for DELETE /tasks/:id.
#[tracing::instrument(skip(storage, request), fields(id = ?request.param("id")))]
pub async fn delete_task(
    storage: Arc<Storage>,
    request: RouteRequest,
) -> Result<StatusCode, TaskError> {
    let id = request.param("id").unwrap_or_default();

    Ok(storage.delete(TASKS_TABLE, id).await?.status())
}

/// Handler for PATCH /tasks/:id/complete.
#[tracing::instrument(skip(storage, request), fields(id = ?request.param("id")))]
pub async fn complete_task(
    storage: Arc<Storage>,
    request: RouteRequest,
) -> Result<StatusCode, TaskError> {
    let id = request.param("id").unwrap_or_default();

    Ok(storage.mark_complete(TASKS_TABLE, id).await?.status())
}
