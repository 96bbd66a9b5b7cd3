use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::render::{attachment, format_of};
use crate::core::state::AppState;
use crate::db::models::Task;
use crate::repositories;
use crate::schemas::task::TaskStatusResponse;
use crate::services::permissions::{self, Capability, Principal};
use crate::services::render::RenderStatus;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:task_id", get(task_status))
        .route("/:task_id/download", get(download_task))
}

/// Progress of a render task. Failed tasks are forgotten once reported.
async fn task_status(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = owned_task(&state, &current.principal(), &task_id).await?;
    let progress = state.render().poll(&task.id).await?;

    match progress.status {
        RenderStatus::Failed => {
            repositories::tasks::delete_by_id(state.db(), &task.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to remove render task"))?;
            tracing::warn!(task_id = %task.id, "Render task failed");
        }
        RenderStatus::Done if !task.completed => {
            repositories::tasks::mark_completed(state.db(), &task.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to update render task"))?;
        }
        _ => {}
    }

    Ok(Json(TaskStatusResponse {
        id: task.id,
        name: task.name,
        status: progress.status,
        progress: progress.progress,
    }))
}

/// Hands out the rendered file once and forgets the task.
async fn download_task(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let task = owned_task(&state, &current.principal(), &task_id).await?;
    let bytes = state.render().fetch_result(&task.id).await?;

    repositories::tasks::delete_by_id(state.db(), &task.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove render task"))?;

    Ok(attachment(&task.name, format_of(&task.kind), bytes))
}

async fn owned_task(
    state: &AppState,
    principal: &Principal,
    task_id: &str,
) -> Result<Task, ApiError> {
    let task = repositories::tasks::find_by_id(state.db(), task_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch render task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    permissions::require(principal, Capability::Owner, &task)?;
    Ok(task)
}
