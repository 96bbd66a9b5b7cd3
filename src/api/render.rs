//! Submission of render jobs and delivery of their results.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::DownloadFormat;
use crate::schemas::task::TaskSubmittedResponse;
use crate::services::permissions::Principal;
use crate::services::render::{self, RenderStatus};

/// Enqueues a render of `document` recorded as a task of the requester.
///
/// With `sync` the request waits for the result within the configured poll
/// budget; otherwise it answers 202 with the task id.
pub(crate) async fn submit(
    state: &AppState,
    principal: &Principal,
    name: &str,
    format: DownloadFormat,
    document: serde_json::Value,
    sync: bool,
) -> Result<Response, ApiError> {
    let job = serde_json::json!({ "format": format.extension(), "document": document });
    let handle = state.render().submit(name, &job).await?;

    repositories::tasks::create(
        state.db(),
        &handle,
        name,
        format.extension(),
        &principal.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record render task"))?;

    tracing::info!(
        teacher_id = %principal.id,
        task_id = %handle,
        format = format.extension(),
        sync,
        action = "render_submit",
        "Render job submitted"
    );

    if !sync {
        let response = TaskSubmittedResponse { status: RenderStatus::Pending, task_id: handle };
        return Ok((StatusCode::ACCEPTED, Json(response)).into_response());
    }

    let settings = state.settings().render();
    let outcome = render::wait_for_completion(
        state.render(),
        &handle,
        Duration::from_millis(settings.poll_initial_ms),
        Duration::from_secs(settings.poll_max_wait_seconds),
    )
    .await;

    repositories::tasks::delete_by_id(state.db(), &handle)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove render task"))?;

    Ok(attachment(name, format, outcome?))
}

pub(crate) fn attachment(name: &str, format: DownloadFormat, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
        ],
        bytes,
    )
        .into_response()
}

/// Maps a task's stored kind back to its download format.
pub(crate) fn format_of(kind: &str) -> DownloadFormat {
    match kind {
        "tgz" => DownloadFormat::Tgz,
        "pdf" => DownloadFormat::Pdf,
        "json" => DownloadFormat::Json,
        _ => DownloadFormat::Zip,
    }
}
