use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::tag::{SubjectResponse, TagResponse, TagUsageResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/visible", get(visible_tags))
        .route("/:tag_id", get(get_tag))
}

pub(crate) fn subjects_router() -> Router<AppState> {
    Router::new().route("/:subject_id", get(get_subject))
}

async fn list_tags(
    State(state): State<AppState>,
    _current: CurrentTeacher,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = repositories::tags::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list tags"))?;
    Ok(Json(tags.into_iter().map(TagResponse::from_db).collect()))
}

/// Tag name to the number of problems the requester can see carrying it.
async fn visible_tags(
    State(state): State<AppState>,
    current: CurrentTeacher,
) -> Result<Json<BTreeMap<String, i64>>, ApiError> {
    let principal = current.principal();
    let counts =
        repositories::tags::visible_counts(state.db(), &principal.id, principal.is_admin())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count visible tags"))?;
    Ok(Json(counts.into_iter().collect()))
}

async fn get_tag(
    State(state): State<AppState>,
    _current: CurrentTeacher,
    Path(tag_id): Path<String>,
) -> Result<Json<TagUsageResponse>, ApiError> {
    let tag = repositories::tags::find_with_usage(state.db(), &tag_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch tag"))?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
    Ok(Json(TagUsageResponse { id: tag.id, name: tag.name, usage: tag.usage }))
}

async fn get_subject(
    State(state): State<AppState>,
    _current: CurrentTeacher,
    Path(subject_id): Path<String>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;
    Ok(Json(SubjectResponse::from_db(subject)))
}
