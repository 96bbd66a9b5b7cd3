use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentTeacher};
use crate::api::transaction::{begin, commit};
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::types::TeacherRole;
use crate::repositories;
use crate::schemas::teacher::{TeacherCreate, TeacherResponse, TeacherSummary, TeacherUpdate};
use crate::services::permissions::{self, Capability};
use crate::services::teachers::{self, CascadeReport};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route("/:teacher_id", get(get_teacher).patch(update_teacher).delete(delete_teacher))
}

/// Admins get full records; teachers get `{id, name}` of non-admin colleagues.
async fn list_teachers(
    State(state): State<AppState>,
    current: CurrentTeacher,
) -> Result<Response, ApiError> {
    if current.principal().is_admin() {
        let teachers = repositories::teachers::list_all(state.db())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list teachers"))?;
        let response: Vec<TeacherResponse> =
            teachers.into_iter().map(TeacherResponse::from_db).collect();
        return Ok(Json(response).into_response());
    }

    let teachers = repositories::teachers::list_by_role(state.db(), TeacherRole::Teacher)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list teachers"))?;
    let response: Vec<TeacherSummary> =
        teachers.into_iter().map(TeacherSummary::from_db).collect();
    Ok(Json(response).into_response())
}

async fn create_teacher(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Json(payload): Json<TeacherCreate>,
) -> Result<(StatusCode, Json<TeacherResponse>), ApiError> {
    validate_payload(&payload)?;
    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let mut tx = begin(state.db()).await?;
    let teacher = teachers::create(&mut tx, &admin.principal(), &payload, hashed_password).await?;
    commit(tx).await?;

    Ok((StatusCode::CREATED, Json(TeacherResponse::from_db(teacher))))
}

async fn get_teacher(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(teacher_id): Path<String>,
) -> Result<Json<TeacherResponse>, ApiError> {
    let teacher = repositories::teachers::find_by_id(state.db(), &teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?;
    permissions::require(&current.principal(), Capability::Owner, &teacher)?;

    Ok(Json(TeacherResponse::from_db(teacher)))
}

async fn update_teacher(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(teacher_id): Path<String>,
    Json(payload): Json<TeacherUpdate>,
) -> Result<Json<TeacherResponse>, ApiError> {
    validate_payload(&payload)?;
    let hashed_password = payload
        .password
        .as_deref()
        .map(security::hash_password)
        .transpose()
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let mut tx = begin(state.db()).await?;
    let teacher =
        teachers::update(&mut tx, &current.principal(), &teacher_id, payload, hashed_password)
            .await?;
    commit(tx).await?;

    Ok(Json(TeacherResponse::from_db(teacher)))
}

async fn delete_teacher(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(teacher_id): Path<String>,
) -> Result<Json<CascadeReport>, ApiError> {
    let mut tx = begin(state.db()).await?;
    let report = teachers::delete(&mut tx, &admin.principal(), &teacher_id).await?;
    commit(tx).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests;
