use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::transaction::acquire;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::problem::QuestionResponse;
use crate::services::permissions::{self, Capability, ProblemAccess, QuestionAccess};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:question_id", get(get_question))
}

async fn get_question(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(question_id): Path<String>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    let load_failed = |e: sqlx::Error| ApiError::internal(e, "Failed to fetch question");

    let question = repositories::questions::find_by_id(&mut *conn, &question_id)
        .await
        .map_err(load_failed)?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let problem = repositories::problems::find_by_id(&mut *conn, &question.problem_id)
        .await
        .map_err(load_failed)?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;
    let access = ProblemAccess::load(&mut *conn, &problem).await.map_err(load_failed)?;
    permissions::require(&current.principal(), Capability::Viewer, &QuestionAccess(&access))?;

    Ok(Json(QuestionResponse::from_db(question)))
}
