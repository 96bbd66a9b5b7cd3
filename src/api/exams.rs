use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::render;
use crate::api::transaction::{acquire, begin, commit};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::models::Exam;
use crate::repositories;
use crate::schemas::exam::{
    DownloadFormat, DownloadQuery, ExamCreate, ExamDetailResponse, ExamResponse, ExamUpdate,
    ExportQuery,
};
use crate::schemas::problem::ProblemSummaryResponse;
use crate::schemas::{IdList, MembershipResponse};
use crate::services::exams;
use crate::services::membership::Edit;
use crate::services::permissions::Capability;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
        .route(
            "/:exam_id/problems",
            get(list_exam_problems)
                .post(add_exam_problems)
                .put(replace_exam_problems)
                .delete(remove_exam_problems),
        )
        .route("/:exam_id/problems/all", delete(clear_exam_problems))
        .route(
            "/:exam_id/problems/:problem_id",
            post(add_exam_problem).delete(remove_exam_problem),
        )
        .route("/:exam_id/export", get(export_exam))
        .route("/:exam_id/download", get(download_exam))
}

/// Exams created by the requester, all exams for admins.
async fn list_exams(
    State(state): State<AppState>,
    current: CurrentTeacher,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let principal = current.principal();
    let creator = (!principal.is_admin()).then_some(principal.id.as_str());

    let mut conn = acquire(state.db()).await?;
    let exams = repositories::exams::list_by_creator(&mut *conn, creator)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let mut response = Vec::with_capacity(exams.len());
    for exam in exams {
        response.push(exam_response(&mut conn, exam).await?);
    }
    Ok(Json(response))
}

async fn create_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    validate_payload(&payload)?;

    let mut tx = begin(state.db()).await?;
    let exam = exams::create(&mut tx, &current.principal(), payload).await?;
    let response = exam_response(&mut tx, exam).await?;
    commit(tx).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    let exam = exams::authorize(&mut conn, &current.principal(), &exam_id, Capability::Owner).await?;
    let problems = exam_problems(&mut conn, &exam_id).await?;

    Ok(Json(ExamDetailResponse { exam: exam_response(&mut conn, exam).await?, problems }))
}

async fn update_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let mut tx = begin(state.db()).await?;
    let exam = exams::update(&mut tx, &current.principal(), &exam_id, payload).await?;
    let response = exam_response(&mut tx, exam).await?;
    commit(tx).await?;

    Ok(Json(response))
}

async fn delete_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tx = begin(state.db()).await?;
    exams::delete(&mut tx, &current.principal(), &exam_id).await?;
    commit(tx).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_exam_problems(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<Vec<ProblemSummaryResponse>>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    exams::authorize(&mut conn, &current.principal(), &exam_id, Capability::Owner).await?;
    Ok(Json(exam_problems(&mut conn, &exam_id).await?))
}

async fn add_exam_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_problems(state, current, exam_id, Edit::AddMany(&payload.ids)).await
}

async fn replace_exam_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_problems(state, current, exam_id, Edit::Replace(&payload.ids)).await
}

async fn remove_exam_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_problems(state, current, exam_id, Edit::RemoveMany(&payload.ids)).await
}

async fn clear_exam_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_problems(state, current, exam_id, Edit::Clear).await
}

async fn add_exam_problem(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((exam_id, problem_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_problems(state, current, exam_id, Edit::Add(&problem_id)).await
}

async fn remove_exam_problem(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((exam_id, problem_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_problems(state, current, exam_id, Edit::Remove(&problem_id)).await
}

async fn edit_problems(
    State(state): State<AppState>,
    current: CurrentTeacher,
    exam_id: String,
    edit: Edit<'_>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let mut tx = begin(state.db()).await?;
    let partition = exams::edit_problems(&mut tx, &current.principal(), &exam_id, edit).await?;
    let ids = repositories::exams::problem_ids(&mut *tx, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam problems"))?;
    commit(tx).await?;

    Ok(Json(MembershipResponse { ids, partition }))
}

/// The document handed to the renderer.
async fn export_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Query(params): Query<ExportQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    let exam = exams::authorize(&mut conn, &current.principal(), &exam_id, Capability::Owner).await?;
    Ok(Json(exams::render_payload(&mut conn, &exam, params.solved).await?))
}

async fn download_exam(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(exam_id): Path<String>,
    Query(params): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let principal = current.principal();
    let mut conn = acquire(state.db()).await?;
    let exam = exams::authorize(&mut conn, &principal, &exam_id, Capability::Owner).await?;
    let document = exams::render_payload(&mut conn, &exam, params.solved).await?;
    drop(conn);

    if params.format == DownloadFormat::Json {
        return Ok(Json(document).into_response());
    }

    let name = format!("exam-{}-{}.{}", exam.session, exam.exam_type, params.format.extension());
    render::submit(&state, &principal, &name, params.format, document, params.sync != 0).await
}

async fn exam_response(conn: &mut PgConnection, exam: Exam) -> Result<ExamResponse, ApiError> {
    let subject = exams::subject_of(conn, &exam).await?;
    Ok(ExamResponse::from_db(exam, subject))
}

async fn exam_problems(
    conn: &mut PgConnection,
    exam_id: &str,
) -> Result<Vec<ProblemSummaryResponse>, ApiError> {
    let load_failed = |e: sqlx::Error| ApiError::internal(e, "Failed to fetch exam problems");
    let ids = repositories::exams::problem_ids(&mut *conn, exam_id).await.map_err(load_failed)?;

    let mut problems = Vec::with_capacity(ids.len());
    for id in &ids {
        let Some(problem) =
            repositories::problems::find_by_id(&mut *conn, id).await.map_err(load_failed)?
        else {
            continue;
        };
        let tags = repositories::tags::names_for_problem(&mut *conn, id).await.map_err(load_failed)?;
        problems.push(ProblemSummaryResponse::from_db(problem, tags));
    }
    Ok(problems)
}
