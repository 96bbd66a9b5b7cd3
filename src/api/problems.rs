use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::transaction::{acquire, begin, commit};
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::repositories;
use crate::repositories::problems::ProblemOrder;
use crate::schemas::problem::{
    DeletableResponse, ProblemCreate, ProblemDetailResponse, ProblemListQuery,
    ProblemSummaryResponse, ProblemUpdate, QuestionResponse,
};
use crate::services::permissions::{self, Capability, Principal};
use crate::services::problems;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_problems).post(create_problem))
        .route("/mine", get(my_problems))
        .route(
            "/:problem_id",
            get(get_problem).put(update_problem).delete(delete_problem),
        )
        .route("/:problem_id/exams", get(problem_exams))
        .route("/:problem_id/deletable", get(problem_deletable))
        .route("/:problem_id/clone", post(clone_problem))
}

async fn list_problems(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Query(params): Query<ProblemListQuery>,
) -> Result<Json<Vec<ProblemSummaryResponse>>, ApiError> {
    let order = match params.order.as_deref() {
        None => ProblemOrder::ModifiedAt,
        Some(value) => ProblemOrder::parse(value).ok_or_else(|| {
            ApiError::UnprocessableEntity(format!("Unknown problem order '{value}'"))
        })?,
    };
    let principal = current.principal();
    let tags = params.tag_names();

    let mut conn = acquire(state.db()).await?;
    let problems = repositories::problems::list_visible(
        &mut *conn,
        &principal.id,
        principal.is_admin(),
        &tags,
        order,
        params.reverse.unwrap_or(false),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;

    let mut response = Vec::with_capacity(problems.len());
    for problem in problems {
        let tags = repositories::tags::names_for_problem(&mut *conn, &problem.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch problem tags"))?;
        response.push(ProblemSummaryResponse::from_db(problem, tags));
    }
    Ok(Json(response))
}

async fn create_problem(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Json(payload): Json<ProblemCreate>,
) -> Result<(StatusCode, Json<ProblemDetailResponse>), ApiError> {
    let principal = current.principal();

    let mut tx = begin(state.db()).await?;
    let problem = problems::create(&mut tx, &principal, payload).await?;
    let detail = build_detail(&mut tx, &principal, &problem.id).await?;
    commit(tx).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Ids of the requester's own problems (every problem for admins).
async fn my_problems(
    State(state): State<AppState>,
    current: CurrentTeacher,
) -> Result<Json<Vec<String>>, ApiError> {
    let principal = current.principal();
    let creator = (!principal.is_admin()).then_some(principal.id.as_str());

    let ids = repositories::problems::list_ids_by_creator(state.db(), creator)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;
    Ok(Json(ids))
}

async fn get_problem(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
) -> Result<Json<ProblemDetailResponse>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    let detail = build_detail(&mut conn, &current.principal(), &problem_id).await?;
    Ok(Json(detail))
}

async fn update_problem(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
    Json(payload): Json<ProblemUpdate>,
) -> Result<Json<ProblemDetailResponse>, ApiError> {
    let principal = current.principal();

    let mut tx = begin(state.db()).await?;
    problems::update(&mut tx, &principal, &problem_id, payload).await?;
    let detail = build_detail(&mut tx, &principal, &problem_id).await?;
    commit(tx).await?;

    Ok(Json(detail))
}

async fn delete_problem(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tx = begin(state.db()).await?;
    problems::delete(&mut tx, &current.principal(), &problem_id).await?;
    commit(tx).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn problem_exams(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    problems::authorize(&mut conn, &current.principal(), &problem_id, Capability::Viewer).await?;

    let exam_ids = repositories::problems::exam_ids(&mut *conn, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem exams"))?;
    Ok(Json(exam_ids))
}

async fn problem_deletable(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
) -> Result<Json<DeletableResponse>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    problems::authorize(&mut conn, &current.principal(), &problem_id, Capability::Owner).await?;
    let deletable = problems::is_deletable(&mut conn, &current.principal(), &problem_id).await?;
    Ok(Json(DeletableResponse { deletable }))
}

async fn clone_problem(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(problem_id): Path<String>,
) -> Result<(StatusCode, Json<ProblemDetailResponse>), ApiError> {
    let principal = current.principal();

    let mut tx = begin(state.db()).await?;
    let clone = problems::clone_problem(&mut tx, &principal, &problem_id).await?;
    let detail = build_detail(&mut tx, &principal, &clone.id).await?;
    commit(tx).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Full view of a problem the requester can see.
pub(crate) async fn build_detail(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
) -> Result<ProblemDetailResponse, ApiError> {
    let (problem, access) =
        problems::authorize(conn, principal, problem_id, Capability::Viewer).await?;

    let load_failed = |e: sqlx::Error| ApiError::internal(e, "Failed to load problem details");
    let questions = repositories::questions::list_for_problem(&mut *conn, problem_id)
        .await
        .map_err(load_failed)?;
    let tags =
        repositories::tags::names_for_problem(&mut *conn, problem_id).await.map_err(load_failed)?;
    let figures =
        repositories::problems::list_figures(&mut *conn, problem_id).await.map_err(load_failed)?;
    let derived_problem_ids =
        repositories::problems::derived_ids(&mut *conn, problem_id).await.map_err(load_failed)?;
    let circle_ids =
        repositories::problems::circle_ids(&mut *conn, problem_id).await.map_err(load_failed)?;
    let exam_count =
        repositories::problems::exam_ids(&mut *conn, problem_id).await.map_err(load_failed)?.len();
    let published =
        repositories::problems::is_published(&mut *conn, problem_id).await.map_err(load_failed)?;
    let locked =
        repositories::problems::is_locked(&mut *conn, problem_id).await.map_err(load_failed)?;

    let shareable = permissions::allows(principal, Capability::Owner, &access);
    let total_points = questions.iter().map(|question| question.points).sum();

    Ok(ProblemDetailResponse {
        question_count: questions.len(),
        total_points,
        questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
        tags,
        figures,
        derived_problem_ids,
        circle_ids,
        exam_count,
        published,
        deletable: shareable && !locked,
        shareable,
        created_at: format_primitive(problem.created_at),
        modified_at: format_primitive(problem.modified_at),
        id: problem.id,
        summary: problem.summary,
        statement: problem.statement,
        creator_id: problem.creator_id,
        fingerprint: problem.fingerprint,
        origin_problem_id: problem.origin_problem_id,
    })
}

#[cfg(test)]
mod tests;
