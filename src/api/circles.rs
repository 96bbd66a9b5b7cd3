use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::transaction::{acquire, begin, commit};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::circle::{CircleCreate, CircleDetailResponse, CircleResponse, CircleUpdate};
use crate::schemas::{IdList, MembershipResponse};
use crate::services::circles::{self, CircleRelation};
use crate::services::membership::Edit;
use crate::services::permissions::Capability;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_circles).post(create_circle))
        .route("/:circle_id", get(get_circle).patch(update_circle).delete(delete_circle))
        .route(
            "/:circle_id/members",
            get(list_members).post(add_members).put(replace_members).delete(remove_members),
        )
        .route("/:circle_id/members/all", delete(clear_members))
        .route("/:circle_id/members/:teacher_id", post(add_member).delete(remove_member))
        .route(
            "/:circle_id/problems",
            get(list_problems).post(add_problems).put(replace_problems).delete(remove_problems),
        )
        .route("/:circle_id/problems/all", delete(clear_problems))
        .route("/:circle_id/problems/:problem_id", post(add_problem).delete(remove_problem))
}

async fn list_circles(
    State(state): State<AppState>,
    current: CurrentTeacher,
) -> Result<Json<Vec<CircleResponse>>, ApiError> {
    let principal = current.principal();
    let creator = (!principal.is_admin()).then_some(principal.id.as_str());

    let circles = repositories::circles::list_by_creator(state.db(), creator)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list circles"))?;
    Ok(Json(circles.into_iter().map(CircleResponse::from_db).collect()))
}

async fn create_circle(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Json(payload): Json<CircleCreate>,
) -> Result<(StatusCode, Json<CircleResponse>), ApiError> {
    validate_payload(&payload)?;

    let mut tx = begin(state.db()).await?;
    let circle = circles::create(&mut tx, &current.principal(), &payload.name).await?;
    commit(tx).await?;

    Ok((StatusCode::CREATED, Json(CircleResponse::from_db(circle))))
}

async fn get_circle(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<Json<CircleDetailResponse>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    let circle =
        circles::authorize(&mut conn, &current.principal(), &circle_id, Capability::Owner).await?;

    let load_failed = |e: sqlx::Error| ApiError::internal(e, "Failed to fetch circle relations");
    let member_ids =
        repositories::circles::member_ids(&mut *conn, &circle_id).await.map_err(load_failed)?;
    let problem_ids =
        repositories::circles::problem_ids(&mut *conn, &circle_id).await.map_err(load_failed)?;

    Ok(Json(CircleDetailResponse { circle: CircleResponse::from_db(circle), member_ids, problem_ids }))
}

async fn update_circle(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<CircleUpdate>,
) -> Result<Json<CircleResponse>, ApiError> {
    validate_payload(&payload)?;

    let mut tx = begin(state.db()).await?;
    let circle =
        circles::rename(&mut tx, &current.principal(), &circle_id, payload.name.as_deref()).await?;
    commit(tx).await?;

    Ok(Json(CircleResponse::from_db(circle)))
}

async fn delete_circle(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tx = begin(state.db()).await?;
    circles::delete(&mut tx, &current.principal(), &circle_id).await?;
    commit(tx).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    circles::authorize(&mut conn, &current.principal(), &circle_id, Capability::Owner).await?;
    let ids = repositories::circles::member_ids(&mut *conn, &circle_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch circle members"))?;
    Ok(Json(ids))
}

async fn list_problems(
    State(state): State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut conn = acquire(state.db()).await?;
    circles::authorize(&mut conn, &current.principal(), &circle_id, Capability::Owner).await?;
    let ids = repositories::circles::problem_ids(&mut *conn, &circle_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch circle problems"))?;
    Ok(Json(ids))
}

async fn add_members(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::AddMany(&payload.ids)).await
}

async fn replace_members(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::Replace(&payload.ids)).await
}

async fn remove_members(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::RemoveMany(&payload.ids)).await
}

async fn clear_members(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::Clear).await
}

async fn add_member(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((circle_id, teacher_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::Add(&teacher_id)).await
}

async fn remove_member(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((circle_id, teacher_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Members, Edit::Remove(&teacher_id)).await
}

async fn add_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::AddMany(&payload.ids)).await
}

async fn replace_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::Replace(&payload.ids)).await
}

async fn remove_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
    Json(payload): Json<IdList>,
) -> Result<Json<MembershipResponse>, ApiError> {
    validate_payload(&payload)?;
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::RemoveMany(&payload.ids)).await
}

async fn clear_problems(
    state: State<AppState>,
    current: CurrentTeacher,
    Path(circle_id): Path<String>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::Clear).await
}

async fn add_problem(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((circle_id, problem_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::Add(&problem_id)).await
}

async fn remove_problem(
    state: State<AppState>,
    current: CurrentTeacher,
    Path((circle_id, problem_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    edit_relation(state, current, circle_id, CircleRelation::Problems, Edit::Remove(&problem_id)).await
}

async fn edit_relation(
    State(state): State<AppState>,
    current: CurrentTeacher,
    circle_id: String,
    target: CircleRelation,
    edit: Edit<'_>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let mut tx = begin(state.db()).await?;
    let partition =
        circles::edit_relation(&mut tx, &current.principal(), &circle_id, target, edit).await?;
    let ids = match target {
        CircleRelation::Members => repositories::circles::member_ids(&mut *tx, &circle_id).await,
        CircleRelation::Problems => repositories::circles::problem_ids(&mut *tx, &circle_id).await,
    }
    .map_err(|e| ApiError::internal(e, "Failed to fetch circle relation"))?;
    commit(tx).await?;

    Ok(Json(MembershipResponse { ids, partition }))
}
