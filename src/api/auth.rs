use axum::{
    extract::{Form, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::Teacher;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, TokenResponse};
use crate::schemas::teacher::TeacherResponse;
use crate::services::teachers::normalize_email;

/// Max attempts per window for auth endpoints.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_payload(&payload)?;
    authenticate(&state, "login", &payload.email, &payload.password).await
}

/// Form-encoded variant for OAuth2 password-flow clients; `username` is the email.
async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, "token", &payload.username, &payload.password).await
}

async fn me(CurrentTeacher(teacher): CurrentTeacher) -> Json<TeacherResponse> {
    Json(TeacherResponse::from_db(teacher))
}

async fn authenticate(
    state: &AppState,
    flow: &str,
    email: &str,
    password: &str,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(email);

    let rate_key = format!("rl:{flow}:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let teacher = fetch_teacher_by_email(state, &email).await?;

    let verified = security::verify_password(password, &teacher.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    let token = security::create_access_token(&teacher.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(teacher_id = %teacher.id, action = "login", "Teacher logged in");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        teacher: TeacherResponse::from_db(teacher),
    }))
}

async fn fetch_teacher_by_email(state: &AppState, email: &str) -> Result<Teacher, ApiError> {
    repositories::teachers::find_by_email(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires postgres"]
    async fn login_returns_token_for_valid_credentials() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({
                    "email": "ADA@example.com",
                    "password": test_support::TEST_PASSWORD
                })),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["teacher"]["email"], "ada@example.com");

        let token = body["access_token"].as_str().expect("token").to_string();
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/auth/me",
                Some(&token),
                None,
            ))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    #[ignore = "requires postgres"]
    async fn login_rejects_wrong_password() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({"email": "ada@example.com", "password": "wrong-one"})),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires postgres"]
    async fn me_requires_bearer_token() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", None, None))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
