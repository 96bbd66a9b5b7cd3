use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::Teacher;
use crate::repositories;
use crate::services::permissions::Principal;

/// Authenticated teacher resolved from the bearer token.
pub(crate) struct CurrentTeacher(pub(crate) Teacher);
pub(crate) struct CurrentAdmin(pub(crate) Teacher);

impl CurrentTeacher {
    pub(crate) fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

impl CurrentAdmin {
    pub(crate) fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let teacher = repositories::teachers::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load teacher"))?;

        let Some(teacher) = teacher else {
            return Err(ApiError::Unauthorized("Teacher not found"));
        };

        Ok(CurrentTeacher(teacher))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentTeacher(teacher) = CurrentTeacher::from_request_parts(parts, state).await?;

        if Principal::from(&teacher).is_admin() {
            Ok(CurrentAdmin(teacher))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}
