use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::teacher::TeacherResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) teacher: TeacherResponse,
}
