use validator::Validate;

use crate::api::errors::ApiError;

/// Runs the payload's declarative checks.
pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::UnprocessableEntity(e.to_string()))
}
