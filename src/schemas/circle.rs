use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Circle;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CircleCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CircleUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CircleResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) creator_id: String,
    pub(crate) created_at: String,
    pub(crate) modified_at: String,
}

impl CircleResponse {
    pub(crate) fn from_db(circle: Circle) -> Self {
        Self {
            id: circle.id,
            name: circle.name,
            creator_id: circle.creator_id,
            created_at: format_primitive(circle.created_at),
            modified_at: format_primitive(circle.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CircleDetailResponse {
    #[serde(flatten)]
    pub(crate) circle: CircleResponse,
    pub(crate) member_ids: Vec<String>,
    pub(crate) problem_ids: Vec<String>,
}
