use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::membership::Partition;

pub(crate) mod auth;
pub(crate) mod circle;
pub(crate) mod exam;
pub(crate) mod problem;
pub(crate) mod tag;
pub(crate) mod task;
pub(crate) mod teacher;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

/// Body of every bulk membership request.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct IdList {
    #[serde(default)]
    #[validate(length(min = 1, message = "ids must not be empty"))]
    pub(crate) ids: Vec<String>,
}

/// Members of a relation after an edit, with the candidate partition for bulk edits.
#[derive(Debug, Serialize)]
pub(crate) struct MembershipResponse {
    pub(crate) ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) partition: Option<Partition>,
}
