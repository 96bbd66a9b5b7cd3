use serde::Serialize;

use crate::services::render::RenderStatus;

#[derive(Debug, Serialize)]
pub(crate) struct TaskSubmittedResponse {
    pub(crate) status: RenderStatus,
    pub(crate) task_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskStatusResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) status: RenderStatus,
    pub(crate) progress: Option<u8>,
}
