use serde::Serialize;

use crate::db::models::{Subject, Tag};

#[derive(Debug, Serialize)]
pub(crate) struct TagResponse {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl TagResponse {
    pub(crate) fn from_db(tag: Tag) -> Self {
        Self { id: tag.id, name: tag.name }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TagUsageResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) usage: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) program: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self { id: subject.id, name: subject.name, program: subject.program }
    }
}
