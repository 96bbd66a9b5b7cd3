use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::{Exam, Subject};
use crate::db::types::ExamState;
use crate::schemas::problem::ProblemSummaryResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[validate(length(min = 1, message = "program must not be empty"))]
    pub(crate) program: String,
    pub(crate) date: String,
    #[validate(length(min = 1, message = "session must not be empty"))]
    pub(crate) session: String,
    #[serde(default)]
    pub(crate) intro: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) exam_type: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
}

/// Exam changes. `state` is applied first; the remaining fields are only
/// accepted while the exam is open.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) program: Option<String>,
    #[serde(default)]
    pub(crate) date: Option<String>,
    #[serde(default)]
    pub(crate) session: Option<String>,
    #[serde(default)]
    pub(crate) intro: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) exam_type: Option<String>,
}

impl ExamUpdate {
    /// Whether anything besides `state` was submitted.
    pub(crate) fn has_field_changes(&self) -> bool {
        self.subject.is_some()
            || self.program.is_some()
            || self.date.is_some()
            || self.session.is_some()
            || self.intro.is_some()
            || self.exam_type.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SolvedMode {
    #[default]
    Unsolved,
    Solved,
    Explained,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DownloadFormat {
    #[default]
    Zip,
    Tgz,
    Pdf,
    Json,
}

impl DownloadFormat {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tgz => "tgz",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::Tgz => "application/gzip",
            Self::Pdf => "application/pdf",
            Self::Json => "application/json",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub(crate) solved: SolvedMode,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(default)]
    pub(crate) format: DownloadFormat,
    #[serde(default)]
    pub(crate) solved: SolvedMode,
    #[serde(default)]
    pub(crate) sync: u8,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) state: ExamState,
    pub(crate) subject: String,
    pub(crate) program: String,
    pub(crate) date: String,
    pub(crate) session: String,
    pub(crate) intro: String,
    #[serde(rename = "type")]
    pub(crate) exam_type: String,
    pub(crate) creator_id: String,
    pub(crate) published_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) modified_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam, subject: Subject) -> Self {
        Self {
            id: exam.id,
            state: exam.state,
            subject: subject.name,
            program: subject.program,
            date: format_date(exam.date),
            session: exam.session,
            intro: exam.intro,
            exam_type: exam.exam_type,
            creator_id: exam.creator_id,
            published_at: exam.published_at.map(format_primitive),
            created_at: format_primitive(exam.created_at),
            modified_at: format_primitive(exam.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) problems: Vec<ProblemSummaryResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_reads_type_field() {
        let payload: ExamCreate = serde_json::from_value(serde_json::json!({
            "subject": "Networks",
            "program": "CS",
            "date": "20240607",
            "session": "June",
            "type": "B"
        }))
        .unwrap();
        assert_eq!(payload.exam_type.as_deref(), Some("B"));
        assert!(payload.intro.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn state_only_update_has_no_field_changes() {
        let update: ExamUpdate =
            serde_json::from_value(serde_json::json!({"state": "closed"})).unwrap();
        assert!(!update.has_field_changes());

        let update: ExamUpdate =
            serde_json::from_value(serde_json::json!({"state": "closed", "intro": "x"})).unwrap();
        assert!(update.has_field_changes());
    }

    #[test]
    fn download_query_defaults() {
        let query: DownloadQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.format, DownloadFormat::Zip);
        assert_eq!(query.solved, SolvedMode::Unsolved);
        assert_eq!(query.sync, 0);
    }
}
