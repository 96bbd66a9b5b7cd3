use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{Problem, Question};
pub(crate) use crate::services::question_reconciler::QuestionInput;

#[derive(Debug, Deserialize)]
pub(crate) struct ProblemCreate {
    #[serde(default)]
    pub(crate) summary: String,
    #[serde(default)]
    pub(crate) statement: String,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionInput>,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
    #[serde(default)]
    pub(crate) figures: Vec<String>,
}

/// Client-updatable problem fields. Absent fields are left untouched; any
/// other key in the payload is ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProblemUpdate {
    #[serde(default)]
    pub(crate) summary: Option<String>,
    #[serde(default)]
    pub(crate) statement: Option<String>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<QuestionInput>>,
    #[serde(default)]
    pub(crate) tags: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) figures: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProblemListQuery {
    /// Comma-separated tag names; a problem must carry all of them.
    #[serde(default)]
    pub(crate) tags: Option<String>,
    #[serde(default)]
    pub(crate) order: Option<String>,
    #[serde(default)]
    pub(crate) reverse: Option<bool>,
}

impl ProblemListQuery {
    /// Requested tag names in order of first appearance, without repeats.
    pub(crate) fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.tags.as_deref().unwrap_or_default().split(',') {
            if !name.is_empty() && !names.iter().any(|seen| seen == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) problem_id: String,
    pub(crate) statement: String,
    pub(crate) answer: String,
    pub(crate) explanation: String,
    pub(crate) points: f64,
    pub(crate) position: i32,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            problem_id: question.problem_id,
            statement: question.statement,
            answer: question.answer,
            explanation: question.explanation,
            points: question.points,
            position: question.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemSummaryResponse {
    pub(crate) id: String,
    pub(crate) summary: String,
    pub(crate) creator_id: String,
    pub(crate) fingerprint: String,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: String,
    pub(crate) modified_at: String,
}

impl ProblemSummaryResponse {
    pub(crate) fn from_db(problem: Problem, tags: Vec<String>) -> Self {
        Self {
            id: problem.id,
            summary: problem.summary,
            creator_id: problem.creator_id,
            fingerprint: problem.fingerprint,
            tags,
            created_at: format_primitive(problem.created_at),
            modified_at: format_primitive(problem.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemDetailResponse {
    pub(crate) id: String,
    pub(crate) summary: String,
    pub(crate) statement: String,
    pub(crate) creator_id: String,
    pub(crate) fingerprint: String,
    pub(crate) origin_problem_id: Option<String>,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) question_count: usize,
    pub(crate) total_points: f64,
    pub(crate) tags: Vec<String>,
    pub(crate) figures: Vec<String>,
    pub(crate) derived_problem_ids: Vec<String>,
    pub(crate) circle_ids: Vec<String>,
    pub(crate) exam_count: usize,
    pub(crate) published: bool,
    pub(crate) deletable: bool,
    pub(crate) shareable: bool,
    pub(crate) created_at: String,
    pub(crate) modified_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeletableResponse {
    pub(crate) deletable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_ignores_unknown_fields() {
        let changes: ProblemUpdate = serde_json::from_value(serde_json::json!({
            "summary": "new",
            "creator_id": "someone-else",
            "fingerprint": "forged"
        }))
        .unwrap();
        assert_eq!(changes.summary.as_deref(), Some("new"));
        assert!(changes.statement.is_none());
        assert!(changes.questions.is_none());
        assert!(changes.tags.is_none());
    }

    #[test]
    fn tag_filter_splits_on_commas() {
        let query = ProblemListQuery { tags: Some("sd,net,".to_string()), ..Default::default() };
        assert_eq!(query.tag_names(), vec!["sd".to_string(), "net".to_string()]);
        assert!(ProblemListQuery::default().tag_names().is_empty());
    }

    #[test]
    fn tag_filter_drops_repeated_names() {
        let query = ProblemListQuery { tags: Some("a,b,a,,b".to_string()), ..Default::default() };
        assert_eq!(query.tag_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
