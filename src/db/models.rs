use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{ExamState, TeacherRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) role: TeacherRole,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) modified_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Problem {
    pub(crate) id: String,
    pub(crate) summary: String,
    pub(crate) statement: String,
    pub(crate) creator_id: String,
    pub(crate) origin_problem_id: Option<String>,
    pub(crate) fingerprint: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) modified_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) problem_id: String,
    pub(crate) statement: String,
    pub(crate) answer: String,
    pub(crate) explanation: String,
    pub(crate) points: f64,
    pub(crate) position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Tag {
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) program: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) state: ExamState,
    pub(crate) subject_id: String,
    pub(crate) date: Date,
    pub(crate) session: String,
    pub(crate) intro: String,
    pub(crate) exam_type: String,
    pub(crate) creator_id: String,
    pub(crate) published_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) modified_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Circle {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) creator_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) modified_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Task {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) kind: String,
    pub(crate) creator_id: String,
    pub(crate) completed: bool,
    pub(crate) created_at: PrimitiveDateTime,
}
