use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Teacher;
use crate::db::types::TeacherRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: String,
    #[serde(default = "default_role")]
    pub(crate) role: TeacherRole,
}

/// Updatable teacher fields. The email is lowercased and the password re-hashed
/// before they are stored; `role` is honoured for admins only.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct TeacherUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<TeacherRole>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: TeacherRole,
    pub(crate) created_at: String,
    pub(crate) modified_at: String,
}

impl TeacherResponse {
    pub(crate) fn from_db(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            name: teacher.name,
            email: teacher.email,
            role: teacher.role,
            created_at: format_primitive(teacher.created_at),
            modified_at: format_primitive(teacher.modified_at),
        }
    }
}

/// What a non-admin teacher may see of a colleague.
#[derive(Debug, Serialize)]
pub(crate) struct TeacherSummary {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl TeacherSummary {
    pub(crate) fn from_db(teacher: Teacher) -> Self {
        Self { id: teacher.id, name: teacher.name }
    }
}

fn default_role() -> TeacherRole {
    TeacherRole::Teacher
}
