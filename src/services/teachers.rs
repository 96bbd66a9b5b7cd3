//! Teacher accounts and the cascade that runs when one is removed.

use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::{metrics, time::primitive_now_utc};
use crate::db::models::Teacher;
use crate::repositories;
use crate::schemas::teacher::{TeacherCreate, TeacherUpdate};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::permissions::{self, Capability, Principal};
use crate::services::registries;

/// Emails are stored and compared lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    principal: &Principal,
    payload: &TeacherCreate,
    hashed_password: String,
) -> DomainResult<Teacher> {
    permissions::require_admin(principal)?;

    let email = normalize_email(&payload.email);
    if repositories::teachers::exists_by_email(&mut *conn, &email).await?.is_some() {
        return Err(DomainError::conflict("Teacher with this email already exists"));
    }

    let teacher_id = Uuid::new_v4().to_string();
    let teacher = repositories::teachers::create(
        &mut *conn,
        repositories::teachers::CreateTeacher {
            id: &teacher_id,
            name: &payload.name,
            email: &email,
            hashed_password,
            role: payload.role,
            now: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        teacher_id = %principal.id,
        created_teacher_id = %teacher.id,
        action = "teacher_create",
        "Teacher created"
    );
    metrics::record_mutation("teacher_create");
    Ok(teacher)
}

/// Updates a teacher's own account. Only admins may change roles.
pub(crate) async fn update(
    conn: &mut PgConnection,
    principal: &Principal,
    teacher_id: &str,
    payload: TeacherUpdate,
    hashed_password: Option<String>,
) -> DomainResult<Teacher> {
    let teacher = repositories::teachers::lock_by_id(&mut *conn, teacher_id)
        .await?
        .ok_or(DomainError::NotFound("Teacher"))?;
    permissions::require(principal, Capability::Owner, &teacher)?;
    if payload.role.is_some_and(|role| role != teacher.role) {
        permissions::require_admin(principal)?;
    }

    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = email.as_deref().filter(|email| *email != teacher.email) {
        if repositories::teachers::exists_by_email(&mut *conn, email).await?.is_some() {
            return Err(DomainError::conflict("Teacher with this email already exists"));
        }
    }

    let updated = repositories::teachers::update(
        &mut *conn,
        teacher_id,
        repositories::teachers::UpdateTeacher {
            name: payload.name,
            email,
            hashed_password,
            role: payload.role,
            modified_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        teacher_id = %principal.id,
        updated_teacher_id = %teacher_id,
        action = "teacher_update",
        "Teacher updated"
    );
    metrics::record_mutation("teacher_update");
    Ok(updated)
}

/// What a teacher deletion removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct CascadeReport {
    pub(crate) problems: u64,
    pub(crate) circles: u64,
    pub(crate) memberships: u64,
    pub(crate) tasks: u64,
    pub(crate) reassigned_exams: u64,
    pub(crate) swept_tags: u64,
    pub(crate) swept_subjects: u64,
}

/// Deletes a teacher with everything they created.
///
/// Exams survive and are handed over to the acting admin. Refused while any of
/// the teacher's problems sits in an exam that is no longer open.
pub(crate) async fn delete(
    conn: &mut PgConnection,
    principal: &Principal,
    teacher_id: &str,
) -> DomainResult<CascadeReport> {
    permissions::require_admin(principal)?;
    if teacher_id == principal.id {
        return Err(DomainError::conflict("Admins cannot delete their own account"));
    }

    repositories::teachers::lock_by_id(&mut *conn, teacher_id)
        .await?
        .ok_or(DomainError::NotFound("Teacher"))?;
    if repositories::problems::any_locked_by_creator(&mut *conn, teacher_id).await? {
        return Err(DomainError::conflict(
            "Teacher owns problems used by closed or published exams",
        ));
    }

    let reassigned_exams =
        repositories::exams::reassign_creator(&mut *conn, teacher_id, &principal.id).await?;
    let tasks = repositories::tasks::delete_by_creator(&mut *conn, teacher_id).await?;
    let problems = repositories::problems::delete_by_creator(&mut *conn, teacher_id).await?;
    let circles = repositories::circles::delete_by_creator(&mut *conn, teacher_id).await?;
    let memberships =
        repositories::circles::remove_member_everywhere(&mut *conn, teacher_id).await?;
    let swept_tags = registries::sweep_tags(conn).await?;
    let swept_subjects = registries::sweep_subjects(conn).await?;
    repositories::teachers::delete_by_id(&mut *conn, teacher_id).await?;

    let report = CascadeReport {
        problems,
        circles,
        memberships,
        tasks,
        reassigned_exams,
        swept_tags,
        swept_subjects,
    };
    tracing::info!(
        teacher_id = %principal.id,
        deleted_teacher_id = %teacher_id,
        problems,
        circles,
        reassigned_exams,
        swept_tags,
        action = "teacher_delete",
        "Teacher deleted"
    );
    metrics::record_mutation("teacher_delete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lowercased_and_trimmed() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
    }
}
