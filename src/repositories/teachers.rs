use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Teacher;
use crate::db::types::TeacherRole;

const COLUMNS: &str = "id, name, email, hashed_password, role, created_at, modified_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {COLUMNS} FROM teachers WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_email(
    executor: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE email = $1"))
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn exists_by_email(
    executor: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM teachers WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn existing_ids(
    executor: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, String>("SELECT id FROM teachers WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_all(executor: impl PgExecutor<'_>) -> Result<Vec<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers ORDER BY name, id"))
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_by_role(
    executor: impl PgExecutor<'_>,
    role: TeacherRole,
) -> Result<Vec<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {COLUMNS} FROM teachers WHERE role = $1 ORDER BY name, id"
    ))
    .bind(role)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateTeacher<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) role: TeacherRole,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateTeacher<'_>,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (id, name, email, hashed_password, role, created_at, modified_at)
         VALUES ($1,$2,$3,$4,$5,$6,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateTeacher {
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) hashed_password: Option<String>,
    pub(crate) role: Option<TeacherRole>,
    pub(crate) modified_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateTeacher,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "UPDATE teachers SET
            name = COALESCE($1, name),
            email = COALESCE($2, email),
            hashed_password = COALESCE($3, hashed_password),
            role = COALESCE($4, role),
            modified_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.name)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.modified_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM teachers WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}
