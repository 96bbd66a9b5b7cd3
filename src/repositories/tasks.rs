use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Task;

const COLUMNS: &str = "id, name, kind, creator_id, completed, created_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    id: &str,
    name: &str,
    kind: &str,
    creator_id: &str,
    now: PrimitiveDateTime,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, name, kind, creator_id, completed, created_at)
         VALUES ($1,$2,$3,$4,FALSE,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(kind)
    .bind(creator_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_completed(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tasks SET completed = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tasks WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE creator_id = $1")
        .bind(creator_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
