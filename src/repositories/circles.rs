use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Circle;

const COLUMNS: &str = "id, name, creator_id, created_at, modified_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Circle>, sqlx::Error> {
    sqlx::query_as::<_, Circle>(&format!("SELECT {COLUMNS} FROM circles WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Circle>, sqlx::Error> {
    sqlx::query_as::<_, Circle>(&format!("SELECT {COLUMNS} FROM circles WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: Option<&str>,
) -> Result<Vec<Circle>, sqlx::Error> {
    sqlx::query_as::<_, Circle>(&format!(
        "SELECT {COLUMNS} FROM circles
         WHERE ($1::varchar IS NULL OR creator_id = $1)
         ORDER BY name, id"
    ))
    .bind(creator_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    id: &str,
    name: &str,
    creator_id: &str,
    now: PrimitiveDateTime,
) -> Result<Circle, sqlx::Error> {
    sqlx::query_as::<_, Circle>(&format!(
        "INSERT INTO circles (id, name, creator_id, created_at, modified_at)
         VALUES ($1,$2,$3,$4,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(creator_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn rename(
    executor: impl PgExecutor<'_>,
    id: &str,
    name: &str,
    modified_at: PrimitiveDateTime,
) -> Result<Circle, sqlx::Error> {
    sqlx::query_as::<_, Circle>(&format!(
        "UPDATE circles SET name = $1, modified_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(name)
    .bind(modified_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn touch(
    executor: impl PgExecutor<'_>,
    id: &str,
    modified_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE circles SET modified_at = $1 WHERE id = $2")
        .bind(modified_at)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM circles WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM circles WHERE creator_id = $1")
        .bind(creator_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn member_ids(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT teacher_id FROM circle_members WHERE circle_id = $1 ORDER BY teacher_id",
    )
    .bind(circle_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn insert_members(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
    teacher_ids: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO circle_members (circle_id, teacher_id)
         SELECT $1, teacher_id FROM UNNEST($2::varchar[]) AS teacher_id",
    )
    .bind(circle_id)
    .bind(teacher_ids)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn remove_members(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
    teacher_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM circle_members WHERE circle_id = $1 AND teacher_id = ANY($2)")
            .bind(circle_id)
            .bind(teacher_ids)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn clear_members(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM circle_members WHERE circle_id = $1")
        .bind(circle_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn problem_ids(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT problem_id FROM circle_problems WHERE circle_id = $1 ORDER BY problem_id",
    )
    .bind(circle_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn insert_problems(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
    problem_ids: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO circle_problems (circle_id, problem_id)
         SELECT $1, problem_id FROM UNNEST($2::varchar[]) AS problem_id",
    )
    .bind(circle_id)
    .bind(problem_ids)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn remove_problems(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
    problem_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM circle_problems WHERE circle_id = $1 AND problem_id = ANY($2)")
            .bind(circle_id)
            .bind(problem_ids)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn clear_problems(
    executor: impl PgExecutor<'_>,
    circle_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM circle_problems WHERE circle_id = $1")
        .bind(circle_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn remove_member_everywhere(
    executor: impl PgExecutor<'_>,
    teacher_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM circle_members WHERE teacher_id = $1")
        .bind(teacher_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
