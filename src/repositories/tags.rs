use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::Tag;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TagUsage {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) usage: i64,
}

pub(crate) async fn list_all(executor: impl PgExecutor<'_>) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name").fetch_all(executor).await
}

pub(crate) async fn find_with_usage(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<TagUsage>, sqlx::Error> {
    sqlx::query_as::<_, TagUsage>(
        "SELECT t.id, t.name, COUNT(pt.problem_id) AS usage
         FROM tags t LEFT JOIN problem_tags pt ON pt.tag_id = t.id
         WHERE t.id = $1
         GROUP BY t.id, t.name",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Tag name to number of problems visible to the teacher carrying it.
pub(crate) async fn visible_counts(
    executor: impl PgExecutor<'_>,
    teacher_id: &str,
    all: bool,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT t.name, COUNT(*) FROM tags t
         JOIN problem_tags pt ON pt.tag_id = t.id
         JOIN problems p ON p.id = pt.problem_id
         WHERE $1 OR p.creator_id = $2 OR EXISTS (
            SELECT 1 FROM circle_problems cp
            JOIN circle_members cm ON cm.circle_id = cp.circle_id
            WHERE cp.problem_id = p.id AND cm.teacher_id = $2)
         GROUP BY t.name
         ORDER BY t.name",
    )
    .bind(all)
    .bind(teacher_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn names_for_problem(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT t.name FROM tags t JOIN problem_tags pt ON pt.tag_id = t.id
         WHERE pt.problem_id = $1 ORDER BY t.name",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

/// Resolves a name to its tag id, creating the tag when absent.
pub(crate) async fn get_or_create(
    executor: impl PgExecutor<'_>,
    name: &str,
) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO tags (id, name) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .fetch_one(executor)
    .await
}

pub(crate) async fn clear_for_problem(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM problem_tags WHERE problem_id = $1")
        .bind(problem_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn attach(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
    tag_ids: &[String],
) -> Result<(), sqlx::Error> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO problem_tags (problem_id, tag_id)
         SELECT $1, tag_id FROM UNNEST($2::varchar[]) AS tag_id
         ON CONFLICT DO NOTHING",
    )
    .bind(problem_id)
    .bind(tag_ids)
    .execute(executor)
    .await?;
    Ok(())
}

/// Deletes every tag no problem references. Returns the number removed.
pub(crate) async fn sweep_orphans(executor: impl PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM tags t
         WHERE NOT EXISTS (SELECT 1 FROM problem_tags pt WHERE pt.tag_id = t.id)",
    )
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
