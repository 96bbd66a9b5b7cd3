use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::Subject;

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>("SELECT id, name, program FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Exact (name, program) lookup, inserting the pair when it does not exist yet.
pub(crate) async fn get_or_create(
    executor: impl PgExecutor<'_>,
    name: &str,
    program: &str,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (id, name, program) VALUES ($1, $2, $3)
         ON CONFLICT (name, program) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, name, program",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(program)
    .fetch_one(executor)
    .await
}

/// Deletes every subject no exam references. Returns the number removed.
pub(crate) async fn sweep_orphans(executor: impl PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM subjects s WHERE NOT EXISTS (SELECT 1 FROM exams e WHERE e.subject_id = s.id)",
    )
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
