use sqlx::PgExecutor;

use crate::db::models::Question;

const COLUMNS: &str = "id, problem_id, statement, answer, explanation, points, position";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_for_problem(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE problem_id = $1 ORDER BY position, id"
    ))
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct QuestionFields<'a> {
    pub(crate) statement: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) explanation: &'a str,
    pub(crate) points: f64,
    pub(crate) position: i32,
}

pub(crate) async fn insert(
    executor: impl PgExecutor<'_>,
    id: &str,
    problem_id: &str,
    fields: QuestionFields<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (id, problem_id, statement, answer, explanation, points, position)
         VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(id)
    .bind(problem_id)
    .bind(fields.statement)
    .bind(fields.answer)
    .bind(fields.explanation)
    .bind(fields.points)
    .bind(fields.position)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    fields: QuestionFields<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions
         SET statement = $1, answer = $2, explanation = $3, points = $4, position = $5
         WHERE id = $6",
    )
    .bind(fields.statement)
    .bind(fields.answer)
    .bind(fields.explanation)
    .bind(fields.points)
    .bind(fields.position)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete_many(
    executor: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM questions WHERE id = ANY($1)")
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
