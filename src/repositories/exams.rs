use sqlx::PgExecutor;
use time::{Date, PrimitiveDateTime};

use crate::db::models::Exam;
use crate::db::types::ExamState;

pub(crate) const COLUMNS: &str = "\
    id, state, subject_id, date, session, intro, exam_type, creator_id, \
    published_at, created_at, modified_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: Option<&str>,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE ($1::varchar IS NULL OR creator_id = $1)
         ORDER BY modified_at DESC, id"
    ))
    .bind(creator_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) date: Date,
    pub(crate) session: &'a str,
    pub(crate) intro: &'a str,
    pub(crate) exam_type: &'a str,
    pub(crate) creator_id: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, state, subject_id, date, session, intro, exam_type, creator_id,
            published_at, created_at, modified_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,NULL,$9,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(ExamState::Open)
    .bind(params.subject_id)
    .bind(params.date)
    .bind(params.session)
    .bind(params.intro)
    .bind(params.exam_type)
    .bind(params.creator_id)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

/// Field update of an open exam. `None` keeps the stored value.
pub(crate) struct UpdateExamFields<'a> {
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) date: Option<Date>,
    pub(crate) session: Option<&'a str>,
    pub(crate) intro: Option<&'a str>,
    pub(crate) exam_type: Option<&'a str>,
    pub(crate) modified_at: PrimitiveDateTime,
}

pub(crate) async fn update_fields(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateExamFields<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams SET
            subject_id = COALESCE($1, subject_id),
            date = COALESCE($2, date),
            session = COALESCE($3, session),
            intro = COALESCE($4, intro),
            exam_type = COALESCE($5, exam_type),
            modified_at = $6
         WHERE id = $7",
    )
    .bind(params.subject_id)
    .bind(params.date)
    .bind(params.session)
    .bind(params.intro)
    .bind(params.exam_type)
    .bind(params.modified_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_state(
    executor: impl PgExecutor<'_>,
    id: &str,
    state: ExamState,
    published_at: Option<PrimitiveDateTime>,
    modified_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams
         SET state = $1, published_at = COALESCE($2, published_at), modified_at = $3
         WHERE id = $4",
    )
    .bind(state)
    .bind(published_at)
    .bind(modified_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn touch(
    executor: impl PgExecutor<'_>,
    id: &str,
    modified_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET modified_at = $1 WHERE id = $2")
        .bind(modified_at)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn reassign_creator(
    executor: impl PgExecutor<'_>,
    from_teacher_id: &str,
    to_teacher_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE exams SET creator_id = $1 WHERE creator_id = $2")
        .bind(to_teacher_id)
        .bind(from_teacher_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn problem_ids(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT problem_id FROM exam_problems WHERE exam_id = $1 ORDER BY position, problem_id",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn max_position(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<i32>>(
        "SELECT MAX(position) FROM exam_problems WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_problem(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
    problem_id: &str,
    position: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO exam_problems (exam_id, problem_id, position) VALUES ($1,$2,$3)")
        .bind(exam_id)
        .bind(problem_id)
        .bind(position)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn remove_problems(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
    problem_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM exam_problems WHERE exam_id = $1 AND problem_id = ANY($2)")
            .bind(exam_id)
            .bind(problem_ids)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn clear_problems(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_problems WHERE exam_id = $1")
        .bind(exam_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
