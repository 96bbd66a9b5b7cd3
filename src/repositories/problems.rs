use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Problem;

pub(crate) const COLUMNS: &str = "\
    id, summary, statement, creator_id, origin_problem_id, fingerprint, created_at, modified_at";

/// Sort keys accepted by the visible-problem listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProblemOrder {
    Id,
    Summary,
    CreatedAt,
    ModifiedAt,
    Fingerprint,
}

impl ProblemOrder {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "summary" => Some(Self::Summary),
            "created_at" => Some(Self::CreatedAt),
            "modified_at" => Some(Self::ModifiedAt),
            "fingerprint" => Some(Self::Fingerprint),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Summary => "summary",
            Self::CreatedAt => "created_at",
            Self::ModifiedAt => "modified_at",
            Self::Fingerprint => "fingerprint",
        }
    }
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!("SELECT {COLUMNS} FROM problems WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_many(
    executor: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Problem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Problem>(&format!("SELECT {COLUMNS} FROM problems WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

pub(crate) struct CreateProblem<'a> {
    pub(crate) id: &'a str,
    pub(crate) summary: &'a str,
    pub(crate) statement: &'a str,
    pub(crate) creator_id: &'a str,
    pub(crate) origin_problem_id: Option<&'a str>,
    pub(crate) fingerprint: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateProblem<'_>,
) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "INSERT INTO problems (
            id, summary, statement, creator_id, origin_problem_id, fingerprint,
            created_at, modified_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.summary)
    .bind(params.statement)
    .bind(params.creator_id)
    .bind(params.origin_problem_id)
    .bind(params.fingerprint)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateProblem<'a> {
    pub(crate) summary: &'a str,
    pub(crate) statement: &'a str,
    pub(crate) fingerprint: &'a str,
    pub(crate) modified_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateProblem<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE problems
         SET summary = $1, statement = $2, fingerprint = $3, modified_at = $4
         WHERE id = $5",
    )
    .bind(params.summary)
    .bind(params.statement)
    .bind(params.fingerprint)
    .bind(params.modified_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM problems WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM problems WHERE creator_id = $1")
        .bind(creator_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Problems created by the teacher or shared with them through any circle.
/// With `all` set every problem is returned.
pub(crate) async fn list_visible(
    executor: impl PgExecutor<'_>,
    teacher_id: &str,
    all: bool,
    tags: &[String],
    order: ProblemOrder,
    reverse: bool,
) -> Result<Vec<Problem>, sqlx::Error> {
    let direction = if reverse { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT {COLUMNS} FROM problems p
         WHERE ($1 OR p.creator_id = $2 OR EXISTS (
                SELECT 1 FROM circle_problems cp
                JOIN circle_members cm ON cm.circle_id = cp.circle_id
                WHERE cp.problem_id = p.id AND cm.teacher_id = $2))
           AND (cardinality($3::varchar[]) = 0 OR (
                SELECT COUNT(DISTINCT t.name) FROM problem_tags pt
                JOIN tags t ON t.id = pt.tag_id
                WHERE pt.problem_id = p.id AND t.name = ANY($3)) = cardinality($3::varchar[]))
         ORDER BY p.{column} {direction}, p.id {direction}",
        column = order.column(),
    );

    sqlx::query_as::<_, Problem>(&sql)
        .bind(all)
        .bind(teacher_id)
        .bind(tags)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_ids_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: Option<&str>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM problems
         WHERE ($1::varchar IS NULL OR creator_id = $1)
         ORDER BY modified_at DESC, id",
    )
    .bind(creator_id)
    .fetch_all(executor)
    .await
}

/// Teachers that see the problem through a circle it is shared into.
pub(crate) async fn viewer_ids(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT cm.teacher_id FROM circle_problems cp
         JOIN circle_members cm ON cm.circle_id = cp.circle_id
         WHERE cp.problem_id = $1",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

/// Whether any exam that is no longer open contains the problem.
pub(crate) async fn is_locked(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM exam_problems ep JOIN exams e ON e.id = ep.exam_id
            WHERE ep.problem_id = $1 AND e.state <> 'open')",
    )
    .bind(problem_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn any_locked_by_creator(
    executor: impl PgExecutor<'_>,
    creator_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM problems p
            JOIN exam_problems ep ON ep.problem_id = p.id
            JOIN exams e ON e.id = ep.exam_id
            WHERE p.creator_id = $1 AND e.state <> 'open')",
    )
    .bind(creator_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn is_published(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM exam_problems ep JOIN exams e ON e.id = ep.exam_id
            WHERE ep.problem_id = $1 AND e.state = 'published')",
    )
    .bind(problem_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn exam_ids(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT exam_id FROM exam_problems WHERE problem_id = $1 ORDER BY exam_id",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn circle_ids(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT circle_id FROM circle_problems WHERE problem_id = $1 ORDER BY circle_id",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn derived_ids(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM problems WHERE origin_problem_id = $1 ORDER BY created_at, id",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_figures(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT filename FROM problem_figures WHERE problem_id = $1 ORDER BY filename",
    )
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn clear_figures(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM problem_figures WHERE problem_id = $1")
        .bind(problem_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn add_figures(
    executor: impl PgExecutor<'_>,
    problem_id: &str,
    filenames: &[String],
) -> Result<(), sqlx::Error> {
    if filenames.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO problem_figures (problem_id, filename)
         SELECT $1, f FROM UNNEST($2::varchar[]) AS f
         ON CONFLICT DO NOTHING",
    )
    .bind(problem_id)
    .bind(filenames)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ProblemOrder;

    #[test]
    fn problem_order_accepts_only_known_columns() {
        assert_eq!(ProblemOrder::parse("modified_at"), Some(ProblemOrder::ModifiedAt));
        assert_eq!(ProblemOrder::parse("summary"), Some(ProblemOrder::Summary));
        assert_eq!(ProblemOrder::parse("id; DROP TABLE problems"), None);
        assert_eq!(ProblemOrder::parse("creator_id"), None);
    }
}
