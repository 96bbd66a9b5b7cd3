//! Problem aggregate: a problem with its ordered questions, tags and figures.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::{metrics, time::primitive_now_utc};
use crate::db::models::{Problem, Question};
use crate::repositories;
use crate::repositories::questions::QuestionFields;
use crate::schemas::problem::{ProblemCreate, ProblemUpdate};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::fingerprint::problem_fingerprint;
use crate::services::permissions::{self, Capability, Principal, ProblemAccess, Unowned};
use crate::services::question_reconciler::{self, QuestionValues};
use crate::services::{registries, tag_set};

/// Loads a problem with its sharing graph and checks `capability` on it.
pub(crate) async fn authorize(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
    capability: Capability,
) -> DomainResult<(Problem, ProblemAccess)> {
    let problem = repositories::problems::find_by_id(&mut *conn, problem_id)
        .await?
        .ok_or(DomainError::NotFound("Problem"))?;
    let access = ProblemAccess::load(&mut *conn, &problem).await?;
    permissions::require(principal, capability, &access)?;
    Ok((problem, access))
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    principal: &Principal,
    input: ProblemCreate,
) -> DomainResult<Problem> {
    permissions::require(principal, Capability::Registered, &Unowned)?;
    let questions = question_reconciler::plan_initial(&input.questions)?;
    let tags = tag_set::normalize(&input.tags)?;

    let problem_id = Uuid::new_v4().to_string();
    let fingerprint = fingerprint_of(&input.statement, &questions);
    let now = primitive_now_utc();

    let problem = repositories::problems::create(
        &mut *conn,
        repositories::problems::CreateProblem {
            id: &problem_id,
            summary: &input.summary,
            statement: &input.statement,
            creator_id: &principal.id,
            origin_problem_id: None,
            fingerprint: &fingerprint,
            now,
        },
    )
    .await?;

    insert_questions(conn, &problem.id, &questions).await?;
    tag_set::replace(conn, &problem.id, &tags).await?;
    repositories::problems::add_figures(&mut *conn, &problem.id, &input.figures).await?;

    tracing::info!(
        teacher_id = %principal.id,
        problem_id = %problem.id,
        questions = questions.len(),
        action = "problem_create",
        "Problem created"
    );
    metrics::record_mutation("problem_create");
    Ok(problem)
}

/// Applies `changes` to a problem the requester owns.
///
/// Refused while the problem belongs to an exam that is no longer open.
/// Returns whether anything was modified.
pub(crate) async fn update(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
    changes: ProblemUpdate,
) -> DomainResult<bool> {
    let problem = repositories::problems::lock_by_id(&mut *conn, problem_id)
        .await?
        .ok_or(DomainError::NotFound("Problem"))?;
    let access = ProblemAccess::load(&mut *conn, &problem).await?;
    permissions::require(principal, Capability::Owner, &access)?;
    ensure_unlocked(conn, problem_id).await?;

    let current = repositories::questions::list_for_problem(&mut *conn, problem_id).await?;
    let question_plan = changes
        .questions
        .as_deref()
        .map(|incoming| question_reconciler::plan(&current, incoming))
        .transpose()?;
    if let Some(tags) = changes.tags.as_deref() {
        tag_set::normalize(tags)?;
    }

    let summary = changes.summary.unwrap_or_else(|| problem.summary.clone());
    let statement = changes.statement.unwrap_or_else(|| problem.statement.clone());
    let mut changed = summary != problem.summary || statement != problem.statement;

    let final_questions = match question_plan {
        Some(plan) if !plan.is_noop(&current) => {
            changed = true;
            apply_question_plan(conn, problem_id, &plan).await?;
            ordered_values(plan.updates.into_iter().map(|(_, values)| values).chain(plan.creates))
        }
        _ => current.iter().map(values_of).collect(),
    };

    if let Some(tags) = changes.tags.as_deref() {
        let before = repositories::tags::names_for_problem(&mut *conn, problem_id).await?;
        tag_set::replace(conn, problem_id, tags).await?;
        let after = repositories::tags::names_for_problem(&mut *conn, problem_id).await?;
        changed |= before != after;
    }

    if let Some(figures) = changes.figures.as_deref() {
        let before = repositories::problems::list_figures(&mut *conn, problem_id).await?;
        repositories::problems::clear_figures(&mut *conn, problem_id).await?;
        repositories::problems::add_figures(&mut *conn, problem_id, figures).await?;
        let after = repositories::problems::list_figures(&mut *conn, problem_id).await?;
        changed |= before != after;
    }

    if !changed {
        return Ok(false);
    }

    let fingerprint = fingerprint_of(&statement, &final_questions);
    repositories::problems::update(
        &mut *conn,
        problem_id,
        repositories::problems::UpdateProblem {
            summary: &summary,
            statement: &statement,
            fingerprint: &fingerprint,
            modified_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        teacher_id = %principal.id,
        problem_id = %problem_id,
        action = "problem_update",
        "Problem updated"
    );
    metrics::record_mutation("problem_update");
    Ok(true)
}

/// Deletes a problem the requester owns, then sweeps orphaned tags.
pub(crate) async fn delete(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
) -> DomainResult<()> {
    let problem = repositories::problems::lock_by_id(&mut *conn, problem_id)
        .await?
        .ok_or(DomainError::NotFound("Problem"))?;
    let access = ProblemAccess::load(&mut *conn, &problem).await?;
    permissions::require(principal, Capability::Owner, &access)?;
    ensure_unlocked(conn, problem_id).await?;

    repositories::problems::delete_by_id(&mut *conn, problem_id).await?;
    registries::sweep_tags(conn).await?;

    tracing::info!(
        teacher_id = %principal.id,
        problem_id = %problem_id,
        action = "problem_delete",
        "Problem deleted"
    );
    metrics::record_mutation("problem_delete");
    Ok(())
}

/// Copies a viewable problem into a new one owned by the requester.
///
/// The copy's summary gets a `.n` suffix, n counting the source's derived problems.
pub(crate) async fn clone_problem(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
) -> DomainResult<Problem> {
    let source = repositories::problems::lock_by_id(&mut *conn, problem_id)
        .await?
        .ok_or(DomainError::NotFound("Problem"))?;
    let access = ProblemAccess::load(&mut *conn, &source).await?;
    permissions::require(principal, Capability::Viewer, &access)?;

    let derived = repositories::problems::derived_ids(&mut *conn, problem_id).await?;
    let summary = clone_summary(&source.summary, derived.len());
    let questions: Vec<QuestionValues> =
        repositories::questions::list_for_problem(&mut *conn, problem_id)
            .await?
            .iter()
            .map(values_of)
            .collect();
    let tags = repositories::tags::names_for_problem(&mut *conn, problem_id).await?;
    let figures = repositories::problems::list_figures(&mut *conn, problem_id).await?;

    let clone_id = Uuid::new_v4().to_string();
    let fingerprint = fingerprint_of(&source.statement, &questions);
    let clone = repositories::problems::create(
        &mut *conn,
        repositories::problems::CreateProblem {
            id: &clone_id,
            summary: &summary,
            statement: &source.statement,
            creator_id: &principal.id,
            origin_problem_id: Some(&source.id),
            fingerprint: &fingerprint,
            now: primitive_now_utc(),
        },
    )
    .await?;

    insert_questions(conn, &clone.id, &questions).await?;
    if !tags.is_empty() {
        tag_set::replace(conn, &clone.id, &tags).await?;
    }
    repositories::problems::add_figures(&mut *conn, &clone.id, &figures).await?;

    tracing::info!(
        teacher_id = %principal.id,
        problem_id = %clone.id,
        origin_problem_id = %source.id,
        action = "problem_clone",
        "Problem cloned"
    );
    metrics::record_mutation("problem_clone");
    Ok(clone)
}

/// Whether the requester could delete the problem right now.
pub(crate) async fn is_deletable(
    conn: &mut PgConnection,
    principal: &Principal,
    problem_id: &str,
) -> DomainResult<bool> {
    let (_, access) = authorize(conn, principal, problem_id, Capability::Viewer).await?;
    if !permissions::allows(principal, Capability::Owner, &access) {
        return Ok(false);
    }
    Ok(!repositories::problems::is_locked(&mut *conn, problem_id).await?)
}

async fn ensure_unlocked(conn: &mut PgConnection, problem_id: &str) -> DomainResult<()> {
    if repositories::problems::is_locked(&mut *conn, problem_id).await? {
        return Err(DomainError::conflict(
            "Problem belongs to a closed or published exam and cannot be modified",
        ));
    }
    Ok(())
}

async fn insert_questions(
    conn: &mut PgConnection,
    problem_id: &str,
    questions: &[QuestionValues],
) -> Result<(), sqlx::Error> {
    for values in questions {
        repositories::questions::insert(
            &mut *conn,
            &Uuid::new_v4().to_string(),
            problem_id,
            fields(values),
        )
        .await?;
    }
    Ok(())
}

async fn apply_question_plan(
    conn: &mut PgConnection,
    problem_id: &str,
    plan: &question_reconciler::QuestionPlan,
) -> Result<(), sqlx::Error> {
    repositories::questions::delete_many(&mut *conn, &plan.deletes).await?;
    for (id, values) in &plan.updates {
        repositories::questions::update(&mut *conn, id, fields(values)).await?;
    }
    insert_questions(conn, problem_id, &plan.creates).await
}

fn fields(values: &QuestionValues) -> QuestionFields<'_> {
    QuestionFields {
        statement: &values.statement,
        answer: &values.answer,
        explanation: &values.explanation,
        points: values.points,
        position: values.position,
    }
}

fn values_of(question: &Question) -> QuestionValues {
    QuestionValues {
        statement: question.statement.clone(),
        answer: question.answer.clone(),
        explanation: question.explanation.clone(),
        points: question.points,
        position: question.position,
    }
}

fn ordered_values(values: impl Iterator<Item = QuestionValues>) -> Vec<QuestionValues> {
    let mut values: Vec<QuestionValues> = values.collect();
    values.sort_by_key(|value| value.position);
    values
}

fn fingerprint_of(statement: &str, questions: &[QuestionValues]) -> String {
    problem_fingerprint(
        statement,
        questions.iter().map(|question| (question.statement.as_str(), question.answer.as_str())),
    )
}

fn clone_summary(summary: &str, derived_count: usize) -> String {
    format!("{summary}.{}", derived_count + 1)
}
