//! Exam aggregate: header fields, lifecycle state and the ordered problem list.

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::{metrics, time::{format_date, parse_date, primitive_now_utc}};
use crate::db::models::{Exam, Subject};
use crate::db::types::ExamState;
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamUpdate, SolvedMode};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::exam_lifecycle::{self, Transition};
use crate::services::membership::{self, Edit, ExamProblems, Partition};
use crate::services::permissions::{self, Capability, Principal, RelationAccess, Unowned};
use crate::services::registries;

const DEFAULT_EXAM_TYPE: &str = "A";

/// Loads an exam and checks `capability` on it.
pub(crate) async fn authorize(
    conn: &mut PgConnection,
    principal: &Principal,
    exam_id: &str,
    capability: Capability,
) -> DomainResult<Exam> {
    let exam = repositories::exams::find_by_id(&mut *conn, exam_id)
        .await?
        .ok_or(DomainError::NotFound("Exam"))?;
    permissions::require(principal, capability, &exam)?;
    Ok(exam)
}

pub(crate) async fn subject_of(conn: &mut PgConnection, exam: &Exam) -> DomainResult<Subject> {
    repositories::subjects::find_by_id(&mut *conn, &exam.subject_id)
        .await?
        .ok_or(DomainError::NotFound("Subject"))
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    principal: &Principal,
    input: ExamCreate,
) -> DomainResult<Exam> {
    permissions::require(principal, Capability::Registered, &Unowned)?;
    if let Some(state) = input.state.as_deref() {
        if exam_lifecycle::parse_state(state)? != ExamState::Open {
            return Err(DomainError::validation("Exams are created in the open state"));
        }
    }
    let date = date_from(&input.date)?;
    let exam_type = exam_type_from(input.exam_type.as_deref().unwrap_or(DEFAULT_EXAM_TYPE))?;
    let intro = input.intro.unwrap_or_default();

    let subject = registries::subject_for(conn, &input.subject, &input.program).await?;
    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *conn,
        repositories::exams::CreateExam {
            id: &exam_id,
            subject_id: &subject.id,
            date,
            session: &input.session,
            intro: &intro,
            exam_type,
            creator_id: &principal.id,
            now: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        teacher_id = %principal.id,
        exam_id = %exam.id,
        action = "exam_create",
        "Exam created"
    );
    metrics::record_mutation("exam_create");
    Ok(exam)
}

/// Applies a state transition and, while the exam stays open, field changes.
pub(crate) async fn update(
    conn: &mut PgConnection,
    principal: &Principal,
    exam_id: &str,
    changes: ExamUpdate,
) -> DomainResult<Exam> {
    let exam = lock_owned(conn, principal, exam_id).await?;
    let now = primitive_now_utc();

    let mut state = exam.state;
    if let Some(requested) = changes.state.as_deref() {
        let requested = exam_lifecycle::parse_state(requested)?;
        if let Transition::Changed { to, published_at } =
            exam_lifecycle::transition(exam.state, requested, now)?
        {
            repositories::exams::set_state(&mut *conn, exam_id, to, published_at, now).await?;
            tracing::info!(
                teacher_id = %principal.id,
                exam_id = %exam_id,
                from = exam.state.as_str(),
                to = to.as_str(),
                action = "exam_transition",
                "Exam state changed"
            );
            metrics::record_mutation("exam_transition");
            state = to;
        }
    }

    if changes.has_field_changes() {
        exam_lifecycle::ensure_editable(state)?;
        apply_field_changes(conn, exam_id, &exam, &changes).await?;
        tracing::info!(
            teacher_id = %principal.id,
            exam_id = %exam_id,
            action = "exam_update",
            "Exam updated"
        );
        metrics::record_mutation("exam_update");
    }

    repositories::exams::find_by_id(&mut *conn, exam_id)
        .await?
        .ok_or(DomainError::NotFound("Exam"))
}

async fn apply_field_changes(
    conn: &mut PgConnection,
    exam_id: &str,
    exam: &Exam,
    changes: &ExamUpdate,
) -> DomainResult<()> {
    let date = changes.date.as_deref().map(date_from).transpose()?;
    let exam_type = changes.exam_type.as_deref().map(exam_type_from).transpose()?;

    let subject = match (changes.subject.as_deref(), changes.program.as_deref()) {
        (None, None) => None,
        (Some(name), Some(program)) => Some(registries::subject_for(conn, name, program).await?),
        (Some(_), None) => {
            return Err(DomainError::validation("A subject change requires the program too"))
        }
        (None, Some(program)) => {
            let current = subject_of(conn, exam).await?;
            Some(registries::subject_for(conn, &current.name, program).await?)
        }
    };

    repositories::exams::update_fields(
        &mut *conn,
        exam_id,
        repositories::exams::UpdateExamFields {
            subject_id: subject.as_ref().map(|subject| subject.id.as_str()),
            date,
            session: changes.session.as_deref(),
            intro: changes.intro.as_deref(),
            exam_type,
            modified_at: primitive_now_utc(),
        },
    )
    .await?;

    if subject.is_some_and(|subject| subject.id != exam.subject_id) {
        registries::sweep_subjects(conn).await?;
    }
    Ok(())
}

/// Deletes an open exam and sweeps its subject if nothing else uses it.
pub(crate) async fn delete(
    conn: &mut PgConnection,
    principal: &Principal,
    exam_id: &str,
) -> DomainResult<()> {
    let exam = lock_owned(conn, principal, exam_id).await?;
    exam_lifecycle::ensure_deletable(exam.state)?;

    repositories::exams::delete_by_id(&mut *conn, exam_id).await?;
    registries::sweep_subjects(conn).await?;

    tracing::info!(
        teacher_id = %principal.id,
        exam_id = %exam_id,
        action = "exam_delete",
        "Exam deleted"
    );
    metrics::record_mutation("exam_delete");
    Ok(())
}

/// Edits the problem list of an open exam owned by the requester and
/// refreshes its modification time.
pub(crate) async fn edit_problems(
    conn: &mut PgConnection,
    principal: &Principal,
    exam_id: &str,
    edit: Edit<'_>,
) -> DomainResult<Option<Partition>> {
    let exam = repositories::exams::lock_by_id(&mut *conn, exam_id)
        .await?
        .ok_or(DomainError::NotFound("Exam"))?;
    permissions::require(principal, Capability::Owner, &RelationAccess(&exam))?;
    exam_lifecycle::ensure_editable(exam.state)?;

    let outcome = membership::apply(conn, &ExamProblems { exam_id }, principal, edit).await?;

    repositories::exams::touch(&mut *conn, exam_id, primitive_now_utc()).await?;

    tracing::info!(
        teacher_id = %principal.id,
        exam_id = %exam_id,
        edit = edit.verb(),
        action = "exam_problems",
        "Exam problem list changed"
    );
    metrics::record_mutation("exam_problems");
    Ok(outcome)
}

/// Document the renderer consumes: exam header plus every problem in order.
pub(crate) async fn render_payload(
    conn: &mut PgConnection,
    exam: &Exam,
    solved: SolvedMode,
) -> DomainResult<serde_json::Value> {
    let subject = subject_of(conn, exam).await?;
    let problem_ids = repositories::exams::problem_ids(&mut *conn, &exam.id).await?;

    let mut problems = Vec::with_capacity(problem_ids.len());
    for problem_id in &problem_ids {
        let Some(problem) = repositories::problems::find_by_id(&mut *conn, problem_id).await?
        else {
            continue;
        };
        let questions = repositories::questions::list_for_problem(&mut *conn, problem_id).await?;
        let tags = repositories::tags::names_for_problem(&mut *conn, problem_id).await?;
        let figures = repositories::problems::list_figures(&mut *conn, problem_id).await?;

        let questions: Vec<serde_json::Value> = questions
            .into_iter()
            .map(|question| {
                let mut entry = json!({
                    "statement": question.statement,
                    "points": question.points,
                });
                if solved != SolvedMode::Unsolved {
                    entry["answer"] = json!(question.answer);
                }
                if solved == SolvedMode::Explained {
                    entry["explanation"] = json!(question.explanation);
                }
                entry
            })
            .collect();

        problems.push(json!({
            "id": problem.id,
            "summary": problem.summary,
            "statement": problem.statement,
            "tags": tags,
            "figures": figures,
            "questions": questions,
        }));
    }

    Ok(json!({
        "exam": {
            "id": exam.id,
            "subject": subject.name,
            "program": subject.program,
            "date": format_date(exam.date),
            "session": exam.session,
            "intro": exam.intro,
            "type": exam.exam_type,
            "state": exam.state.as_str(),
        },
        "solved": solved,
        "problems": problems,
    }))
}

async fn lock_owned(
    conn: &mut PgConnection,
    principal: &Principal,
    exam_id: &str,
) -> DomainResult<Exam> {
    let exam = repositories::exams::lock_by_id(&mut *conn, exam_id)
        .await?
        .ok_or(DomainError::NotFound("Exam"))?;
    permissions::require(principal, Capability::Owner, &exam)?;
    Ok(exam)
}

fn date_from(value: &str) -> DomainResult<time::Date> {
    parse_date(value)
        .ok_or_else(|| DomainError::validation(format!("Invalid exam date '{value}'")))
}

fn exam_type_from(value: &str) -> DomainResult<&str> {
    if value.chars().count() == 1 {
        Ok(value)
    } else {
        Err(DomainError::validation("Exam type must be a single character"))
    }
}
