//! Diff-based reconciliation of a problem's ordered question list.
//!
//! The plan is computed purely from the stored rows and the incoming list, so
//! every reference error surfaces before anything is written.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::db::models::Question;
use crate::services::errors::{DomainError, DomainResult};

/// One entry of an incoming question list. Entries without `id` are new.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionInput {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) statement: Option<String>,
    #[serde(default)]
    pub(crate) answer: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    pub(crate) points: Option<f64>,
}

/// Final column values for a question row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionValues {
    pub(crate) statement: String,
    pub(crate) answer: String,
    pub(crate) explanation: String,
    pub(crate) points: f64,
    pub(crate) position: i32,
}

#[derive(Debug, Default)]
pub(crate) struct QuestionPlan {
    pub(crate) updates: Vec<(String, QuestionValues)>,
    pub(crate) creates: Vec<QuestionValues>,
    pub(crate) deletes: Vec<String>,
}

impl QuestionPlan {
    /// True when applying the plan leaves every stored row as it was.
    pub(crate) fn is_noop(&self, current: &[Question]) -> bool {
        if !self.creates.is_empty() || !self.deletes.is_empty() {
            return false;
        }
        let by_id: HashMap<&str, &Question> =
            current.iter().map(|question| (question.id.as_str(), question)).collect();
        self.updates.iter().all(|(id, values)| {
            by_id.get(id.as_str()).is_some_and(|stored| values_of(stored) == *values)
        })
    }
}

const DEFAULT_POINTS: f64 = 1.0;

/// Plans the reconciliation of `current` against `incoming`.
///
/// Positions follow the incoming order. Omitted fields of updated questions
/// keep their stored value; new questions need a statement and an answer.
pub(crate) fn plan(current: &[Question], incoming: &[QuestionInput]) -> DomainResult<QuestionPlan> {
    let by_id: HashMap<&str, &Question> =
        current.iter().map(|question| (question.id.as_str(), question)).collect();

    let mut seen = HashSet::new();
    let mut result = QuestionPlan::default();

    for (index, item) in incoming.iter().enumerate() {
        let position = i32::try_from(index)
            .map_err(|_| DomainError::validation("Too many questions"))?;

        if let Some(points) = item.points {
            if !points.is_finite() || points < 0.0 {
                return Err(DomainError::validation("Question points must be a non-negative number"));
            }
        }

        match item.id.as_deref() {
            Some(id) => {
                let stored = by_id.get(id).ok_or_else(|| {
                    DomainError::Reference(format!("Question {id} does not belong to this problem"))
                })?;
                if !seen.insert(id) {
                    return Err(DomainError::validation(format!("Question {id} is listed twice")));
                }
                result.updates.push((id.to_string(), merge(stored, item, position)));
            }
            None => result.creates.push(new_values(item, position)?),
        }
    }

    result.deletes = current
        .iter()
        .filter(|question| !seen.contains(question.id.as_str()))
        .map(|question| question.id.clone())
        .collect();

    Ok(result)
}

/// Values for the question list of a problem being created.
pub(crate) fn plan_initial(incoming: &[QuestionInput]) -> DomainResult<Vec<QuestionValues>> {
    if incoming.is_empty() {
        return Err(DomainError::validation("A problem needs at least one question"));
    }
    if incoming.iter().any(|item| item.id.is_some()) {
        return Err(DomainError::Reference(
            "New problems cannot reference existing questions".to_string(),
        ));
    }
    let planned = plan(&[], incoming)?;
    Ok(planned.creates)
}

fn merge(stored: &Question, item: &QuestionInput, position: i32) -> QuestionValues {
    QuestionValues {
        statement: item.statement.clone().unwrap_or_else(|| stored.statement.clone()),
        answer: item.answer.clone().unwrap_or_else(|| stored.answer.clone()),
        explanation: item.explanation.clone().unwrap_or_else(|| stored.explanation.clone()),
        points: item.points.unwrap_or(stored.points),
        position,
    }
}

fn new_values(item: &QuestionInput, position: i32) -> DomainResult<QuestionValues> {
    let statement = item
        .statement
        .clone()
        .ok_or_else(|| DomainError::validation("New questions require a statement"))?;
    let answer = item
        .answer
        .clone()
        .ok_or_else(|| DomainError::validation("New questions require an answer"))?;

    Ok(QuestionValues {
        statement,
        answer,
        explanation: item.explanation.clone().unwrap_or_default(),
        points: item.points.unwrap_or(DEFAULT_POINTS),
        position,
    })
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
