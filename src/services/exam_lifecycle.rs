//! Exam state machine: `open -> closed -> published` or `open -> published`.

use time::PrimitiveDateTime;

use crate::db::types::ExamState;
use crate::services::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Requested state equals the current open or closed state. Nothing is written.
    Unchanged,
    Changed { to: ExamState, published_at: Option<PrimitiveDateTime> },
}

pub(crate) fn transition(
    current: ExamState,
    requested: ExamState,
    now: PrimitiveDateTime,
) -> DomainResult<Transition> {
    use ExamState::{Closed, Open, Published};

    match (current, requested) {
        (Published, _) => Err(DomainError::conflict("Exam is published and its state is final")),
        (from, to) if from == to => Ok(Transition::Unchanged),
        (Open, Closed) => Ok(Transition::Changed { to: Closed, published_at: None }),
        (Open | Closed, Published) => {
            Ok(Transition::Changed { to: Published, published_at: Some(now) })
        }
        (from, to) => Err(DomainError::conflict(format!(
            "Exam cannot move from {} to {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Parses a requested state name.
pub(crate) fn parse_state(value: &str) -> DomainResult<ExamState> {
    ExamState::parse(value)
        .ok_or_else(|| DomainError::validation(format!("Unknown exam state '{value}'")))
}

/// Non-state fields and the problem list are editable only while open.
pub(crate) fn ensure_editable(state: ExamState) -> DomainResult<()> {
    if state == ExamState::Open {
        Ok(())
    } else {
        Err(DomainError::conflict(format!("Exam is {} and can no longer be edited", state.as_str())))
    }
}

pub(crate) fn ensure_deletable(state: ExamState) -> DomainResult<()> {
    if state == ExamState::Open {
        Ok(())
    } else {
        Err(DomainError::conflict(format!("Exam is {} and cannot be deleted", state.as_str())))
    }
}
