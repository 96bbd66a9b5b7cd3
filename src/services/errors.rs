use thiserror::Error;

/// Failure taxonomy of the mutation engine. Every variant is raised before
/// the first write of the surrounding transaction, except `Database`.
#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Reference(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Permission(&'static str),
    #[error("{0}")]
    StateConflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DomainError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::StateConflict(message.into())
    }
}

pub(crate) type DomainResult<T> = Result<T, DomainError>;
