//! Tag and subject registries: created lazily on use, swept once unreferenced.
//!
//! Sweeps run inside the caller's transaction right after the mutation that
//! may have orphaned a row.

use sqlx::PgConnection;

use crate::core::metrics;
use crate::db::models::Subject;
use crate::repositories;
use crate::services::errors::{DomainError, DomainResult};

pub(crate) async fn sweep_tags(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
    let removed = repositories::tags::sweep_orphans(&mut *conn).await?;
    tracing::debug!(removed, registry = "tags", "Registry sweep");
    metrics::record_sweep("tags", removed);
    Ok(removed)
}

pub(crate) async fn sweep_subjects(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
    let removed = repositories::subjects::sweep_orphans(&mut *conn).await?;
    tracing::debug!(removed, registry = "subjects", "Registry sweep");
    metrics::record_sweep("subjects", removed);
    Ok(removed)
}

/// Resolves the (name, program) pair by exact match, creating it when absent.
pub(crate) async fn subject_for(
    conn: &mut PgConnection,
    name: &str,
    program: &str,
) -> DomainResult<Subject> {
    if name.is_empty() || program.is_empty() {
        return Err(DomainError::validation("Subject and program must not be empty"));
    }
    Ok(repositories::subjects::get_or_create(&mut *conn, name, program).await?)
}
