//! Circles: sharing groups of teachers and the problems shared with them.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::{metrics, time::primitive_now_utc};
use crate::db::models::Circle;
use crate::repositories;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::membership::{self, CircleMembers, CircleProblems, Edit, Partition};
use crate::services::permissions::{self, Capability, Principal, RelationAccess, Unowned};

/// Which relation of a circle an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CircleRelation {
    Members,
    Problems,
}

impl CircleRelation {
    fn label(self) -> &'static str {
        match self {
            Self::Members => "circle_members",
            Self::Problems => "circle_problems",
        }
    }
}

pub(crate) async fn authorize(
    conn: &mut PgConnection,
    principal: &Principal,
    circle_id: &str,
    capability: Capability,
) -> DomainResult<Circle> {
    let circle = repositories::circles::find_by_id(&mut *conn, circle_id)
        .await?
        .ok_or(DomainError::NotFound("Circle"))?;
    permissions::require(principal, capability, &circle)?;
    Ok(circle)
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    principal: &Principal,
    name: &str,
) -> DomainResult<Circle> {
    permissions::require(principal, Capability::Registered, &Unowned)?;
    if name.trim().is_empty() {
        return Err(DomainError::validation("Circle name must not be blank"));
    }

    let circle_id = Uuid::new_v4().to_string();
    let circle =
        repositories::circles::create(&mut *conn, &circle_id, name, &principal.id, primitive_now_utc())
            .await?;

    tracing::info!(
        teacher_id = %principal.id,
        circle_id = %circle.id,
        action = "circle_create",
        "Circle created"
    );
    metrics::record_mutation("circle_create");
    Ok(circle)
}

pub(crate) async fn rename(
    conn: &mut PgConnection,
    principal: &Principal,
    circle_id: &str,
    name: Option<&str>,
) -> DomainResult<Circle> {
    let circle = lock_owned(conn, principal, circle_id).await?;
    let Some(name) = name.filter(|name| *name != circle.name) else {
        return Ok(circle);
    };
    if name.trim().is_empty() {
        return Err(DomainError::validation("Circle name must not be blank"));
    }

    let circle =
        repositories::circles::rename(&mut *conn, circle_id, name, primitive_now_utc()).await?;
    tracing::info!(
        teacher_id = %principal.id,
        circle_id = %circle_id,
        action = "circle_rename",
        "Circle renamed"
    );
    metrics::record_mutation("circle_rename");
    Ok(circle)
}

/// Deletes the circle. Members and shared problems survive; only the relations go.
pub(crate) async fn delete(
    conn: &mut PgConnection,
    principal: &Principal,
    circle_id: &str,
) -> DomainResult<()> {
    lock_owned(conn, principal, circle_id).await?;
    repositories::circles::delete_by_id(&mut *conn, circle_id).await?;

    tracing::info!(
        teacher_id = %principal.id,
        circle_id = %circle_id,
        action = "circle_delete",
        "Circle deleted"
    );
    metrics::record_mutation("circle_delete");
    Ok(())
}

pub(crate) async fn edit_relation(
    conn: &mut PgConnection,
    principal: &Principal,
    circle_id: &str,
    target: CircleRelation,
    edit: Edit<'_>,
) -> DomainResult<Option<Partition>> {
    let circle = repositories::circles::lock_by_id(&mut *conn, circle_id)
        .await?
        .ok_or(DomainError::NotFound("Circle"))?;
    permissions::require(principal, Capability::Owner, &RelationAccess(&circle))?;

    let outcome = match target {
        CircleRelation::Members => {
            membership::apply(conn, &CircleMembers { circle_id }, principal, edit).await?
        }
        CircleRelation::Problems => {
            membership::apply(conn, &CircleProblems { circle_id }, principal, edit).await?
        }
    };
    repositories::circles::touch(&mut *conn, circle_id, primitive_now_utc()).await?;

    tracing::info!(
        teacher_id = %principal.id,
        circle_id = %circle_id,
        edit = edit.verb(),
        action = target.label(),
        "Circle relation changed"
    );
    metrics::record_mutation(target.label());
    Ok(outcome)
}

async fn lock_owned(
    conn: &mut PgConnection,
    principal: &Principal,
    circle_id: &str,
) -> DomainResult<Circle> {
    let circle = repositories::circles::lock_by_id(&mut *conn, circle_id)
        .await?
        .ok_or(DomainError::NotFound("Circle"))?;
    permissions::require(principal, Capability::Owner, &circle)?;
    Ok(circle)
}
