//! Capability checks evaluated against the requester and the entity graph only.

use std::collections::HashSet;

use sqlx::PgExecutor;

use crate::db::models::{Circle, Exam, Problem, Task, Teacher};
use crate::db::types::TeacherRole;
use crate::repositories;
use crate::services::errors::{DomainError, DomainResult};

/// Authenticated requester identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Principal {
    pub(crate) id: String,
    pub(crate) role: TeacherRole,
}

impl Principal {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == TeacherRole::Admin
    }
}

impl From<&Teacher> for Principal {
    fn from(teacher: &Teacher) -> Self {
        Self { id: teacher.id.clone(), role: teacher.role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capability {
    Registered,
    Owner,
    Viewer,
    Admin,
}

/// Ownership rules of one entity kind.
pub(crate) trait CapabilityCheck {
    fn is_owner(&self, principal: &Principal) -> bool;

    fn is_viewer(&self, principal: &Principal) -> bool {
        self.is_owner(principal)
    }
}

pub(crate) fn allows(
    principal: &Principal,
    capability: Capability,
    target: &(impl CapabilityCheck + ?Sized),
) -> bool {
    if principal.is_admin() {
        return true;
    }

    match capability {
        Capability::Registered => true,
        Capability::Admin => false,
        Capability::Owner => target.is_owner(principal),
        Capability::Viewer => target.is_viewer(principal),
    }
}

pub(crate) fn require(
    principal: &Principal,
    capability: Capability,
    target: &(impl CapabilityCheck + ?Sized),
) -> DomainResult<()> {
    if allows(principal, capability, target) {
        return Ok(());
    }

    Err(DomainError::Permission(match capability {
        Capability::Admin => "Admin access required",
        Capability::Viewer => "You cannot view this resource",
        Capability::Owner | Capability::Registered => "You do not own this resource",
    }))
}

pub(crate) fn require_admin(principal: &Principal) -> DomainResult<()> {
    require(principal, Capability::Admin, &Unowned)
}

/// Target of service-wide operations such as creating a new entity. Nobody owns it.
pub(crate) struct Unowned;

impl CapabilityCheck for Unowned {
    fn is_owner(&self, _principal: &Principal) -> bool {
        false
    }
}

impl CapabilityCheck for Teacher {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.id == principal.id
    }
}

impl CapabilityCheck for Exam {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.creator_id == principal.id
    }
}

impl CapabilityCheck for Circle {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.creator_id == principal.id
    }
}

impl CapabilityCheck for Task {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.creator_id == principal.id
    }
}

/// A problem's creator plus every teacher it is shared with through a circle.
#[derive(Debug, Clone)]
pub(crate) struct ProblemAccess {
    pub(crate) creator_id: String,
    pub(crate) viewer_ids: HashSet<String>,
}

impl ProblemAccess {
    pub(crate) async fn load(
        executor: impl PgExecutor<'_>,
        problem: &Problem,
    ) -> Result<Self, sqlx::Error> {
        let viewer_ids = repositories::problems::viewer_ids(executor, &problem.id).await?;
        Ok(Self {
            creator_id: problem.creator_id.clone(),
            viewer_ids: viewer_ids.into_iter().collect(),
        })
    }
}

impl CapabilityCheck for ProblemAccess {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.creator_id == principal.id
    }

    fn is_viewer(&self, principal: &Principal) -> bool {
        self.is_owner(principal) || self.viewer_ids.contains(&principal.id)
    }
}

/// Questions have no owner of their own; their problem decides.
pub(crate) struct QuestionAccess<'a>(pub(crate) &'a ProblemAccess);

impl CapabilityCheck for QuestionAccess<'_> {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.0.is_owner(principal)
    }

    fn is_viewer(&self, principal: &Principal) -> bool {
        self.0.is_viewer(principal)
    }
}

/// A container-member relation. Only the container's owner may change it.
pub(crate) struct RelationAccess<'a, C: CapabilityCheck>(pub(crate) &'a C);

impl<C: CapabilityCheck> CapabilityCheck for RelationAccess<'_, C> {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.0.is_owner(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn principal(id: &str, role: TeacherRole) -> Principal {
        Principal { id: id.to_string(), role }
    }

    fn problem_access(creator: &str, viewers: &[&str]) -> ProblemAccess {
        ProblemAccess {
            creator_id: creator.to_string(),
            viewer_ids: viewers.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn circle(creator: &str) -> Circle {
        Circle {
            id: "c1".to_string(),
            name: "algebra".to_string(),
            creator_id: creator.to_string(),
            created_at: datetime!(2024-01-01 0:00),
            modified_at: datetime!(2024-01-01 0:00),
        }
    }

    #[test]
    fn viewer_through_circle_but_not_owner() {
        let access = problem_access("t1", &["t2"]);
        let t2 = principal("t2", TeacherRole::Teacher);
        let t3 = principal("t3", TeacherRole::Teacher);

        assert!(allows(&t2, Capability::Viewer, &access));
        assert!(!allows(&t2, Capability::Owner, &access));
        assert!(!allows(&t3, Capability::Viewer, &access));
        assert!(matches!(
            require(&t3, Capability::Viewer, &access),
            Err(DomainError::Permission(_))
        ));
    }

    #[test]
    fn owner_implies_viewer() {
        let access = problem_access("t1", &[]);
        let t1 = principal("t1", TeacherRole::Teacher);
        assert!(allows(&t1, Capability::Owner, &access));
        assert!(allows(&t1, Capability::Viewer, &access));
    }

    #[test]
    fn admin_bypasses_everything() {
        let access = problem_access("t1", &[]);
        let admin = principal("root", TeacherRole::Admin);
        for capability in
            [Capability::Registered, Capability::Owner, Capability::Viewer, Capability::Admin]
        {
            assert!(allows(&admin, capability, &access));
        }
        assert!(require_admin(&admin).is_ok());
    }

    #[test]
    fn registered_always_passes_admin_never_for_teachers() {
        let access = problem_access("t1", &[]);
        let t9 = principal("t9", TeacherRole::Teacher);
        assert!(allows(&t9, Capability::Registered, &access));
        assert!(!allows(&t9, Capability::Admin, &access));
        assert!(require_admin(&t9).is_err());
    }

    #[test]
    fn unowned_target_admits_registered_teachers_only_as_registered() {
        let teacher = principal("t1", TeacherRole::Teacher);
        assert!(require(&teacher, Capability::Registered, &Unowned).is_ok());
        assert!(!allows(&teacher, Capability::Owner, &Unowned));
        assert!(!allows(&teacher, Capability::Viewer, &Unowned));
        assert!(matches!(
            require(&teacher, Capability::Admin, &Unowned),
            Err(DomainError::Permission("Admin access required"))
        ));

        let admin = principal("root", TeacherRole::Admin);
        assert!(require(&admin, Capability::Admin, &Unowned).is_ok());
    }

    #[test]
    fn question_delegates_to_problem() {
        let access = problem_access("t1", &["t2"]);
        let question = QuestionAccess(&access);
        assert!(allows(&principal("t2", TeacherRole::Teacher), Capability::Viewer, &question));
        assert!(!allows(&principal("t2", TeacherRole::Teacher), Capability::Owner, &question));
    }

    #[test]
    fn relation_delegates_to_container_creator() {
        let container = circle("t1");
        let relation = RelationAccess(&container);
        assert!(allows(&principal("t1", TeacherRole::Teacher), Capability::Owner, &relation));
        assert!(!allows(&principal("t2", TeacherRole::Teacher), Capability::Owner, &relation));
        assert!(!allows(&principal("t2", TeacherRole::Teacher), Capability::Viewer, &relation));
    }
}
