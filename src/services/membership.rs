//! Container-member relations sharing one add/remove/replace protocol.
//!
//! `exam <- problem` is ordered by an explicit position; circle members and
//! circle problems are plain sets. Each relation supplies its own admission
//! predicate, evaluated against the requester.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgConnection;

use crate::repositories;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::permissions::{self, Capability, Principal, ProblemAccess};

#[async_trait]
pub(crate) trait MembershipRelation: Send + Sync {
    /// New members are appended after the current maximum position.
    const ORDERED: bool;
    /// Human name of a member, used in error messages.
    const MEMBER: &'static str;

    async fn members(&self, conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error>;

    async fn existing(
        &self,
        conn: &mut PgConnection,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error>;

    /// Subset of `candidates` (all known to exist) that passes the admission predicate.
    async fn admitted(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error>;

    async fn max_position(&self, _conn: &mut PgConnection) -> Result<Option<i32>, sqlx::Error> {
        Ok(None)
    }

    /// Inserts `ids` in order, the first one at `first_position` for ordered relations.
    async fn insert(
        &self,
        conn: &mut PgConnection,
        ids: &[String],
        first_position: i32,
    ) -> Result<(), sqlx::Error>;

    async fn delete(&self, conn: &mut PgConnection, ids: &[String]) -> Result<u64, sqlx::Error>;

    async fn clear(&self, conn: &mut PgConnection) -> Result<u64, sqlx::Error>;
}

/// Candidate ids split into three disjoint groups, each in request order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Partition {
    pub(crate) admissible: Vec<String>,
    pub(crate) inadmissible: Vec<String>,
    pub(crate) present: Vec<String>,
}

/// Splits candidates against the current members and the admitted set.
///
/// Repeated ids are tolerated only when they end up inadmissible.
pub(crate) fn partition(
    candidates: &[String],
    current: &HashSet<String>,
    admitted: &HashSet<String>,
) -> DomainResult<Partition> {
    let mut result = Partition::default();
    let mut seen = HashSet::new();

    for id in candidates {
        let group = if current.contains(id) {
            &mut result.present
        } else if admitted.contains(id) {
            &mut result.admissible
        } else {
            result.inadmissible.push(id.clone());
            continue;
        };

        if !seen.insert(id.as_str()) {
            return Err(DomainError::validation(format!("Id {id} appears more than once")));
        }
        group.push(id.clone());
    }

    Ok(result)
}

/// Position for the next appended member of an ordered relation.
pub(crate) fn next_position(max: Option<i32>) -> i32 {
    max.map_or(1, |value| value + 1)
}

pub(crate) async fn add<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    id: &str,
) -> DomainResult<()> {
    let members = relation.members(conn).await?;
    if members.iter().any(|member| member == id) {
        return Err(DomainError::validation(format!("{} {id} is already present", R::MEMBER)));
    }

    let candidate = [id.to_string()];
    if relation.existing(conn, &candidate).await?.is_empty() {
        return Err(DomainError::NotFound(R::MEMBER));
    }
    if relation.admitted(conn, principal, &candidate).await?.is_empty() {
        return Err(DomainError::Permission("You cannot add this member"));
    }

    let position = append_position(conn, relation).await?;
    relation.insert(conn, &candidate, position).await?;
    Ok(())
}

pub(crate) async fn remove<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    id: &str,
) -> DomainResult<()> {
    let removed = relation.delete(conn, &[id.to_string()]).await?;
    if removed == 0 {
        return Err(DomainError::NotFound(R::MEMBER));
    }
    Ok(())
}

pub(crate) async fn classify<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    candidates: &[String],
) -> DomainResult<Partition> {
    if candidates.is_empty() {
        return Err(DomainError::validation("No ids given"));
    }

    let current: HashSet<String> = relation.members(conn).await?.into_iter().collect();
    let unknown: Vec<String> =
        candidates.iter().filter(|id| !current.contains(*id)).cloned().collect();
    let existing = relation.existing(conn, &unknown).await?;
    let existing: Vec<String> = existing.into_iter().collect();
    let admitted = relation.admitted(conn, principal, &existing).await?;

    partition(candidates, &current, &admitted)
}

/// Appends every admissible candidate. Aborts if any candidate is inadmissible.
pub(crate) async fn add_many<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    candidates: &[String],
) -> DomainResult<Partition> {
    let groups = classify(conn, relation, principal, candidates).await?;
    reject_inadmissible::<R>(&groups)?;
    if groups.admissible.is_empty() {
        return Err(DomainError::validation("Every id is already present"));
    }

    let position = append_position(conn, relation).await?;
    relation.insert(conn, &groups.admissible, position).await?;
    Ok(groups)
}

/// Removes the candidates that are currently members and ignores the rest.
pub(crate) async fn remove_many<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    candidates: &[String],
) -> DomainResult<Partition> {
    let groups = classify(conn, relation, principal, candidates).await?;
    if groups.present.is_empty() {
        return Err(DomainError::validation("None of the ids is present"));
    }

    relation.delete(conn, &groups.present).await?;
    Ok(groups)
}

/// Replaces the whole relation with `candidates`, in request order.
///
/// The candidate set is validated in full before the current members are cleared.
pub(crate) async fn replace<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    candidates: &[String],
) -> DomainResult<Partition> {
    let groups = classify(conn, relation, principal, candidates).await?;
    reject_inadmissible::<R>(&groups)?;

    relation.clear(conn).await?;
    relation.insert(conn, candidates, next_position(None)).await?;
    Ok(groups)
}

pub(crate) async fn clear<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
) -> DomainResult<u64> {
    Ok(relation.clear(conn).await?)
}

/// One edit request against a relation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Edit<'a> {
    Add(&'a str),
    Remove(&'a str),
    AddMany(&'a [String]),
    RemoveMany(&'a [String]),
    Replace(&'a [String]),
    Clear,
}

impl Edit<'_> {
    pub(crate) fn verb(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::AddMany(_) => "add_many",
            Self::RemoveMany(_) => "remove_many",
            Self::Replace(_) => "replace",
            Self::Clear => "clear",
        }
    }
}

/// Runs `edit` on `relation`. Bulk edits report how the candidates were partitioned.
pub(crate) async fn apply<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
    principal: &Principal,
    edit: Edit<'_>,
) -> DomainResult<Option<Partition>> {
    match edit {
        Edit::Add(id) => add(conn, relation, principal, id).await.map(|()| None),
        Edit::Remove(id) => remove(conn, relation, id).await.map(|()| None),
        Edit::AddMany(ids) => add_many(conn, relation, principal, ids).await.map(Some),
        Edit::RemoveMany(ids) => remove_many(conn, relation, principal, ids).await.map(Some),
        Edit::Replace(ids) => replace(conn, relation, principal, ids).await.map(Some),
        Edit::Clear => clear(conn, relation).await.map(|_| None),
    }
}

async fn append_position<R: MembershipRelation>(
    conn: &mut PgConnection,
    relation: &R,
) -> Result<i32, sqlx::Error> {
    if !R::ORDERED {
        return Ok(0);
    }
    Ok(next_position(relation.max_position(conn).await?))
}

fn reject_inadmissible<R: MembershipRelation>(groups: &Partition) -> DomainResult<()> {
    if groups.inadmissible.is_empty() {
        return Ok(());
    }
    Err(DomainError::validation(format!(
        "{} ids not found or not allowed: {}",
        R::MEMBER,
        groups.inadmissible.join(", ")
    )))
}

/// Ordered problems of an exam. A problem is admitted if the requester can view it.
pub(crate) struct ExamProblems<'a> {
    pub(crate) exam_id: &'a str,
}

#[async_trait]
impl<'a> MembershipRelation for ExamProblems<'a> {
    const ORDERED: bool = true;
    const MEMBER: &'static str = "Problem";

    async fn members(&self, conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
        repositories::exams::problem_ids(&mut *conn, self.exam_id).await
    }

    async fn existing(
        &self,
        conn: &mut PgConnection,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        let found = repositories::problems::find_many(&mut *conn, candidates).await?;
        Ok(found.into_iter().map(|problem| problem.id).collect())
    }

    async fn admitted(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        admitted_problems(conn, principal, candidates, Capability::Viewer).await
    }

    async fn max_position(&self, conn: &mut PgConnection) -> Result<Option<i32>, sqlx::Error> {
        repositories::exams::max_position(&mut *conn, self.exam_id).await
    }

    async fn insert(
        &self,
        conn: &mut PgConnection,
        ids: &[String],
        first_position: i32,
    ) -> Result<(), sqlx::Error> {
        for (offset, problem_id) in ids.iter().enumerate() {
            let position = first_position + offset as i32;
            repositories::exams::insert_problem(&mut *conn, self.exam_id, problem_id, position)
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, conn: &mut PgConnection, ids: &[String]) -> Result<u64, sqlx::Error> {
        repositories::exams::remove_problems(&mut *conn, self.exam_id, ids).await
    }

    async fn clear(&self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        repositories::exams::clear_problems(&mut *conn, self.exam_id).await
    }
}

/// Teachers belonging to a circle. Any existing teacher is admitted.
pub(crate) struct CircleMembers<'a> {
    pub(crate) circle_id: &'a str,
}

#[async_trait]
impl<'a> MembershipRelation for CircleMembers<'a> {
    const ORDERED: bool = false;
    const MEMBER: &'static str = "Teacher";

    async fn members(&self, conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
        repositories::circles::member_ids(&mut *conn, self.circle_id).await
    }

    async fn existing(
        &self,
        conn: &mut PgConnection,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        let found = repositories::teachers::existing_ids(&mut *conn, candidates).await?;
        Ok(found.into_iter().collect())
    }

    async fn admitted(
        &self,
        _conn: &mut PgConnection,
        _principal: &Principal,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        Ok(candidates.iter().cloned().collect())
    }

    async fn insert(
        &self,
        conn: &mut PgConnection,
        ids: &[String],
        _first_position: i32,
    ) -> Result<(), sqlx::Error> {
        repositories::circles::insert_members(&mut *conn, self.circle_id, ids).await
    }

    async fn delete(&self, conn: &mut PgConnection, ids: &[String]) -> Result<u64, sqlx::Error> {
        repositories::circles::remove_members(&mut *conn, self.circle_id, ids).await
    }

    async fn clear(&self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        repositories::circles::clear_members(&mut *conn, self.circle_id).await
    }
}

/// Problems shared into a circle. Only problems the requester owns are admitted;
/// ownership is not re-checked after sharing.
pub(crate) struct CircleProblems<'a> {
    pub(crate) circle_id: &'a str,
}

#[async_trait]
impl<'a> MembershipRelation for CircleProblems<'a> {
    const ORDERED: bool = false;
    const MEMBER: &'static str = "Problem";

    async fn members(&self, conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
        repositories::circles::problem_ids(&mut *conn, self.circle_id).await
    }

    async fn existing(
        &self,
        conn: &mut PgConnection,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        let found = repositories::problems::find_many(&mut *conn, candidates).await?;
        Ok(found.into_iter().map(|problem| problem.id).collect())
    }

    async fn admitted(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        candidates: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        admitted_problems(conn, principal, candidates, Capability::Owner).await
    }

    async fn insert(
        &self,
        conn: &mut PgConnection,
        ids: &[String],
        _first_position: i32,
    ) -> Result<(), sqlx::Error> {
        repositories::circles::insert_problems(&mut *conn, self.circle_id, ids).await
    }

    async fn delete(&self, conn: &mut PgConnection, ids: &[String]) -> Result<u64, sqlx::Error> {
        repositories::circles::remove_problems(&mut *conn, self.circle_id, ids).await
    }

    async fn clear(&self, conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        repositories::circles::clear_problems(&mut *conn, self.circle_id).await
    }
}

async fn admitted_problems(
    conn: &mut PgConnection,
    principal: &Principal,
    candidates: &[String],
    capability: Capability,
) -> Result<HashSet<String>, sqlx::Error> {
    let problems = repositories::problems::find_many(&mut *conn, candidates).await?;
    let mut admitted = HashSet::with_capacity(problems.len());
    for problem in problems {
        let access = ProblemAccess::load(&mut *conn, &problem).await?;
        if permissions::allows(principal, capability, &access) {
            admitted.insert(problem.id);
        }
    }
    Ok(admitted)
}
