//! Replacement of a problem's tag associations.

use std::collections::HashSet;

use sqlx::PgConnection;

use crate::repositories;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::registries;

/// Validates a submitted tag list and drops repeated names, keeping first occurrences.
///
/// Names are matched exactly; no case folding or trimming is applied.
pub(crate) fn normalize(names: &[String]) -> DomainResult<Vec<String>> {
    if names.is_empty() {
        return Err(DomainError::validation("A problem needs at least one tag"));
    }

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(DomainError::validation("Tag names must not be blank"));
        }
        if seen.insert(name.as_str()) {
            unique.push(name.clone());
        }
    }
    Ok(unique)
}

/// Clears the problem's tags, re-associates `names` (creating missing tags)
/// and sweeps tags left without problems.
pub(crate) async fn replace(
    conn: &mut PgConnection,
    problem_id: &str,
    names: &[String],
) -> DomainResult<()> {
    let names = normalize(names)?;

    repositories::tags::clear_for_problem(&mut *conn, problem_id).await?;

    let mut tag_ids = Vec::with_capacity(names.len());
    for name in &names {
        tag_ids.push(repositories::tags::get_or_create(&mut *conn, name).await?);
    }
    repositories::tags::attach(&mut *conn, problem_id, &tag_ids).await?;

    registries::sweep_tags(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_list_rejected() {
        assert!(matches!(normalize(&[]), Err(DomainError::Validation(_))));
    }

    #[test]
    fn blank_name_rejected() {
        assert!(matches!(normalize(&names(&["sd", "  "])), Err(DomainError::Validation(_))));
    }

    #[test]
    fn repeated_names_collapse_in_order() {
        assert_eq!(normalize(&names(&["net", "sd", "net"])).unwrap(), names(&["net", "sd"]));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(normalize(&names(&["SD", "sd"])).unwrap(), names(&["SD", "sd"]));
    }
}
