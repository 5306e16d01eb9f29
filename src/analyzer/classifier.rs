use crate::redmine::{Issue, NamedRef};
use std::collections::BTreeMap;
use tracing::warn;

pub const OTHER_PROJECT: &str = "Other";
pub const UNKNOWN_STATUS: &str = "Unknown Status";

/// Category name to issues, keys in alphabetical order. Issues keep the
/// order they arrived in.
pub type IssueGroup<'a> = BTreeMap<String, Vec<&'a Issue>>;

pub fn project_name(issue: &Issue) -> &str {
    issue
        .project
        .as_ref()
        .and_then(readable_name)
        .unwrap_or(OTHER_PROJECT)
}

pub fn status_name(issue: &Issue) -> &str {
    issue
        .status
        .as_ref()
        .and_then(readable_name)
        .unwrap_or(UNKNOWN_STATUS)
}

/// Logs one warning per issue that will land in a fallback bucket and
/// returns how many did. Call once per rendered issue set; the name lookups
/// above stay silent.
pub fn warn_missing_attributes(issues: &[Issue]) -> usize {
    issues
        .iter()
        .filter(|issue| {
            let project = issue.project.as_ref();
            let project_unreadable =
                project.is_some_and(|project| readable_name(project).is_none());
            let status_missing = issue.status.as_ref().and_then(readable_name).is_none();
            if !project_unreadable && !status_missing {
                return false;
            }

            warn!(
                issue_id = issue.id,
                project_id = project.map(|project| project.id),
                project_unreadable,
                status_missing,
                "issue attributes missing; using fallback buckets"
            );
            true
        })
        .count()
}

pub fn by_project<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> IssueGroup<'a> {
    group_by(issues, project_name)
}

pub fn by_status<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> IssueGroup<'a> {
    group_by(issues, status_name)
}

fn group_by<'a>(
    issues: impl IntoIterator<Item = &'a Issue>,
    key: fn(&Issue) -> &str,
) -> IssueGroup<'a> {
    issues.into_iter().fold(BTreeMap::new(), |mut acc, issue| {
        acc.entry(key(issue).to_string())
            .or_insert_with(Vec::new)
            .push(issue);
        acc
    })
}

fn readable_name(reference: &NamedRef) -> Option<&str> {
    reference
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
