use crate::calendar::Period;
use crate::redmine::{DateField, Issue, IssueQuery, IssueSource};
use chrono::NaiveDate;
use clap::ValueEnum;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchMode {
    /// Issues the user authored or is assigned to, by update time.
    AuthoredOrAssigned,
    /// Issues assigned to the user, by creation time.
    AssignedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Authored,
    Assigned,
}

impl Facet {
    fn name(self) -> &'static str {
        match self {
            Self::Authored => "authored",
            Self::Assigned => "assigned",
        }
    }
}

pub struct ActivityFetcher<'a, S: IssueSource> {
    source: &'a S,
}

impl<'a, S: IssueSource> ActivityFetcher<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn fetch(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        mode: FetchMode,
    ) -> Vec<Issue> {
        let issues = match mode {
            FetchMode::AssignedOnly => {
                self.facet(user_id, Facet::Assigned, DateField::CreatedOn, start, end)
            }
            FetchMode::AuthoredOrAssigned => dedupe(
                self.facet(user_id, Facet::Authored, DateField::UpdatedOn, start, end)
                    .into_iter()
                    .chain(self.facet(user_id, Facet::Assigned, DateField::UpdatedOn, start, end)),
            ),
        };

        info!(user_id, %start, %end, issues = issues.len(), "fetched activity");
        issues
    }

    pub fn fetch_period(&self, user_id: u64, period: &Period, mode: FetchMode) -> Vec<Issue> {
        self.fetch(user_id, period.monday, period.sunday, mode)
    }

    /// A single facet query. A failed call is logged and yields no issues so
    /// one bad period never aborts a batch.
    pub fn facet(
        &self,
        user_id: u64,
        facet: Facet,
        date_field: DateField,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<Issue> {
        let query = IssueQuery {
            date_field,
            start,
            end,
            author_id: (facet == Facet::Authored).then_some(user_id),
            assignee_id: (facet == Facet::Assigned).then_some(user_id),
        };

        self.source.issues(&query).unwrap_or_else(|error| {
            warn!(
                error = %error,
                facet = facet.name(),
                %start,
                %end,
                "issue fetch failed; treating period as empty"
            );
            Vec::new()
        })
    }
}

/// Keeps the first copy of each issue id, preserving arrival order.
pub fn dedupe(issues: impl IntoIterator<Item = Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.id))
        .collect()
}

/// Authored issues the user is not assigned to. An issue counts as assigned
/// when it is in `assigned` or its current assignee is `user_id`, so work
/// created before the assigned window still stays out of this set.
pub fn contributed(authored: &[Issue], assigned: &[Issue], user_id: u64) -> Vec<Issue> {
    let assigned_ids = assigned.iter().map(|issue| issue.id).collect::<HashSet<_>>();
    dedupe(
        authored
            .iter()
            .filter(|issue| !assigned_ids.contains(&issue.id))
            .filter(|issue| {
                issue
                    .assignee
                    .as_ref()
                    .is_none_or(|assignee| assignee.id != user_id)
            })
            .cloned(),
    )
}
