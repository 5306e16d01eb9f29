use crate::analyzer::classifier::{by_project, status_name};
use crate::redmine::Issue;
use chrono::Datelike;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
}

/// Read-only snapshot over one issue set. Month keys always cover the twelve
/// months of `reference_year`, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStatistics {
    pub reference_year: Option<i32>,
    pub total: usize,
    pub project_count: usize,
    pub statuses: BTreeMap<String, usize>,
    pub projects: Vec<Share>,
    pub months: Vec<Share>,
    pub month_total: usize,
    pub outside_reference_year: usize,
}

impl PeriodStatistics {
    /// Month buckets use the issue's update time in `timezone`. Without an
    /// explicit year, the first issue's update year is the reference.
    pub fn compute(issues: &[Issue], reference_year: Option<i32>, timezone: Tz) -> Self {
        let total = issues.len();
        let reference_year = reference_year.or_else(|| {
            issues
                .first()
                .map(|issue| issue.updated_on.with_timezone(&timezone).year())
        });

        let statuses = issues.iter().fold(BTreeMap::new(), |mut acc, issue| {
            *acc.entry(status_name(issue).to_string()).or_insert(0_usize) += 1;
            acc
        });

        let mut projects = by_project(issues)
            .into_iter()
            .map(|(name, members)| Share {
                percentage: percentage(members.len(), total),
                count: members.len(),
                name,
            })
            .collect::<Vec<_>>();
        projects.sort_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| left.name.cmp(&right.name))
        });

        let month_counts = issues.iter().fold(HashMap::new(), |mut acc, issue| {
            let local = issue.updated_on.with_timezone(&timezone);
            *acc.entry((local.year(), local.month())).or_insert(0_usize) += 1;
            acc
        });

        let months = reference_year
            .map(|year| {
                (1..=12)
                    .map(|month| {
                        let count = month_counts.get(&(year, month)).copied().unwrap_or_default();
                        Share {
                            name: format!("{year}-{month:02}"),
                            count,
                            percentage: percentage(count, total),
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let month_total = months.iter().map(|month| month.count).sum::<usize>();
        let outside_reference_year = total.saturating_sub(month_total);

        if month_total != total {
            warn!(
                total,
                month_total,
                reference_year = ?reference_year,
                "monthly trend does not reconcile with total; some issues were updated outside the reference year"
            );
        }

        Self {
            reference_year,
            total,
            project_count: projects.len(),
            statuses,
            projects,
            months,
            month_total,
            outside_reference_year,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.month_total == self.total
    }

    pub fn month_total_percentage(&self) -> f64 {
        percentage(self.month_total, self.total)
    }
}

/// `100 * count / total`, defined as 0 when there is nothing to divide by.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::{PeriodStatistics, percentage};
    use crate::testing::issue;
    use chrono_tz::Tz;

    const UTC: Tz = Tz::UTC;

    #[test]
    fn month_histogram_reconciles_with_total_within_the_year() {
        let issues = vec![
            issue(1, Some("Core"), Some("New"), "2024-01-15T00:00:00Z"),
            issue(2, Some("Core"), Some("Closed"), "2024-01-20T00:00:00Z"),
            issue(3, Some("Web"), Some("Closed"), "2024-07-01T00:00:00Z"),
            issue(4, None, Some("Resolved"), "2024-12-31T12:00:00Z"),
        ];

        let stats = PeriodStatistics::compute(&issues, Some(2024), UTC);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.months.len(), 12);
        assert_eq!(stats.months[0].name, "2024-01");
        assert_eq!(stats.months[0].count, 2);
        assert_eq!(stats.months[1].count, 0);
        assert!(stats.is_reconciled());
        assert_eq!(stats.outside_reference_year, 0);
        assert_eq!(stats.statuses["Closed"], 2);
    }

    #[test]
    fn reference_year_defaults_to_first_issue() {
        let issues = vec![issue(1, Some("Core"), Some("New"), "2023-06-01T00:00:00Z")];

        let stats = PeriodStatistics::compute(&issues, None, UTC);

        assert_eq!(stats.reference_year, Some(2023));
        assert_eq!(stats.months[5].name, "2023-06");
        assert_eq!(stats.months[5].count, 1);
    }

    #[test]
    fn out_of_year_issues_surface_as_discrepancy() {
        let issues = vec![
            issue(1, Some("Core"), Some("New"), "2023-12-30T00:00:00Z"),
            issue(2, Some("Core"), Some("New"), "2024-01-02T00:00:00Z"),
        ];

        let stats = PeriodStatistics::compute(&issues, Some(2024), UTC);

        assert!(!stats.is_reconciled());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.month_total, 1);
        assert_eq!(stats.outside_reference_year, 1);
    }

    #[test]
    fn months_follow_the_configured_timezone() {
        let shanghai: Tz = "Asia/Shanghai".parse().expect("timezone");
        let issues = vec![issue(1, Some("Core"), Some("New"), "2024-01-31T20:00:00Z")];

        let stats = PeriodStatistics::compute(&issues, Some(2024), shanghai);

        assert_eq!(stats.months[0].count, 0);
        assert_eq!(stats.months[1].count, 1);
    }

    #[test]
    fn project_ties_break_alphabetically() {
        let issues = vec![
            issue(1, Some("Zeta"), Some("New"), "2024-02-01T00:00:00Z"),
            issue(2, Some("Alpha"), Some("New"), "2024-02-01T00:00:00Z"),
            issue(3, Some("Mid"), Some("New"), "2024-02-01T00:00:00Z"),
            issue(4, Some("Mid"), Some("New"), "2024-02-01T00:00:00Z"),
        ];

        let stats = PeriodStatistics::compute(&issues, Some(2024), UTC);
        let order = stats
            .projects
            .iter()
            .map(|share| share.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(order, vec!["Mid", "Alpha", "Zeta"]);
        assert_eq!(stats.project_count, 3);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let issues = (1..=7)
            .map(|id| {
                let project = ["A", "B", "C"][id as usize % 3];
                let stamp = format!("2024-{:02}-10T00:00:00Z", id);
                issue(id, Some(project), Some("New"), &stamp)
            })
            .collect::<Vec<_>>();

        let stats = PeriodStatistics::compute(&issues, Some(2024), UTC);
        let project_sum = stats.projects.iter().map(|share| share.percentage).sum::<f64>();
        let month_sum = stats.months.iter().map(|share| share.percentage).sum::<f64>();

        assert!((project_sum - 100.0).abs() < 1e-9);
        assert!((month_sum - 100.0).abs() < 1e-9);
        assert!((stats.month_total_percentage() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_set_has_zero_percentages() {
        let stats = PeriodStatistics::compute(&[], Some(2024), UTC);

        assert_eq!(stats.total, 0);
        assert!(stats.is_reconciled());
        assert!(stats.months.iter().all(|month| month.percentage == 0.0));
        assert_eq!(percentage(3, 0), 0.0);
    }
}
