use crate::analyzer::classifier::{by_project, by_status, status_name, warn_missing_attributes};
use crate::analyzer::stats::PeriodStatistics;
use crate::calendar::Period;
use crate::redmine::Issue;
use chrono_tz::Tz;

pub const NO_ACTIVITY_MARKER: &str = "> No recorded activity this week";
pub const WORK_ITEMS_HEADING: &str = "## Work Items";
const EMPTY_SECTION_MARKER: &str = "> No recorded activity";

/// Renders issue sets as markdown. Output depends only on its inputs, so the
/// same issues always produce byte-identical text.
#[derive(Debug, Clone)]
pub struct ReportComposer {
    link_base: String,
    timezone: Tz,
}

impl ReportComposer {
    pub fn new(link_base: impl Into<String>, timezone: Tz) -> Self {
        Self {
            link_base: link_base.into().trim_end_matches('/').to_string(),
            timezone,
        }
    }

    pub fn weekly_report(&self, period: &Period, issues: &[Issue]) -> String {
        let header = format!("# Weekly Work Summary\n\n**Period:** {}", period.label());

        if issues.is_empty() {
            return format!("{header}\n\n{NO_ACTIVITY_MARKER}\n");
        }

        warn_missing_attributes(issues);

        let sections = by_project(issues)
            .into_iter()
            .map(|(project, members)| {
                let rows = members
                    .iter()
                    .map(|issue| format!("- {} [{}]", self.issue_link(issue), status_name(issue)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("### {project}\n\n{rows}\n")
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("{header}\n\n{WORK_ITEMS_HEADING}\n\n{sections}\n")
    }

    pub fn yearly_summary(&self, year: i32, issues: &[Issue]) -> String {
        format!(
            "# {year} Work Summary\n\n{}",
            self.summary_body(year, issues, 2)
        )
    }

    /// Primary work is what the user was assigned; participation is what
    /// they authored without being the assignee.
    pub fn yearly_narrative(
        &self,
        year: i32,
        assigned_issues: &[Issue],
        contributed_issues: &[Issue],
    ) -> String {
        format!(
            "# {year} Annual Review\n\n## Primary Work\n\n{}## Participation/Assistance\n\n{}",
            self.summary_body(year, assigned_issues, 3),
            self.summary_body(year, contributed_issues, 3)
        )
    }

    pub fn weekly_rollup(&self, year: i32, weeks: &[(Period, String)]) -> String {
        let entries = weeks
            .iter()
            .map(|(period, report)| {
                format!(
                    "## Week {} ({})\n\n{report}\n---\n\n",
                    period.iso_week(),
                    period.label()
                )
            })
            .collect::<String>();

        format!("# {year} Weekly Report Digest\n\n{entries}")
    }

    pub fn statistics(&self, year: i32, issues: &[Issue]) -> PeriodStatistics {
        PeriodStatistics::compute(issues, Some(year), self.timezone)
    }

    fn issue_link(&self, issue: &Issue) -> String {
        format!(
            "[{}]({}/issues/{}) (#{})",
            issue.subject, self.link_base, issue.id, issue.id
        )
    }

    fn summary_body(&self, year: i32, issues: &[Issue], depth: usize) -> String {
        warn_missing_attributes(issues);

        let stats = self.statistics(year, issues);
        let section = "#".repeat(depth);
        let subsection = "#".repeat(depth + 1);
        let group = "#".repeat(depth + 2);

        let statistics_table = table(
            "| Metric | Value |\n|--------|-------|",
            [
                format!("| Total issues | {} |", stats.total),
                format!("| Projects involved | {} |", stats.project_count),
            ]
            .into_iter()
            .chain(
                stats
                    .statuses
                    .iter()
                    .map(|(status, count)| format!("| {status} issues | {count} |")),
            ),
        );

        let project_table = table(
            "| Project | Issues | Share |\n|---------|--------|-------|",
            stats.projects.iter().map(|share| {
                format!(
                    "| {} | {} | {:.1}% |",
                    share.name, share.count, share.percentage
                )
            }),
        );

        let month_table = table(
            "| Month | Issues | Share |\n|-------|--------|-------|",
            stats
                .months
                .iter()
                .map(|share| {
                    format!(
                        "| {} | {} | {:.1}% |",
                        share.name, share.count, share.percentage
                    )
                })
                .chain(std::iter::once(format!(
                    "| Total | {} | {:.1}% |",
                    stats.month_total,
                    stats.month_total_percentage()
                ))),
        );

        let note = if stats.is_reconciled() {
            String::new()
        } else {
            format!(
                "> Note: {} issue(s) were updated outside {year} and are not counted in the monthly trend.\n\n",
                stats.outside_reference_year
            )
        };

        let details = if issues.is_empty() {
            format!("{EMPTY_SECTION_MARKER}\n\n")
        } else {
            by_project(issues)
                .into_iter()
                .map(|(project, members)| {
                    let groups = by_status(members)
                        .into_iter()
                        .map(|(status, status_members)| {
                            let rows = status_members
                                .iter()
                                .map(|issue| format!("- {}", self.issue_link(issue)))
                                .collect::<Vec<_>>()
                                .join("\n");
                            format!("{group} {status}\n\n{rows}\n\n")
                        })
                        .collect::<String>();
                    format!("{subsection} {project}\n\n{groups}---\n\n")
                })
                .collect::<String>()
        };

        format!(
            "{section} Annual Overview\n\n\
             {subsection} Statistics\n\n{statistics_table}\n\n\
             {subsection} Project Distribution\n\n{project_table}\n\n\
             {subsection} Monthly Trend\n\n{month_table}\n\n\
             {note}---\n\n\
             {section} Project Details\n\n{details}"
        )
    }
}

fn table(header: &str, rows: impl IntoIterator<Item = String>) -> String {
    std::iter::once(header.to_string())
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}
