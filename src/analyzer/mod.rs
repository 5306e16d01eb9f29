pub mod classifier;
pub mod output;
pub mod report;
pub mod stats;

use crate::analyzer::output::ReportSink;
use crate::analyzer::report::ReportComposer;
use crate::analyzer::stats::PeriodStatistics;
use crate::calendar::{Period, year_weeks};
use crate::fetcher::{ActivityFetcher, Facet, FetchMode, contributed, dedupe};
use crate::redmine::{DateField, Issue, IssueSource};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YearlyMode {
    /// Summarize the union of every weekly fetch.
    Weeks,
    /// Split the year into assigned work and contributed work.
    Roles,
}

#[derive(Debug, Clone, Copy)]
pub struct YearOptions {
    pub fetch_mode: FetchMode,
    pub yearly_mode: YearlyMode,
    pub include_empty_weeks: bool,
}

#[derive(Debug)]
pub struct SavedWeek {
    pub period: Period,
    pub issues: usize,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct YearOutcome {
    pub weeks_processed: usize,
    pub weekly_files: Vec<PathBuf>,
    pub rollup_path: PathBuf,
    pub summary_path: PathBuf,
    pub statistics_path: PathBuf,
    pub statistics: PeriodStatistics,
}

pub struct ReportPipeline<'a, S: IssueSource, K: ReportSink> {
    fetcher: ActivityFetcher<'a, S>,
    composer: &'a ReportComposer,
    sink: &'a K,
    user_id: u64,
}

impl<'a, S: IssueSource, K: ReportSink> ReportPipeline<'a, S, K> {
    pub fn new(source: &'a S, composer: &'a ReportComposer, sink: &'a K, user_id: u64) -> Self {
        Self {
            fetcher: ActivityFetcher::new(source),
            composer,
            sink,
            user_id,
        }
    }

    pub fn weekly(&self, period: &Period, mode: FetchMode) -> Result<SavedWeek> {
        let issues = self.fetcher.fetch_period(self.user_id, period, mode);
        let report = self.composer.weekly_report(period, &issues);
        let path = self
            .sink
            .write(&output::weekly_file_name(period), &report)?;

        Ok(SavedWeek {
            period: *period,
            issues: issues.len(),
            path,
        })
    }

    /// Every week of `year`, then the rollup and one yearly summary. Weeks
    /// run strictly one after another.
    pub fn yearly(&self, year: i32, options: YearOptions) -> Result<YearOutcome> {
        let weeks = year_weeks(year);
        println!("Generating reports for {year}, total {} weeks...", weeks.len());

        let mut saved_weeks = Vec::new();
        let mut weekly_files = Vec::new();
        let mut weekly_issues = Vec::new();

        for (index, period) in weeks.iter().enumerate() {
            println!(
                "Processing week {}/{}: {}",
                index + 1,
                weeks.len(),
                period.label()
            );

            let issues = self
                .fetcher
                .fetch_period(self.user_id, period, options.fetch_mode);
            if issues.is_empty() && !options.include_empty_weeks {
                continue;
            }

            let report = self.composer.weekly_report(period, &issues);
            let path = self
                .sink
                .write(&output::weekly_file_name(period), &report)?;
            println!("Saved report to {}", path.display());

            weekly_files.push(path);
            weekly_issues.extend(issues);
            saved_weeks.push((*period, report));
        }

        let rollup = self.composer.weekly_rollup(year, &saved_weeks);
        let rollup_path = self
            .sink
            .write(&output::weekly_rollup_file_name(year), &rollup)?;
        println!("Saved weekly summary to {}", rollup_path.display());

        let (summary, statistics) = match options.yearly_mode {
            YearlyMode::Weeks => self.summary_from_weeks(year, weekly_issues),
            YearlyMode::Roles => self.summary_from_roles(year)?,
        };

        let summary_path = self
            .sink
            .write(&output::yearly_summary_file_name(year), &summary)?;
        println!("Saved yearly summary to {}", summary_path.display());

        let statistics_json = serde_json::to_string_pretty(&statistics)
            .context("Failed to serialize yearly statistics")?;
        let statistics_path = self
            .sink
            .write(&output::yearly_statistics_file_name(year), &statistics_json)?;

        info!(
            year,
            weeks = weeks.len(),
            saved_weeks = weekly_files.len(),
            issues = statistics.total,
            "yearly reports generated"
        );

        Ok(YearOutcome {
            weeks_processed: weeks.len(),
            weekly_files,
            rollup_path,
            summary_path,
            statistics_path,
            statistics,
        })
    }

    /// Yearly summary over the issues already fetched week by week. An issue
    /// active in several weeks counts once.
    pub fn summary_from_weeks(
        &self,
        year: i32,
        weekly_issues: Vec<Issue>,
    ) -> (String, PeriodStatistics) {
        let issues = dedupe(weekly_issues);
        let summary = self.composer.yearly_summary(year, &issues);
        let statistics = self.composer.statistics(year, &issues);

        (summary, statistics)
    }

    /// Yearly narrative split by role: issues assigned to the user (created in
    /// the year) versus issues the user authored and does not own. An
    /// authored issue assigned to the user but created earlier appears in
    /// neither section.
    pub fn summary_from_roles(&self, year: i32) -> Result<(String, PeriodStatistics)> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .with_context(|| format!("Invalid report year: {year}"))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .with_context(|| format!("Invalid report year: {year}"))?;

        let assigned = self
            .fetcher
            .fetch(self.user_id, start, end, FetchMode::AssignedOnly);
        let authored = self.fetcher.facet(
            self.user_id,
            Facet::Authored,
            DateField::UpdatedOn,
            start,
            end,
        );
        let contributed = contributed(&authored, &assigned, self.user_id);
        info!(
            year,
            assigned = assigned.len(),
            contributed = contributed.len(),
            "split yearly issues by role"
        );

        let narrative = self
            .composer
            .yearly_narrative(year, &assigned, &contributed);
        let combined = dedupe(assigned.into_iter().chain(contributed));
        let statistics = self.composer.statistics(year, &combined);

        Ok((narrative, statistics))
    }
}
