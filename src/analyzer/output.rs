use crate::calendar::Period;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub trait ReportSink {
    /// Writes one whole artifact and returns where it landed.
    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf>;
}

/// Writes artifacts into `<base>/weekly_reports_<YEAR>/`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn for_year(base: &Path, year: i32) -> Self {
        Self {
            dir: base.join(report_dir_name(year)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for DirectorySink {
    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create report directory: {}", self.dir.display())
        })?;

        let path = self.dir.join(file_name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        Ok(path)
    }
}

pub fn report_dir_name(year: i32) -> String {
    format!("weekly_reports_{year}")
}

pub fn weekly_file_name(period: &Period) -> String {
    format!(
        "week_{:02}_{}.md",
        period.iso_week(),
        period.compact_label()
    )
}

pub fn yearly_summary_file_name(year: i32) -> String {
    format!("yearly_summary_{year}.md")
}

pub fn yearly_statistics_file_name(year: i32) -> String {
    format!("yearly_summary_{year}.json")
}

pub fn weekly_rollup_file_name(year: i32) -> String {
    format!("weekly_summary_{year}.md")
}
