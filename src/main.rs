mod analyzer;
mod calendar;
mod cli;
mod config;
mod error;
mod fetcher;
mod redmine;
#[cfg(test)]
mod testing;

use crate::analyzer::output::DirectorySink;
use crate::analyzer::report::ReportComposer;
use crate::analyzer::{ReportPipeline, YearOptions, YearlyMode};
use crate::calendar::{last_week_range, this_week_range, today_in};
use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::{Config, is_secret_key};
use crate::error::ConfigError;
use crate::fetcher::FetchMode;
use crate::redmine::RedmineClient;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding(&config_path)?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(&config_path, command),
        Commands::Doctor => handle_doctor(&config_path),
        Commands::Week { last, date, mode } => handle_week(&config_path, last, date, mode),
        Commands::Year { year, mode, fetch } => handle_year(&config_path, year, mode, fetch),
    }
}

fn handle_config_command(config_path: &Path, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config(config_path)?;
            config.set_value(&key, &value)?;
            config.save(config_path)?;

            let masked = if is_secret_key(&key) {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(config_path)?;
            let value = config
                .get_value(&key)
                .ok_or_else(|| ConfigError::UnsupportedKey(key.clone()))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_doctor(config_path: &Path) -> Result<()> {
    let mut warnings = Vec::new();

    if config_path.exists() {
        println!("[OK] config found: {}", config_path.display());
    } else {
        println!("[WARN] config not found: {}", config_path.display());
        warnings.push("config missing");
    }

    let config = Config::load(config_path).unwrap_or_default();

    match config.base_url() {
        Ok(url) => println!("[OK] redmine.url: {url}"),
        Err(error) => {
            println!("[WARN] {error}");
            warnings.push("redmine.url");
        }
    }

    match config.user_id() {
        Ok(user_id) => println!("[OK] redmine.user_id: {user_id}"),
        Err(error) => {
            println!("[WARN] {error}");
            warnings.push("redmine.user_id");
        }
    }

    match config.year(None) {
        Ok(year) => println!("[OK] report.year: {year}"),
        Err(_) => {
            println!("[WARN] report.year not set; `year` will need --year");
            warnings.push("report.year");
        }
    }

    match config.timezone() {
        Ok(timezone) => println!("[OK] report.timezone: {timezone}"),
        Err(error) => {
            println!("[WARN] {error}");
            warnings.push("report.timezone");
        }
    }

    match config.credentials() {
        Ok(credentials) => println!("[OK] authentication: {}", credentials.mode()),
        Err(error) => {
            println!("[WARN] {error}");
            warnings.push("credentials");
        }
    }

    if config.report_dir.exists() {
        println!("[OK] report dir exists: {}", config.report_dir.display());
    } else {
        println!(
            "[WARN] report dir missing (it will be created): {}",
            config.report_dir.display()
        );
        warnings.push("report dir missing");
    }

    if config.base_url().is_ok() && config.has_credentials() {
        match RedmineClient::from_config(&config).map(|client| client.current_user()) {
            Ok(Ok(user)) => println!(
                "[OK] connected as {} (id {})",
                user.login.as_deref().unwrap_or("unknown"),
                user.id
            ),
            Ok(Err(error)) => {
                println!("[WARN] Redmine connection failed: {error}");
                warnings.push("connection");
            }
            Err(error) => {
                println!("[WARN] Redmine client could not be built: {error}");
                warnings.push("client");
            }
        }
    }

    if warnings.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", warnings.len());
    }

    Ok(())
}

fn handle_week(
    config_path: &Path,
    last: bool,
    date: Option<String>,
    mode: FetchMode,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let timezone = config.timezone()?;
    let user_id = config.user_id()?;
    let client = RedmineClient::from_config(&config)?;

    let today = parse_optional_date(date, timezone)?;
    let period = if last {
        last_week_range(today)
    } else {
        this_week_range(today)
    };

    let composer = ReportComposer::new(config.link_base(), timezone);
    let sink = DirectorySink::for_year(&config.report_dir, period.monday.iso_week().year());
    let pipeline = ReportPipeline::new(&client, &composer, &sink, user_id);

    let saved = pipeline.weekly(&period, mode)?;

    println!("Weekly report generated: {}", saved.period.label());
    println!("- Issues: {}", saved.issues);
    println!("- Markdown: {}", saved.path.display());

    Ok(())
}

fn handle_year(
    config_path: &Path,
    year: Option<i32>,
    yearly_mode: YearlyMode,
    fetch_mode: FetchMode,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let year = config.year(year)?;
    let timezone = config.timezone()?;
    let user_id = config.user_id()?;
    let client = RedmineClient::from_config(&config)?;

    let composer = ReportComposer::new(config.link_base(), timezone);
    let sink = DirectorySink::for_year(&config.report_dir, year);
    let pipeline = ReportPipeline::new(&client, &composer, &sink, user_id);

    info!(year, user_id, mode = ?yearly_mode, "starting yearly run");

    let outcome = pipeline.yearly(
        year,
        YearOptions {
            fetch_mode,
            yearly_mode,
            include_empty_weeks: config.report_include_empty_weeks,
        },
    )?;

    println!("Reports generated in {}", sink.dir().display());
    println!(
        "- Weeks: {} processed, {} saved",
        outcome.weeks_processed,
        outcome.weekly_files.len()
    );
    println!("- Issues: {}", outcome.statistics.total);
    println!("- Weekly summary: {}", outcome.rollup_path.display());
    println!("- Yearly summary: {}", outcome.summary_path.display());
    println!("- Statistics: {}", outcome.statistics_path.display());

    Ok(())
}

fn parse_optional_date(input: Option<String>, timezone: Tz) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2024-03-18"))
        })
        .transpose()?
        .map_or_else(|| Ok(today_in(timezone)), Ok)
}

fn load_or_default_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        Config::load(config_path)
    } else {
        Ok(Config::default())
    }
}
