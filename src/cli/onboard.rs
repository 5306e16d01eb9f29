use crate::calendar::today_in;
use crate::config::{Config, expand_home};
use anyhow::{Context, Result};
use chrono::Datelike;
use chrono_tz::Tz;
use dialoguer::{Input, Password, Select, theme::ColorfulTheme};
use std::path::Path;
use url::Url;

pub fn run_onboarding(config_path: &Path) -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to redmine-report onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();

    println!("\n[1/5] Redmine server");
    let redmine_url: String = Input::with_theme(&theme)
        .with_prompt("  Redmine base URL")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            Url::parse(input.trim())
                .map(|_| ())
                .map_err(|_| "Enter a full URL (example: https://redmine.example.com)")
        })
        .interact_text()
        .context("Failed to read Redmine URL")?;

    println!("\n[2/5] Authentication");
    let modes = ["API key", "Username and password"];
    let selected = Select::with_theme(&theme)
        .with_prompt("  How should requests authenticate?")
        .default(0)
        .items(&modes)
        .interact()
        .context("Failed to select authentication mode")?;

    let (redmine_username, redmine_password, redmine_api_key) = if selected == 0 {
        let key = Password::with_theme(&theme)
            .with_prompt("  API key (My account > API access key)")
            .interact()
            .context("Failed to read API key")?;
        (None, None, Some(key))
    } else {
        let username: String = Input::with_theme(&theme)
            .with_prompt("  Username")
            .interact_text()
            .context("Failed to read username")?;
        let password = Password::with_theme(&theme)
            .with_prompt("  Password")
            .interact()
            .context("Failed to read password")?;
        (Some(username), Some(password), None)
    };
    println!("  ✓ Using {}", modes[selected].to_lowercase());

    println!("\n[3/5] Report target");
    let redmine_user_id: u64 = Input::with_theme(&theme)
        .with_prompt("  Redmine user id to report on")
        .interact_text()
        .context("Failed to read user id")?;

    println!("\n[4/5] Time zone and year");
    let report_timezone: String = Input::with_theme(&theme)
        .with_prompt("  IANA time zone used for week boundaries")
        .default(Config::default().report_timezone)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            input
                .trim()
                .parse::<Tz>()
                .map(|_| ())
                .map_err(|_| "Unknown time zone (example: Asia/Shanghai)")
        })
        .interact_text()
        .context("Failed to read time zone")?;

    let default_year = report_timezone
        .trim()
        .parse::<Tz>()
        .map(today_in)
        .unwrap_or_else(|_| today_in(Tz::UTC))
        .year();
    let report_year: i32 = Input::with_theme(&theme)
        .with_prompt("  Year to report on")
        .default(default_year)
        .interact_text()
        .context("Failed to read report year")?;

    println!("\n[5/5] Report output directory");
    let report_dir_input: String = Input::with_theme(&theme)
        .with_prompt("  Folder where weekly_reports_<YEAR>/ will be created")
        .default(".".to_string())
        .interact_text()
        .context("Failed to read report directory")?;
    let report_dir = expand_home(report_dir_input.trim());
    println!("  ✓ {}", report_dir.display());

    let config = Config {
        redmine_url: redmine_url.trim().trim_end_matches('/').to_string(),
        redmine_username,
        redmine_password,
        redmine_api_key,
        redmine_user_id: Some(redmine_user_id),
        report_year: Some(report_year),
        report_timezone: report_timezone.trim().to_string(),
        report_dir,
        ..Config::default()
    };

    config.save(config_path)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Config saved to {}", config_path.display());
    println!("  Run `redmine-report doctor` to verify the connection.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
