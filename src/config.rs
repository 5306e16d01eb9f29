use crate::error::{AuthError, ConfigError};
use crate::redmine::Credentials;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

const APP_DIR: &str = ".redmine-report";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
const API_KEY_ENV: &str = "REDMINE_API_KEY";
const MIN_TIMEOUT_SECONDS: u64 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub redmine_url: String,
    pub redmine_username: Option<String>,
    pub redmine_password: Option<String>,
    pub redmine_api_key: Option<String>,
    pub redmine_user_id: Option<u64>,
    pub redmine_timeout_seconds: u64,
    pub redmine_page_size: u32,
    pub report_year: Option<i32>,
    pub report_timezone: String,
    pub report_dir: PathBuf,
    pub report_include_empty_weeks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redmine_url: String::new(),
            redmine_username: None,
            redmine_password: None,
            redmine_api_key: None,
            redmine_user_id: None,
            redmine_timeout_seconds: 30,
            redmine_page_size: MAX_PAGE_SIZE,
            report_year: None,
            report_timezone: DEFAULT_TIMEZONE.to_string(),
            report_dir: PathBuf::from("."),
            report_include_empty_weeks: false,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        set_mode_600(path)?;

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.redmine_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingKey("redmine.url"));
        }

        Url::parse(raw).map_err(|error| ConfigError::InvalidValue {
            key: "redmine.url".to_string(),
            reason: error.to_string(),
        })
    }

    /// Base URL as it appears in issue links, without a trailing slash.
    pub fn link_base(&self) -> String {
        self.redmine_url.trim().trim_end_matches('/').to_string()
    }

    pub fn user_id(&self) -> Result<u64, ConfigError> {
        self.redmine_user_id
            .ok_or(ConfigError::MissingKey("redmine.user_id"))
    }

    pub fn year(&self, override_year: Option<i32>) -> Result<i32, ConfigError> {
        override_year
            .or(self.report_year)
            .ok_or(ConfigError::MissingKey("report.year"))
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.report_timezone
            .trim()
            .parse::<Tz>()
            .map_err(|error| ConfigError::InvalidValue {
                key: "report.timezone".to_string(),
                reason: error.to_string(),
            })
    }

    pub fn credentials(&self) -> Result<Credentials, AuthError> {
        let username = non_blank(self.redmine_username.as_deref());
        let password = non_blank(self.redmine_password.as_deref());
        let api_key = self.resolve_api_key();

        match (username, password, api_key) {
            (Some(username), Some(password), api_key) => {
                if api_key.is_some() {
                    warn!("both username/password and API key configured; using username/password");
                }
                Ok(Credentials::Basic { username, password })
            }
            (_, _, Some(key)) => Ok(Credentials::ApiKey(key)),
            _ => Err(AuthError::MissingCredentials),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_ok()
    }

    fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .and_then(|value| non_blank(Some(value.as_str())))
            .or_else(|| non_blank(self.redmine_api_key.as_deref()))
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let normalized = normalize_config_key(key);
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        match normalized {
            "redmine_url" => {
                let trimmed = value.trim().trim_end_matches('/');
                Url::parse(trimmed).map_err(|error| invalid(&error.to_string()))?;
                self.redmine_url = trimmed.to_string();
            }
            "redmine_username" => self.redmine_username = non_blank(Some(value)),
            "redmine_password" => self.redmine_password = non_blank(Some(value)),
            "redmine_api_key" => self.redmine_api_key = non_blank(Some(value)),
            "redmine_user_id" => {
                self.redmine_user_id = Some(
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| invalid("must be a positive number"))?,
                );
            }
            "redmine_timeout_seconds" => {
                self.redmine_timeout_seconds = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid("must be a number"))?
                    .max(MIN_TIMEOUT_SECONDS);
            }
            "redmine_page_size" => {
                let parsed = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid("must be a number"))?;
                if !(1..=MAX_PAGE_SIZE).contains(&parsed) {
                    return Err(invalid("must be between 1 and 100"));
                }
                self.redmine_page_size = parsed;
            }
            "report_year" => {
                self.report_year = Some(
                    value
                        .trim()
                        .parse::<i32>()
                        .map_err(|_| invalid("must be a year such as 2024"))?,
                );
            }
            "report_timezone" => {
                value
                    .trim()
                    .parse::<Tz>()
                    .map_err(|_| invalid("must be an IANA timezone such as Asia/Shanghai"))?;
                self.report_timezone = value.trim().to_string();
            }
            "report_dir" => self.report_dir = expand_home(value.trim()),
            "report_include_empty_weeks" => {
                self.report_include_empty_weeks = value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| invalid("must be true/false"))?;
            }
            _ => return Err(ConfigError::UnsupportedKey(key.to_string())),
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        let mask = |value: &Option<String>| {
            value
                .as_ref()
                .map(|_| "***set***".to_string())
                .unwrap_or_else(|| "not_set".to_string())
        };

        match normalize_config_key(key) {
            "redmine_url" => Some(self.redmine_url.clone()),
            "redmine_username" => Some(
                self.redmine_username
                    .clone()
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "redmine_password" => Some(mask(&self.redmine_password)),
            "redmine_api_key" => Some(mask(&self.redmine_api_key)),
            "redmine_user_id" => Some(
                self.redmine_user_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "redmine_timeout_seconds" => Some(self.redmine_timeout_seconds.to_string()),
            "redmine_page_size" => Some(self.redmine_page_size.to_string()),
            "report_year" => Some(
                self.report_year
                    .map(|year| year.to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "report_timezone" => Some(self.report_timezone.clone()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "report_include_empty_weeks" => Some(self.report_include_empty_weeks.to_string()),
            _ => None,
        }
    }
}

pub fn is_secret_key(key: &str) -> bool {
    matches!(
        normalize_config_key(key),
        "redmine_password" | "redmine_api_key"
    )
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "redmine_url" | "redmine.url" => "redmine_url",
        "redmine_username" | "redmine.username" => "redmine_username",
        "redmine_password" | "redmine.password" => "redmine_password",
        "redmine_api_key" | "redmine.api_key" => "redmine_api_key",
        "redmine_user_id" | "redmine.user_id" => "redmine_user_id",
        "redmine_timeout_seconds" | "redmine.timeout_seconds" => "redmine_timeout_seconds",
        "redmine_page_size" | "redmine.page_size" => "redmine_page_size",
        "report_year" | "report.year" => "report_year",
        "report_timezone" | "report.timezone" => "report_timezone",
        "report_dir" | "report.dir" => "report_dir",
        "report_include_empty_weeks" | "report.include_empty_weeks" => {
            "report_include_empty_weeks"
        }
        _ => key,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
