use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}\n  hint: run `redmine-report onboard` first", .0.display())]
    MissingFile(PathBuf),

    #[error("missing required config key: {0}\n  hint: run `redmine-report config set {0} <VALUE>`")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error(
        "unsupported config key: {0}\n  hint: supported keys are redmine.url, redmine.username, redmine.password, redmine.api_key, redmine.user_id, redmine.timeout_seconds, redmine.page_size, report.year, report.timezone, report.dir, report.include_empty_weeks"
    )]
    UnsupportedKey(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "no Redmine credentials configured\n  hint: set redmine.username and redmine.password, or redmine.api_key"
    )]
    MissingCredentials,
}

/// A single failed call against the issue tracker.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("issue tracker returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}
