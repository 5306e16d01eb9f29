pub mod client;

use crate::error::SourceError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::RedmineClient;

/// `{ "id": 3, "name": "Platform" }` as Redmine embeds it in issue payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub author: Option<NamedRef>,
    #[serde(default, rename = "assigned_to")]
    pub assignee: Option<NamedRef>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    UpdatedOn,
    CreatedOn,
}

impl DateField {
    fn param(self) -> &'static str {
        match self {
            Self::UpdatedOn => "updated_on",
            Self::CreatedOn => "created_on",
        }
    }
}

/// One filtered issue listing. Status is always the `*` wildcard so closed
/// issues are included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub date_field: DateField,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub author_id: Option<u64>,
    pub assignee_id: Option<u64>,
}

impl IssueQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let range = format!(
            "><{}|{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        );

        [
            Some((self.date_field.param(), range)),
            Some(("status_id", "*".to_string())),
            self.author_id.map(|id| ("author_id", id.to_string())),
            self.assignee_id.map(|id| ("assigned_to_id", id.to_string())),
            Some(("sort", "id".to_string())),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub trait IssueSource {
    fn issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, SourceError>;
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    ApiKey(String),
}

impl Credentials {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "username/password",
            Self::ApiKey(_) => "api key",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***hidden***")
                .finish(),
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"***hidden***").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Credentials, DateField, Issue, IssueQuery};
    use chrono::NaiveDate;

    #[test]
    fn query_params_carry_range_wildcard_and_facet() {
        let query = IssueQuery {
            date_field: DateField::UpdatedOn,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            end: NaiveDate::from_ymd_opt(2024, 1, 7).expect("date"),
            author_id: Some(5),
            assignee_id: None,
        };

        assert_eq!(
            query.params(),
            vec![
                ("updated_on", "><2024-01-01|2024-01-07".to_string()),
                ("status_id", "*".to_string()),
                ("author_id", "5".to_string()),
                ("sort", "id".to_string()),
            ]
        );
    }

    #[test]
    fn decodes_issue_with_missing_project_and_assignee() {
        let issue: Issue = serde_json::from_str(
            r#"{
                "id": 12,
                "subject": "Fix login",
                "status": {"id": 5, "name": "Closed"},
                "author": {"id": 3, "name": "Dana"},
                "updated_on": "2024-02-03T04:05:06Z",
                "created_on": "2024-01-30T00:00:00Z"
            }"#,
        )
        .expect("issue decoded");

        assert_eq!(issue.id, 12);
        assert!(issue.project.is_none());
        assert!(issue.assignee.is_none());
        assert_eq!(
            issue.status.and_then(|status| status.name).as_deref(),
            Some("Closed")
        );
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let basic = Credentials::Basic {
            username: "dana".to_string(),
            password: "hunter2".to_string(),
        };
        let key = Credentials::ApiKey("abcdef".to_string());

        assert!(!format!("{basic:?}").contains("hunter2"));
        assert!(!format!("{key:?}").contains("abcdef"));
        assert_eq!(key.mode(), "api key");
    }
}
