use crate::config::{Config, MAX_PAGE_SIZE};
use crate::error::SourceError;
use crate::redmine::{Credentials, Issue, IssueQuery, IssueSource};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "x-redmine-api-key";

#[derive(Debug, Deserialize)]
struct IssuePage {
    issues: Vec<Issue>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CurrentUserEnvelope {
    user: CurrentUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    #[serde(default)]
    pub login: Option<String>,
}

pub struct RedmineClient {
    base_url: Url,
    http: Client,
    credentials: Credentials,
    page_size: u32,
}

impl RedmineClient {
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Credentials::ApiKey(key) = &credentials {
            headers.insert(
                HeaderName::from_static(API_KEY_HEADER),
                HeaderValue::from_str(key).context("Failed to build API key header")?,
            );
        }

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to create Redmine HTTP client")?;

        Ok(Self {
            base_url,
            http,
            credentials,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let credentials = config.credentials()?;

        Self::new(
            base_url,
            credentials,
            Duration::from_secs(config.redmine_timeout_seconds),
            config.redmine_page_size,
        )
    }

    pub fn current_user(&self) -> Result<CurrentUser, SourceError> {
        let url = self.endpoint("users/current.json")?;
        let envelope: CurrentUserEnvelope = self.get_json(url)?;

        Ok(envelope.user)
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|error| SourceError::Request(error.to_string()))
    }

    fn issues_url(&self, query: &IssueQuery, offset: u64) -> Result<Url, SourceError> {
        let mut url = self.endpoint("issues.json")?;
        url.query_pairs_mut()
            .extend_pairs(query.params())
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::ApiKey(_) => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let response = self.authorize(self.http.get(url)).send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|error| SourceError::Decode(error.to_string()))
    }
}

impl IssueSource for RedmineClient {
    fn issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, SourceError> {
        let mut collected = Vec::new();
        let mut offset = Some(0_u64);

        while let Some(current) = offset {
            let url = self.issues_url(query, current)?;
            let page: IssuePage = self.get_json(url)?;
            let received = page.issues.len() as u64;
            debug!(
                offset = current,
                received,
                total = ?page.total_count,
                "fetched issue page"
            );

            collected.extend(page.issues);
            offset = next_offset(current, received, page.total_count, u64::from(self.page_size));
        }

        Ok(collected)
    }
}

/// Offset of the following page, or `None` once the listing is exhausted.
/// Without a `total_count` a short page marks the end.
fn next_offset(
    offset: u64,
    received: u64,
    total_count: Option<u64>,
    page_size: u64,
) -> Option<u64> {
    if received == 0 {
        return None;
    }

    let next = offset + received;
    let more = match total_count {
        Some(total) => next < total,
        None => received >= page_size,
    };

    more.then_some(next)
}

#[cfg(test)]
mod tests {
    use super::{IssuePage, RedmineClient, next_offset};
    use crate::redmine::{Credentials, DateField, IssueQuery};
    use chrono::NaiveDate;
    use std::time::Duration;
    use url::Url;

    fn client(base: &str) -> RedmineClient {
        RedmineClient::new(
            Url::parse(base).expect("url"),
            Credentials::ApiKey("abc".to_string()),
            Duration::from_secs(5),
            250,
        )
        .expect("client built")
    }

    #[test]
    fn issues_url_keeps_base_path_and_paginates() {
        let client = client("https://example.com/redmine/");
        let query = IssueQuery {
            date_field: DateField::CreatedOn,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).expect("date"),
            author_id: None,
            assignee_id: Some(9),
        };

        let url = client.issues_url(&query, 200).expect("url built");

        assert_eq!(url.path(), "/redmine/issues.json");
        let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();
        assert!(pairs.contains(&("created_on".to_string(), "><2024-01-01|2024-12-31".to_string())));
        assert!(pairs.contains(&("assigned_to_id".to_string(), "9".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "100".to_string())));
        assert!(pairs.contains(&("offset".to_string(), "200".to_string())));
    }

    #[test]
    fn decodes_issue_page() {
        let page: IssuePage = serde_json::from_str(
            r#"{
                "issues": [
                    {"id": 1, "subject": "A", "project": {"id": 1, "name": "Core"},
                     "status": {"id": 1, "name": "New"}, "updated_on": "2024-05-01T08:00:00Z"}
                ],
                "total_count": 1, "offset": 0, "limit": 100
            }"#,
        )
        .expect("page decoded");

        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.total_count, Some(1));
    }

    #[test]
    fn pagination_advances_by_received_until_total() {
        assert_eq!(next_offset(0, 100, Some(250), 100), Some(100));
        assert_eq!(next_offset(100, 100, Some(250), 100), Some(200));
        assert_eq!(next_offset(200, 50, Some(250), 100), None);
        assert_eq!(next_offset(0, 40, Some(40), 100), None);
    }

    #[test]
    fn pagination_stops_on_empty_page() {
        assert_eq!(next_offset(0, 0, Some(0), 100), None);
        assert_eq!(next_offset(100, 0, Some(500), 100), None);
        assert_eq!(next_offset(100, 0, None, 100), None);
    }

    #[test]
    fn pagination_without_total_count_follows_full_pages() {
        assert_eq!(next_offset(0, 100, None, 100), Some(100));
        assert_eq!(next_offset(100, 37, None, 100), None);
    }

    #[test]
    fn page_without_total_count_decodes() {
        let page: IssuePage = serde_json::from_str(r#"{"issues": []}"#).expect("page decoded");

        assert!(page.issues.is_empty());
        assert_eq!(page.total_count, None);
    }
}
