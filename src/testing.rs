use crate::error::SourceError;
use crate::redmine::{DateField, Issue, IssueQuery, IssueSource, NamedRef};
use chrono::{DateTime, Utc};
use std::cell::Cell;

pub fn issue(id: u64, project: Option<&str>, status: Option<&str>, updated_on: &str) -> Issue {
    Issue {
        id,
        subject: format!("Issue {id}"),
        project: project.map(|name| NamedRef {
            id: 1,
            name: Some(name.to_string()),
        }),
        status: status.map(|name| NamedRef {
            id: 1,
            name: Some(name.to_string()),
        }),
        author: None,
        assignee: None,
        updated_on: timestamp(updated_on),
        created_on: None,
    }
}

fn timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

fn person(id: u64) -> Option<NamedRef> {
    Some(NamedRef {
        id,
        name: Some(format!("user-{id}")),
    })
}

pub trait IssueFixture {
    fn authored_by(self, user_id: u64) -> Self;
    fn assigned_to(self, user_id: u64) -> Self;
    fn created(self, created_on: &str) -> Self;
    fn titled(self, subject: &str) -> Self;
}

impl IssueFixture for Issue {
    fn authored_by(mut self, user_id: u64) -> Self {
        self.author = person(user_id);
        self
    }

    fn assigned_to(mut self, user_id: u64) -> Self {
        self.assignee = person(user_id);
        self
    }

    fn created(mut self, created_on: &str) -> Self {
        self.created_on = Some(timestamp(created_on));
        self
    }

    fn titled(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }
}

/// In-memory issue tracker that applies the same filters Redmine would.
pub struct FakeSource {
    issues: Vec<Issue>,
    fail: bool,
    calls: Cell<usize>,
}

impl FakeSource {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            fail: false,
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            issues: Vec::new(),
            fail: true,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl IssueSource for FakeSource {
    fn issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, SourceError> {
        self.calls.set(self.calls.get() + 1);

        if self.fail {
            return Err(SourceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let matches_user = |reference: &Option<NamedRef>, wanted: Option<u64>| {
            wanted.is_none_or(|id| reference.as_ref().is_some_and(|person| person.id == id))
        };

        let mut found = self
            .issues
            .iter()
            .filter(|issue| matches_user(&issue.author, query.author_id))
            .filter(|issue| matches_user(&issue.assignee, query.assignee_id))
            .filter(|issue| {
                let stamp = match query.date_field {
                    DateField::UpdatedOn => Some(issue.updated_on),
                    DateField::CreatedOn => issue.created_on,
                };
                stamp.is_some_and(|stamp| {
                    let date = stamp.date_naive();
                    query.start <= date && date <= query.end
                })
            })
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|issue| issue.id);

        Ok(found)
    }
}
