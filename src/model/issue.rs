use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Returned when an [`Issue`] is built without one of its required fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("issue is missing required field `{field}`")]
pub struct ValidationError {
    pub field: &'static str,
}

/// The person who opened an issue, as shown by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: Option<String>,
    pub url: String,
}

impl Author {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
        }
    }

    /// An author the tracker reports without a display name.
    pub fn unnamed(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
        }
    }
}

/// Start and due values come as plain dates from Redmine and as timestamps
/// from GitHub milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueDate {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl From<NaiveDate> for IssueDate {
    fn from(date: NaiveDate) -> Self {
        IssueDate::Date(date)
    }
}

impl From<DateTime<Utc>> for IssueDate {
    fn from(at: DateTime<Utc>) -> Self {
        IssueDate::DateTime(at)
    }
}

impl fmt::Display for IssueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            IssueDate::DateTime(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

/// A tracker issue normalized into the shape every sink understands.
///
/// Only constructible through [`IssueBuilder::build`], so the required fields
/// are always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    uid: String,
    title: String,
    description: String,
    project: String,
    url: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    author: Option<Author>,
    percent_done: Option<u8>,
    start: Option<IssueDate>,
    due: Option<IssueDate>,
}

impl Issue {
    pub fn builder() -> IssueBuilder {
        IssueBuilder::default()
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn percent_done(&self) -> Option<u8> {
        self.percent_done
    }

    pub fn start(&self) -> Option<IssueDate> {
        self.start
    }

    pub fn due(&self) -> Option<IssueDate> {
        self.due
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Issue[uid={}, title={}, project={}, due=",
            self.uid, self.title, self.project
        )?;
        match &self.due {
            Some(due) => write!(f, "{due}]"),
            None => write!(f, "none]"),
        }
    }
}

/// Collects raw, possibly absent values decoded from a backend record.
///
/// Required fields take `Option`s so adapters can hand over whatever the
/// backend returned; [`build`](Self::build) rejects the gaps.
#[derive(Debug, Default, Clone)]
pub struct IssueBuilder {
    uid: Option<String>,
    title: Option<String>,
    description: Option<String>,
    project: Option<String>,
    url: Option<String>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    author: Option<Author>,
    percent_done: Option<u8>,
    start: Option<IssueDate>,
    due: Option<IssueDate>,
}

impl IssueBuilder {
    pub fn uid(mut self, uid: impl Into<Option<String>>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn title(mut self, title: impl Into<Option<String>>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<Option<String>>) -> Self {
        self.description = description.into();
        self
    }

    pub fn project(mut self, project: impl Into<Option<String>>) -> Self {
        self.project = project.into();
        self
    }

    pub fn url(mut self, url: impl Into<Option<String>>) -> Self {
        self.url = url.into();
        self
    }

    pub fn created(mut self, created: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.created = created.into();
        self
    }

    pub fn updated(mut self, updated: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.updated = updated.into();
        self
    }

    pub fn author(mut self, author: impl Into<Option<Author>>) -> Self {
        self.author = author.into();
        self
    }

    pub fn percent_done(mut self, percent_done: impl Into<Option<u8>>) -> Self {
        self.percent_done = percent_done.into();
        self
    }

    pub fn start(mut self, start: impl Into<Option<IssueDate>>) -> Self {
        self.start = start.into();
        self
    }

    pub fn due(mut self, due: impl Into<Option<IssueDate>>) -> Self {
        self.due = due.into();
        self
    }

    pub fn build(self) -> Result<Issue, ValidationError> {
        Ok(Issue {
            uid: required(self.uid, "uid")?,
            title: required(self.title, "title")?,
            description: required(self.description, "description")?,
            project: required(self.project, "project")?,
            url: required(self.url, "url")?,
            created: required(self.created, "created")?,
            updated: required(self.updated, "updated")?,
            author: self.author,
            percent_done: self.percent_done,
            start: self.start,
            due: self.due,
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
    }

    fn complete() -> IssueBuilder {
        Issue::builder()
            .uid("7-@redmine.example.org".to_string())
            .title("Fix login".to_string())
            .description("SSO is broken".to_string())
            .project("Website".to_string())
            .url("https://redmine.example.org/issues/7".to_string())
            .created(ts(1))
            .updated(ts(2))
    }

    #[test]
    fn build_with_required_fields_only() {
        let issue = complete().build().unwrap();
        assert_eq!(issue.uid(), "7-@redmine.example.org");
        assert_eq!(issue.title(), "Fix login");
        assert_eq!(issue.description(), "SSO is broken");
        assert_eq!(issue.project(), "Website");
        assert_eq!(issue.url(), "https://redmine.example.org/issues/7");
        assert_eq!(issue.created(), ts(1));
        assert_eq!(issue.updated(), ts(2));
        assert_eq!(issue.author(), None);
        assert_eq!(issue.percent_done(), None);
        assert_eq!(issue.start(), None);
        assert_eq!(issue.due(), None);
    }

    #[test]
    fn optional_fields_round_trip() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let issue = complete()
            .author(Author::new("Jane Doe", "https://redmine.example.org/users/3"))
            .percent_done(40u8)
            .start(IssueDate::from(start))
            .due(IssueDate::from(ts(20)))
            .build()
            .unwrap();

        let author = issue.author().unwrap();
        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
        assert_eq!(author.url, "https://redmine.example.org/users/3");
        assert_eq!(issue.percent_done(), Some(40));
        assert_eq!(issue.start(), Some(IssueDate::Date(start)));
        assert_eq!(issue.due(), Some(IssueDate::DateTime(ts(20))));
    }

    #[test]
    fn start_is_kept_apart_from_due() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let issue = complete().start(IssueDate::from(start)).build().unwrap();
        assert_eq!(issue.start(), Some(IssueDate::Date(start)));
        assert_eq!(issue.due(), None);
    }

    #[test]
    fn each_missing_required_field_is_named() {
        let cases: Vec<(&str, IssueBuilder)> = vec![
            ("uid", complete().uid(None::<String>)),
            ("title", complete().title(None::<String>)),
            ("description", complete().description(None::<String>)),
            ("project", complete().project(None::<String>)),
            ("url", complete().url(None::<String>)),
            ("created", complete().created(None::<DateTime<Utc>>)),
            ("updated", complete().updated(None::<DateTime<Utc>>)),
        ];

        for (field, builder) in cases {
            let err = builder.build().unwrap_err();
            assert_eq!(err.field, field);
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn empty_strings_are_not_missing() {
        let issue = complete().description(String::new()).build().unwrap();
        assert_eq!(issue.description(), "");
    }

    #[test]
    fn display_summary() {
        let due = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let issue = complete().due(IssueDate::from(due)).build().unwrap();
        assert_eq!(
            issue.to_string(),
            "Issue[uid=7-@redmine.example.org, title=Fix login, project=Website, due=2024-04-01]"
        );

        let issue = complete().build().unwrap();
        assert!(issue.to_string().ends_with("due=none]"));
    }
}
