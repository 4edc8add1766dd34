use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use url::Url;

use super::{endpoint, get_json, with_trailing_slash, FetchError, IssueSource};
use crate::model::issue::{Author, Issue, IssueDate, ValidationError};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedmineAuth {
    ApiKey(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

pub struct RedmineSource {
    name: String,
    base: Url,
    uid_suffix: String,
    auth: RedmineAuth,
    client: reqwest::Client,
}

impl RedmineSource {
    pub fn new(url: Url, auth: RedmineAuth) -> Self {
        let base = with_trailing_slash(url);
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let path = base.path().trim_end_matches('/').to_string();

        Self {
            name: format!("Redmine ({host}{path})"),
            uid_suffix: format!("{path}@{host}"),
            base,
            auth,
            client: reqwest::Client::new(),
        }
    }

    /// Ids are namespaced with the tracker's path and host so several
    /// Redmine instances never hand out the same uid.
    fn make_uid(&self, issue_id: u64) -> String {
        format!("{issue_id}-{}", self.uid_suffix)
    }

    fn get(&self, url: &Url) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url.clone())
            .header("Accept", "application/json");
        match &self.auth {
            RedmineAuth::ApiKey(key) => request.header("X-Redmine-API-Key", key),
            RedmineAuth::Basic { username, password } => {
                request.basic_auth(username, password.as_ref())
            }
        }
    }

    async fn fetch_page(&self, offset: usize) -> Result<IssuesPage, FetchError> {
        let url = endpoint(&self.name, &self.base, "issues.json")?;
        let request = self
            .get(&url)
            .query(&[("assigned_to_id", "me"), ("status_id", "open")])
            .query(&[("offset", offset), ("limit", PAGE_SIZE)]);
        get_json(&self.name, request, &url).await
    }

    /// The issue list only carries an `{id, name}` stub for the author, so the
    /// profile is looked up separately.
    async fn author_url(&self, author_id: u64) -> Result<String, FetchError> {
        let url = endpoint(&self.name, &self.base, &format!("users/{author_id}.json"))?;
        let envelope: UserEnvelope = get_json(&self.name, self.get(&url), &url).await?;
        Ok(format!("{}users/{}", self.base, envelope.user.id))
    }

    fn map_issue(&self, raw: RmIssue, author: Option<Author>) -> Result<Issue, ValidationError> {
        Issue::builder()
            .uid(self.make_uid(raw.id))
            .title(raw.subject)
            .description(raw.description)
            .project(raw.project.and_then(|p| p.name))
            .url(format!("{}issues/{}", self.base, raw.id))
            .created(raw.created_on)
            .updated(raw.updated_on)
            .author(author)
            .percent_done(raw.done_ratio)
            .start(raw.start_date.map(IssueDate::Date))
            .due(raw.due_date.map(IssueDate::Date))
            .build()
    }
}

#[derive(Deserialize)]
struct IssuesPage {
    issues: Vec<RmIssue>,
    total_count: Option<usize>,
}

#[derive(Deserialize)]
struct RmIssue {
    id: u64,
    subject: Option<String>,
    description: Option<String>,
    project: Option<NamedRef>,
    author: Option<NamedRef>,
    #[serde(default)]
    done_ratio: Option<u8>,
    // Both dates disappear from the payload when the tracker disables them.
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    created_on: Option<DateTime<Utc>>,
    updated_on: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct NamedRef {
    id: u64,
    name: Option<String>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct User {
    id: u64,
}

#[async_trait]
impl IssueSource for RedmineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn issues(&self) -> Result<Vec<Issue>, FetchError> {
        let mut raw_issues: Vec<RmIssue> = Vec::new();
        loop {
            let page = self.fetch_page(raw_issues.len()).await?;
            let received = page.issues.len();
            raw_issues.extend(page.issues);

            let done = match page.total_count {
                Some(total) => raw_issues.len() >= total,
                None => received < PAGE_SIZE,
            };
            if received == 0 || done {
                break;
            }
        }

        let mut author_urls: HashMap<u64, String> = HashMap::new();
        let mut issues = Vec::with_capacity(raw_issues.len());
        for raw in raw_issues {
            let author = match &raw.author {
                Some(stub) => {
                    let url = match author_urls.get(&stub.id) {
                        Some(url) => url.clone(),
                        None => {
                            let url = self.author_url(stub.id).await?;
                            author_urls.insert(stub.id, url.clone());
                            url
                        }
                    };
                    Some(match &stub.name {
                        Some(name) => Author::new(name.clone(), url),
                        None => Author::unnamed(url),
                    })
                }
                None => None,
            };

            let issue = self
                .map_issue(raw, author)
                .map_err(|source| FetchError::Invalid {
                    backend: self.name.clone(),
                    source,
                })?;
            issues.push(issue);
        }

        Ok(issues)
    }
}
