use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use super::{endpoint, get_json, with_trailing_slash, FetchError, IssueSource};
use crate::model::issue::{Author, Issue, IssueDate, ValidationError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: usize = 100;

pub struct GithubSource {
    api_url: Url,
    token: String,
    client: reqwest::Client,
}

impl GithubSource {
    pub fn new(api_url: Url, token: String) -> Self {
        Self {
            api_url: with_trailing_slash(api_url),
            token,
            client: reqwest::Client::new(),
        }
    }

    /// GitHub issue ids are global, so the canonical host is enough of a
    /// namespace.
    pub(crate) fn make_uid(&self, issue_id: u64) -> String {
        format!("{issue_id}@github.com")
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<GhIssue>, FetchError> {
        let url = endpoint(self.name(), &self.api_url, "user/issues")?;
        let request = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "issuemapper")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .query(&[("filter", "assigned"), ("state", "open")])
            .query(&[("per_page", PAGE_SIZE), ("page", page)]);
        get_json(self.name(), request, &url).await
    }

    fn map_issue(&self, raw: GhIssue) -> Result<Issue, ValidationError> {
        let due = raw
            .milestone
            .and_then(|m| m.due_on)
            .map(IssueDate::DateTime);

        Issue::builder()
            .uid(self.make_uid(raw.id))
            .title(raw.title)
            .description(raw.body)
            .project(raw.repository.map(|r| r.name))
            .url(raw.html_url)
            .created(raw.created_at)
            .updated(raw.updated_at)
            .author(raw.user.map(|u| Author::new(u.login, u.html_url)))
            .due(due)
            .build()
    }
}

#[derive(Deserialize)]
struct GhIssue {
    id: u64,
    title: Option<String>,
    body: Option<String>,
    html_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    user: Option<GhUser>,
    milestone: Option<GhMilestone>,
    repository: Option<GhRepo>,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
    html_url: String,
}

#[derive(Deserialize)]
struct GhMilestone {
    due_on: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GhRepo {
    name: String,
}

#[async_trait]
impl IssueSource for GithubSource {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn issues(&self) -> Result<Vec<Issue>, FetchError> {
        let mut raw_issues = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_page(page).await?;
            let received = batch.len();
            raw_issues.extend(batch);
            if received < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        raw_issues
            .into_iter()
            .map(|raw| {
                self.map_issue(raw).map_err(|source| FetchError::Invalid {
                    backend: self.name().to_string(),
                    source,
                })
            })
            .collect()
    }
}
