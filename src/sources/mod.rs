pub mod github;
pub mod redmine;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::cli::SourceKind;
use crate::config::AppConfig;
use crate::model::issue::{Issue, ValidationError};

/// Failure while pulling issues out of one backend.
///
/// Every variant names the backend so a failed run points at the tracker
/// that caused it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{backend}: request to {url} failed")]
    Request {
        backend: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{backend}: {url} answered with {status}")]
    Status {
        backend: String,
        url: String,
        status: StatusCode,
    },
    #[error("{backend}: unexpected response from {url}")]
    Decode {
        backend: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{backend}: cannot build endpoint `{path}`")]
    Url {
        backend: String,
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{backend}: {source}")]
    Invalid {
        backend: String,
        #[source]
        source: ValidationError,
    },
}

#[async_trait]
pub trait IssueSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every open issue relevant to the authenticated user.
    ///
    /// Read-only. A single record that cannot be mapped fails the whole call.
    async fn issues(&self) -> Result<Vec<Issue>, FetchError>;
}


pub fn create_sources(config: &AppConfig, only: &[SourceKind]) -> Result<Vec<Box<dyn IssueSource>>> {
    let wanted = |kind: SourceKind| only.is_empty() || only.contains(&kind);
    let mut sources: Vec<Box<dyn IssueSource>> = Vec::new();

    if wanted(SourceKind::Redmine) {
        if only.contains(&SourceKind::Redmine) && config.redmine.is_empty() {
            bail!("Redmine was requested but no [[redmine]] table is configured");
        }
        for cfg in &config.redmine {
            let Some(auth) = cfg.auth() else {
                bail!(
                    "Redmine at {} has neither api_key nor username configured",
                    cfg.url
                );
            };
            sources.push(Box::new(redmine::RedmineSource::new(cfg.url.clone(), auth)));
        }
    }

    if wanted(SourceKind::Github) {
        match &config.github {
            Some(cfg) => {
                let Some(token) = cfg.token.clone() else {
                    bail!("GitHub is configured without a token (set github.token or GITHUB_TOKEN)");
                };
                sources.push(Box::new(github::GithubSource::new(cfg.api_url()?, token)));
            }
            None if only.contains(&SourceKind::Github) => {
                bail!("GitHub was requested but no [github] table is configured");
            }
            None => {}
        }
    }

    Ok(sources)
}

/// Fetch all sources and concatenate their issues, keeping source order.
pub async fn collect_issues(sources: &[Box<dyn IssueSource>]) -> Result<Vec<Issue>, FetchError> {
    let batches = try_join_all(sources.iter().map(|source| async move {
        let issues = source.issues().await?;
        info!(source = source.name(), count = issues.len(), "fetched issues");
        for issue in &issues {
            debug!(source = source.name(), "{issue}");
        }
        Ok::<_, FetchError>(issues)
    }))
    .await?;

    let issues: Vec<Issue> = batches.into_iter().flatten().collect();
    if issues.is_empty() {
        warn!("no open issues found in any source");
    }
    Ok(issues)
}

/// Make sure relative joins append to the configured path instead of
/// replacing its last segment.
pub(crate) fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub(crate) fn endpoint(backend: &str, base: &Url, path: &str) -> Result<Url, FetchError> {
    base.join(path).map_err(|source| FetchError::Url {
        backend: backend.to_string(),
        path: path.to_string(),
        source,
    })
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    backend: &str,
    request: reqwest::RequestBuilder,
    url: &Url,
) -> Result<T, FetchError> {
    let resp = request.send().await.map_err(|source| FetchError::Request {
        backend: backend.to_string(),
        url: url.to_string(),
        source,
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            backend: backend.to_string(),
            url: url.to_string(),
            status,
        });
    }

    resp.json().await.map_err(|source| FetchError::Decode {
        backend: backend.to_string(),
        url: url.to_string(),
        source,
    })
}
