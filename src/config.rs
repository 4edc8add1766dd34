use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::sources::github::DEFAULT_API_URL;
use crate::sources::redmine::RedmineAuth;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub redmine: Vec<RedmineConfig>,
    pub github: Option<GithubConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineConfig {
    pub url: Url,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RedmineConfig {
    /// API key wins over username/password when both are configured.
    pub fn auth(&self) -> Option<RedmineAuth> {
        if let Some(key) = &self.api_key {
            return Some(RedmineAuth::ApiKey(key.clone()));
        }
        self.username.as_ref().map(|username| RedmineAuth::Basic {
            username: username.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: Option<String>,
    /// Defaults to the public API; set for GitHub Enterprise.
    pub api_url: Option<Url>,
}

impl GithubConfig {
    pub fn api_url(&self) -> Result<Url> {
        match &self.api_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_API_URL).context("Invalid default GitHub API URL"),
        }
    }
}

impl AppConfig {
    /// Fill in credentials the file leaves out from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for redmine in &mut self.redmine {
            if redmine.api_key.is_none() && redmine.username.is_none() {
                redmine.api_key = lookup("REDMINE_API_KEY");
            }
        }
        if let Some(github) = &mut self.github {
            if github.token.is_none() {
                github.token = lookup("GITHUB_TOKEN");
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("issuemapper")
        .join("config.toml")
}

/// Load the configuration file. An explicitly requested file must exist; the
/// default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let default_path = default_config_path();
    let path = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            path
        }
        None if !default_path.exists() => {
            let mut config = AppConfig::default();
            config.apply_env(|key| std::env::var(key).ok());
            return Ok(config);
        }
        None => default_path.as_path(),
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let mut config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn parse(toml_src: &str) -> AppConfig {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn parses_full_config() {
        let config = parse(
            r#"
            [[redmine]]
            url = "https://redmine.example.org/"
            api_key = "abc"

            [[redmine]]
            url = "https://example.com/tracker"
            username = "me"
            password = "hunter2"

            [github]
            token = "ghp_123"
            "#,
        );

        assert_eq!(config.redmine.len(), 2);
        assert_eq!(
            config.redmine[0].auth(),
            Some(RedmineAuth::ApiKey("abc".into()))
        );
        assert_eq!(
            config.redmine[1].auth(),
            Some(RedmineAuth::Basic {
                username: "me".into(),
                password: Some("hunter2".into()),
            })
        );
        let github = config.github.unwrap();
        assert_eq!(github.token.as_deref(), Some("ghp_123"));
        assert!(github.api_url.is_none());
        assert_eq!(github.api_url().unwrap().as_str(), "https://api.github.com/");
    }

    #[test]
    fn empty_config_has_no_sources() {
        let config = parse("");
        assert!(config.redmine.is_empty());
        assert!(config.github.is_none());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
            [[redmine]]
            url = "not a url"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_fills_missing_credentials_only() {
        let mut config = parse(
            r#"
            [[redmine]]
            url = "https://a.example.org/"

            [[redmine]]
            url = "https://b.example.org/"
            api_key = "from-file"

            [github]
            "#,
        );
        let env: HashMap<&str, &str> =
            HashMap::from([("REDMINE_API_KEY", "from-env"), ("GITHUB_TOKEN", "ghp_env")]);
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.redmine[0].api_key.as_deref(), Some("from-env"));
        assert_eq!(config.redmine[1].api_key.as_deref(), Some("from-file"));
        assert_eq!(
            config.github.unwrap().token.as_deref(),
            Some("ghp_env")
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[redmine]]\nurl = \"https://redmine.example.org/\"\napi_key = \"abc\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.redmine.len(), 1);
        assert_eq!(config.redmine[0].url.host_str(), Some("redmine.example.org"));
    }

    #[test]
    fn load_fails_on_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[github\ntoken = 1").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
