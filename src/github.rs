use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::pagination::PageRequest;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("lang-metrics/", env!("CARGO_PKG_VERSION"));

/// Failure of a single GitHub API call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to parse response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

// ==================== Response Types ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// One hit of the issue search endpoint (issues and pull requests alike).
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub html_url: String,
}

/// A search response page. `items` is absent on some error-ish responses,
/// which pagination treats the same as an empty page.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub items: Option<Vec<IssueItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

// ==================== Client ====================

/// Authenticated GitHub client scoped to one repository.
///
/// Every call is a single request: no retries, no throttling. Quota
/// exhaustion is reported through a warning and the response is still used.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    /// Perform one GET against `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        if let Some(reset) = exhausted_quota_reset(response.headers()) {
            warn!("⚠️  Rate limit exceeded. Resets at {}", reset);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|source| FetchError::Decode { url, source })
    }

    /// One page of `GET /search/issues`.
    pub async fn search_issues(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<SearchPage, FetchError> {
        self.get_json(
            "/search/issues",
            &[
                ("q", query.to_string()),
                ("per_page", page.per_page.to_string()),
                ("page", page.page.to_string()),
            ],
        )
        .await
    }

    /// One page of the repository's releases.
    pub async fn list_releases(&self, page: PageRequest) -> Result<Vec<Release>, FetchError> {
        let path = format!("/repos/{}/{}/releases", self.owner, self.repo);
        self.get_json(&path, &page.query()).await
    }

    /// One page of the files changed by a pull request.
    pub async fn list_pull_files(
        &self,
        number: u64,
        page: PageRequest,
    ) -> Result<Vec<PullFile>, FetchError> {
        let path = format!("/repos/{}/{}/pulls/{}/files", self.owner, self.repo, number);
        self.get_json(&path, &page.query()).await
    }

    /// Full recursive tree snapshot at a tag (or any other ref).
    pub async fn get_tree(&self, tree_ref: &str) -> Result<Tree, FetchError> {
        let path = format!("/repos/{}/{}/git/trees/{}", self.owner, self.repo, tree_ref);
        self.get_json(&path, &[("recursive", "1".to_string())]).await
    }
}

/// When the quota header reports exactly zero remaining calls, return the
/// human-readable reset time.
pub fn exhausted_quota_reset(headers: &HeaderMap) -> Option<String> {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())?;
    if remaining.trim() != "0" {
        return None;
    }

    let reset = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|ts| ts.trim().parse::<i64>().ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "an unknown time".to_string());

    Some(reset)
}
