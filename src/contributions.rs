use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::github::{GithubClient, IssueItem, IssueState};
use crate::pagination::{PageError, Paginator};

/// One issue or pull request labelled for a locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub lang: String,
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: IssueState,
    pub labels: Vec<String>,
    pub url: String,
}

impl Contribution {
    pub fn from_item(lang: &str, item: IssueItem) -> Self {
        Self {
            lang: lang.to_string(),
            number: item.number,
            title: item.title,
            created_at: item.created_at,
            closed_at: item.closed_at,
            state: item.state,
            labels: item.labels.into_iter().map(|l| l.name).collect(),
            url: item.html_url,
        }
    }

    pub fn is_pull_request(&self) -> bool {
        self.url.contains("/pull/")
    }
}

/// Search query matching everything labelled `lang:<lang>`.
pub fn label_query(config: &Config, lang: &str) -> String {
    format!("repo:{} label:\"lang:{}\"", config.repo_slug(), lang)
}

/// List every issue and pull request labelled for `lang`, open or closed.
pub async fn fetch_locale_contributions(
    client: &GithubClient,
    config: &Config,
    lang: &str,
) -> Result<Vec<Contribution>, PageError> {
    info!("Fetching data for language: {}", lang);

    let query = label_query(config, lang);
    let query = query.as_str();

    let items = Paginator::from_config(config)
        .collect(&format!("contributions {}", lang), |page| async move {
            let result = client.search_issues(query, page).await.map(|p| p.items);
            if let Ok(Some(items)) = &result {
                if !items.is_empty() {
                    info!("  Page {}: {} items", page.page, items.len());
                }
            }
            result
        })
        .await
        .inspect_err(|e| error!("Failed to fetch data for {} ({})", lang, e))?;

    // Search results can shift between pages; keep the first copy of each item
    let fetched = items.len();
    let mut seen = HashSet::new();
    let contributions: Vec<Contribution> = items
        .into_iter()
        .filter(|item| seen.insert(item.number))
        .map(|item| Contribution::from_item(lang, item))
        .collect();
    if contributions.len() < fetched {
        warn!(
            "Dropped {} duplicate items for {}",
            fetched - contributions.len(),
            lang
        );
    }

    info!("✓ Completed {}: {} total contributions", lang, contributions.len());
    Ok(contributions)
}
