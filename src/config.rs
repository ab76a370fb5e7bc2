use anyhow::{Context, Result};
use chrono::{Datelike, Utc};

/// Locales processed when `LANGS` is not set.
pub const DEFAULT_LOCALES: [&str; 8] = ["bn", "es", "fr", "ja", "pt", "ro", "uk", "zh"];

#[derive(Debug, Clone)]
pub struct Config {
    // GitHub
    pub github_token: String,
    pub api_base_url: String,
    pub owner: String,
    pub repo: String,

    // Selection
    pub locales: Vec<String>,
    pub year: String,

    // Pagination
    pub page_size: u32,
    pub max_pages: u32,

    // Content layout
    pub reference_locale: String,
    pub content_root: String,
    pub doc_extension: String,

    // Output
    pub contributions_output: String,
    pub metrics_output: String,
}

impl Config {
    /// Build a config with every optional setting at its default.
    pub fn new(github_token: impl Into<String>) -> Self {
        Self {
            github_token: github_token.into(),
            api_base_url: "https://api.github.com".to_string(),
            owner: "open-telemetry".to_string(),
            repo: "opentelemetry.io".to_string(),

            locales: DEFAULT_LOCALES.iter().map(|l| l.to_string()).collect(),
            year: Utc::now().year().to_string(),

            page_size: 100,
            max_pages: 100,

            reference_locale: "en".to_string(),
            content_root: "content".to_string(),
            doc_extension: ".md".to_string(),

            contributions_output: "data/lang_contributions.json".to_string(),
            metrics_output: "data/release_metrics.json".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        // The token is checked before anything else so a missing credential
        // never reaches the network.
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .context("GITHUB_TOKEN not set. Please check your .env file")?;

        let mut config = Self::new(token);

        if let Ok(langs) = std::env::var("LANGS") {
            let locales = parse_locales(&langs);
            if !locales.is_empty() {
                config.locales = locales;
            }
        }
        if let Ok(year) = std::env::var("YEAR") {
            let year = year.trim();
            if !year.is_empty() {
                config.year = year.to_string();
            }
        }

        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(owner) = std::env::var("GITHUB_OWNER") {
            config.owner = owner;
        }
        if let Ok(repo) = std::env::var("GITHUB_REPO") {
            config.repo = repo;
        }

        config.page_size = std::env::var("PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(config.page_size);
        config.max_pages = std::env::var("MAX_PAGES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(config.max_pages);

        if let Ok(path) = std::env::var("CONTRIBUTIONS_OUTPUT") {
            config.contributions_output = path;
        }
        if let Ok(path) = std::env::var("METRICS_OUTPUT") {
            config.metrics_output = path;
        }

        Ok(config)
    }

    /// `owner/repo`, as used in search qualifiers.
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Path prefix of one locale's content tree, e.g. `content/es/`.
    pub fn locale_prefix(&self, lang: &str) -> String {
        format!("{}/{}/", self.content_root, lang)
    }

    pub fn is_document(&self, path: &str) -> bool {
        path.ends_with(&self.doc_extension)
    }
}

/// Split a comma-separated locale list, trimming entries and dropping blanks.
pub fn parse_locales(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
