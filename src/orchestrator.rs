use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Config;
use crate::contributions::{fetch_locale_contributions, Contribution};
use crate::github::GithubClient;
use crate::metrics::{collect_locale_month, MonthlyMetric};
use crate::pagination::Paginator;
use crate::release::{select_releases, ReleaseWindow};

/// Outcome of a release-metrics run.
#[derive(Debug, Clone)]
pub struct MetricsRun {
    pub records: Vec<MonthlyMetric>,
    pub releases: Vec<ReleaseWindow>,
    /// Units of work that degraded to neutral values.
    pub failures: usize,
}

/// Fetch every contribution labelled for the configured locales, one locale
/// at a time. Any failed page aborts the run.
pub async fn run_contributions(client: &GithubClient, config: &Config) -> Result<Vec<Contribution>> {
    info!(
        "Starting fetch for languages: {}",
        config.locales.join(", ")
    );

    let mut merged = Vec::new();
    for lang in &config.locales {
        let contributions = fetch_locale_contributions(client, config, lang)
            .await
            .with_context(|| format!("Failed to fetch contributions for {}", lang))?;
        merged.extend(contributions);
    }

    Ok(merged)
}

/// Monthly release windows of the target year, oldest first.
pub async fn fetch_release_windows(
    client: &GithubClient,
    config: &Config,
) -> Result<Vec<ReleaseWindow>> {
    info!("Fetching releases from GitHub...");

    let releases = Paginator::from_config(config)
        .collect("releases", |page| async move {
            client.list_releases(page).await.map(Some)
        })
        .await
        .inspect_err(|e| error!("Failed to fetch releases: {}", e))
        .context("Failed to fetch releases")?;

    let windows = select_releases(releases.iter().map(|r| r.tag_name.as_str()), &config.year);
    info!("✓ Found {} monthly releases", windows.len());

    Ok(windows)
}

/// Collect one metric row per (release, locale), releases oldest first and
/// locales in configured order.
///
/// Fails only when the release listing cannot be fetched or has no monthly
/// release for the target year; everything below that degrades per unit.
pub async fn run_release_metrics(client: &GithubClient, config: &Config) -> Result<MetricsRun> {
    info!(
        "Fetching release metrics for languages: {}",
        config.locales.join(", ")
    );
    info!("Filtering releases for year: {}", config.year);

    let releases = fetch_release_windows(client, config).await?;
    if releases.is_empty() {
        anyhow::bail!(
            "No monthly releases (YYYY.MM) found for year {}",
            config.year
        );
    }

    let mut records = Vec::with_capacity(releases.len() * config.locales.len());
    let mut failures = 0;

    for window in &releases {
        info!("--- Processing release {} ---", window.tag);
        info!("Date range: {} to {}", window.start, window.end);

        for lang in &config.locales {
            info!("  Language: {}", lang);
            let result = collect_locale_month(client, config, lang, window).await;
            failures += result.failures.len();
            records.push(result.record);
        }
    }

    Ok(MetricsRun {
        records,
        releases,
        failures,
    })
}
