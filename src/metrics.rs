//! Per-locale, per-release statistics.
//!
//! For one locale and one release window this module finds the merged
//! localization PRs, sums their document changes under the locale's content
//! tree, and measures translation coverage at the release tag. Failures in
//! any of those steps are contained here: the step contributes a neutral
//! value and is reported in [`LocaleMonth::failures`].

use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::github::{FetchError, GithubClient, PullFile, TreeEntry};
use crate::pagination::{PageError, Paginator};
use crate::release::ReleaseWindow;

/// Document changes contributed by one or more PRs to a locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrStats {
    pub lines_added: u64,
    pub pages_added: u64,
    pub files_updated: u64,
}

impl PrStats {
    /// Tally the document files of `lang` in a PR's file list.
    ///
    /// Only `added` and `modified` files count. Additions are counted without
    /// netting deletions.
    pub fn from_files(config: &Config, lang: &str, files: &[PullFile]) -> Self {
        let prefix = config.locale_prefix(lang);

        files
            .iter()
            .filter(|f| f.filename.starts_with(&prefix) && config.is_document(&f.filename))
            .fold(Self::default(), |mut stats, file| {
                match file.status.as_str() {
                    "added" => {
                        stats.lines_added += file.additions;
                        stats.pages_added += 1;
                    }
                    "modified" => {
                        stats.lines_added += file.additions;
                        stats.files_updated += 1;
                    }
                    _ => {}
                }
                stats
            })
    }
}

impl AddAssign for PrStats {
    fn add_assign(&mut self, other: Self) {
        self.lines_added += other.lines_added;
        self.pages_added += other.pages_added;
        self.files_updated += other.files_updated;
    }
}

/// Share of reference-locale documents that exist in a locale at one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub lang: String,
    pub percentage: f64,
    pub lang_files: usize,
    pub en_files: usize,
}

impl Coverage {
    pub fn new(lang: &str, lang_files: usize, en_files: usize) -> Self {
        let percentage = if en_files > 0 {
            round_one_decimal(lang_files as f64 / en_files as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            lang: lang.to_string(),
            percentage,
            lang_files,
            en_files,
        }
    }

    pub fn empty(lang: &str) -> Self {
        Self::new(lang, 0, 0)
    }

    pub fn from_tree(config: &Config, lang: &str, entries: &[TreeEntry]) -> Self {
        let count_under = |prefix: &str| {
            entries
                .iter()
                .filter(|e| e.path.starts_with(prefix) && config.is_document(&e.path))
                .count()
        };

        let en_files = count_under(&config.locale_prefix(&config.reference_locale));
        let lang_files = count_under(&config.locale_prefix(lang));

        Self::new(lang, lang_files, en_files)
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One persisted row of the release-metrics flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetric {
    pub lang: String,
    pub month: String,
    pub lines_added: u64,
    pub pages_added: u64,
    pub files_updated: u64,
    pub coverage_pct: f64,
    pub pr_count: usize,
}

/// Which unit of work degraded to a neutral value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedStep {
    PrSearch,
    PullFiles { number: u64 },
    Coverage { tag: String },
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStep::PrSearch => write!(f, "PR search"),
            FailedStep::PullFiles { number } => write!(f, "files of PR #{}", number),
            FailedStep::Coverage { tag } => write!(f, "coverage at {}", tag),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: FailedStep,
    pub reason: String,
}

/// A metric row plus the failures that were absorbed while building it.
#[derive(Debug, Clone)]
pub struct LocaleMonth {
    pub record: MonthlyMetric,
    pub failures: Vec<StepFailure>,
}

/// Search query for PRs of `lang` merged inside `window`.
pub fn merged_pr_query(config: &Config, lang: &str, window: &ReleaseWindow) -> String {
    format!(
        "repo:{} is:pr is:merged label:lang:{} {}",
        config.repo_slug(),
        lang,
        window.merged_qualifier()
    )
}

/// Numbers of the PRs labelled for `lang` and merged during `window`.
pub async fn search_merged_prs(
    client: &GithubClient,
    config: &Config,
    lang: &str,
    window: &ReleaseWindow,
) -> Result<Vec<u64>, PageError> {
    let query = merged_pr_query(config, lang, window);
    let query = query.as_str();

    let items = Paginator::from_config(config)
        .collect(&format!("merged PRs {} {}", lang, window.tag), |page| async move {
            client.search_issues(query, page).await.map(|p| p.items)
        })
        .await?;

    let mut numbers: Vec<u64> = items.into_iter().map(|item| item.number).collect();
    let fetched = numbers.len();
    let mut seen = HashSet::new();
    numbers.retain(|n| seen.insert(*n));
    if numbers.len() < fetched {
        warn!(
            "Dropped {} duplicate PRs for {} in {}",
            fetched - numbers.len(),
            lang,
            window.tag
        );
    }

    Ok(numbers)
}

/// Document statistics of one PR for `lang`.
pub async fn fetch_pr_stats(
    client: &GithubClient,
    config: &Config,
    lang: &str,
    number: u64,
) -> Result<PrStats, PageError> {
    let files = Paginator::from_config(config)
        .collect(&format!("PR #{} files", number), |page| async move {
            client.list_pull_files(number, page).await.map(Some)
        })
        .await?;

    Ok(PrStats::from_files(config, lang, &files))
}

/// Coverage of `lang` in the tree snapshot at `tag`.
pub async fn fetch_coverage(
    client: &GithubClient,
    config: &Config,
    lang: &str,
    tag: &str,
) -> Result<Coverage, FetchError> {
    let tree = client.get_tree(tag).await?;
    if tree.truncated {
        warn!(
            "Tree at {} was truncated by the API; coverage for {} may be undercounted",
            tag, lang
        );
    }

    Ok(Coverage::from_tree(config, lang, &tree.tree))
}

/// Build the metric row of `lang` for `window`.
///
/// Never fails: a failed PR search counts as no PRs, a failed PR file list
/// contributes nothing, and a failed tree fetch yields zero coverage. Each of
/// those is recorded in the returned failures.
pub async fn collect_locale_month(
    client: &GithubClient,
    config: &Config,
    lang: &str,
    window: &ReleaseWindow,
) -> LocaleMonth {
    let mut failures = Vec::new();

    let numbers = match search_merged_prs(client, config, lang, window).await {
        Ok(numbers) => numbers,
        Err(e) => {
            error!(
                "Failed to search PRs for {} ({}..{}): {}",
                lang, window.start, window.end, e
            );
            failures.push(StepFailure {
                step: FailedStep::PrSearch,
                reason: e.to_string(),
            });
            Vec::new()
        }
    };
    info!("    Found {} PRs", numbers.len());

    let mut totals = PrStats::default();
    for &number in &numbers {
        match fetch_pr_stats(client, config, lang, number).await {
            Ok(stats) => totals += stats,
            Err(e) => {
                error!("Failed to get stats for PR #{}: {}", number, e);
                failures.push(StepFailure {
                    step: FailedStep::PullFiles { number },
                    reason: e.to_string(),
                });
            }
        }
    }

    let coverage = match fetch_coverage(client, config, lang, &window.tag).await {
        Ok(coverage) => coverage,
        Err(e) => {
            error!("Failed to get coverage for {} at {}: {}", lang, window.tag, e);
            failures.push(StepFailure {
                step: FailedStep::Coverage {
                    tag: window.tag.clone(),
                },
                reason: e.to_string(),
            });
            Coverage::empty(lang)
        }
    };

    if !numbers.is_empty() {
        info!("    Lines added: {}", totals.lines_added);
        info!("    Pages added: {}", totals.pages_added);
        info!("    Files updated: {}", totals.files_updated);
    }
    info!(
        "    Coverage: {}% ({}/{} files)",
        coverage.percentage, coverage.lang_files, coverage.en_files
    );

    if !failures.is_empty() {
        let steps: Vec<String> = failures.iter().map(|f| f.step.to_string()).collect();
        warn!(
            "    {} step(s) failed for {} in {}, totals are partial: {}",
            failures.len(),
            lang,
            window.month,
            steps.join(", ")
        );
    }

    LocaleMonth {
        record: MonthlyMetric {
            lang: lang.to_string(),
            month: window.month.clone(),
            lines_added: totals.lines_added,
            pages_added: totals.pages_added,
            files_updated: totals.files_updated,
            coverage_pct: coverage.percentage,
            pr_count: numbers.len(),
        },
        failures,
    }
}
