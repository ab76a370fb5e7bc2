//! Cumulative per-locale series for reporting.
//!
//! Reads the JSON written by the fetch binaries and produces CSV files with
//! running totals, one series per locale.

use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::contributions::Contribution;
use crate::metrics::MonthlyMetric;
use crate::output::{read_json, write_text};

pub const CONTRIBUTIONS_CSV: &str = "lang_accumulated.csv";
pub const METRICS_CSV: &str = "release_metrics_accumulated.csv";

/// Running count of a locale's pull requests up to a creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionCount {
    pub lang: String,
    pub date: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedMetric {
    pub metric: MonthlyMetric,
    pub total_lines: u64,
    pub total_pages: u64,
    /// Coverage delta against the locale's previous month (0 for the first).
    pub coverage_change: f64,
}

/// Cumulative PR count per locale, ordered by locale then creation time.
/// Issues are ignored.
pub fn accumulate_contributions(records: &[Contribution]) -> Vec<ContributionCount> {
    let mut per_instant: BTreeMap<(&str, DateTime<Utc>), u64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_pull_request()) {
        *per_instant
            .entry((record.lang.as_str(), record.created_at))
            .or_default() += 1;
    }

    let mut rows = Vec::with_capacity(per_instant.len());
    let mut current: Option<&str> = None;
    let mut running = 0;

    for ((lang, date), count) in per_instant {
        if current != Some(lang) {
            current = Some(lang);
            running = 0;
        }
        running += count;
        rows.push(ContributionCount {
            lang: lang.to_string(),
            date,
            count: running,
        });
    }

    rows
}

/// Running line/page totals and month-over-month coverage change per locale.
pub fn accumulate_metrics(records: &[MonthlyMetric]) -> Vec<AccumulatedMetric> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| (&a.lang, &a.month).cmp(&(&b.lang, &b.month)));

    let mut rows: Vec<AccumulatedMetric> = Vec::with_capacity(sorted.len());
    for metric in sorted {
        let previous = rows.last().filter(|prev| prev.metric.lang == metric.lang);

        let (total_lines, total_pages, coverage_change) = match previous {
            Some(prev) => (
                prev.total_lines + metric.lines_added,
                prev.total_pages + metric.pages_added,
                round_change(metric.coverage_pct - prev.metric.coverage_pct),
            ),
            None => (metric.lines_added, metric.pages_added, 0.0),
        };

        rows.push(AccumulatedMetric {
            metric,
            total_lines,
            total_pages,
            coverage_change,
        });
    }

    rows
}

fn round_change(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    // avoid "-0.0" in the CSV
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn contributions_csv(rows: &[ContributionCount]) -> String {
    let mut csv = String::from("lang,date,count\n");
    for row in rows {
        csv.push_str(&format!(
            "{},{},{}\n",
            row.lang,
            row.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            row.count
        ));
    }
    csv
}

pub fn metrics_csv(rows: &[AccumulatedMetric]) -> String {
    let mut csv = String::from(
        "lang,month,lines_added,pages_added,files_updated,coverage_pct,pr_count,total_lines,total_pages,coverage_change\n",
    );
    for row in rows {
        let m = &row.metric;
        csv.push_str(&format!(
            "{},{},{},{},{},{:.1},{},{},{},{:.1}\n",
            m.lang,
            m.month,
            m.lines_added,
            m.pages_added,
            m.files_updated,
            m.coverage_pct,
            m.pr_count,
            row.total_lines,
            row.total_pages,
            row.coverage_change
        ));
    }
    csv
}

fn sibling(input: &Path, file_name: &str) -> PathBuf {
    input.with_file_name(file_name)
}

/// Convert a contributions JSON file into `lang_accumulated.csv` next to it.
pub fn accumulate_contributions_file(input: &Path) -> Result<PathBuf> {
    if !input.exists() {
        bail!(
            "{} not found. Run the `contributions` binary first",
            input.display()
        );
    }

    let records: Vec<Contribution> = read_json(input)?;
    let rows = accumulate_contributions(&records);
    let output = sibling(input, CONTRIBUTIONS_CSV);
    write_text(&output, &contributions_csv(&rows))?;

    let pr_count = records.iter().filter(|r| r.is_pull_request()).count();
    info!("✓ Converted {} PRs to accumulated CSV", pr_count);
    info!("  Output: {}", output.display());
    info!("  Languages: {}", distinct_langs(rows.iter().map(|r| r.lang.as_str())));

    Ok(output)
}

/// Convert a release-metrics JSON file into
/// `release_metrics_accumulated.csv` next to it. Returns `None` when the
/// input holds no records.
pub fn accumulate_metrics_file(input: &Path) -> Result<Option<PathBuf>> {
    if !input.exists() {
        bail!(
            "{} not found. Run the `lang-metrics` binary first",
            input.display()
        );
    }

    let records: Vec<MonthlyMetric> = read_json(input)?;
    if records.is_empty() {
        warn!("No data found in {}", input.display());
        return Ok(None);
    }

    let rows = accumulate_metrics(&records);
    let output = sibling(input, METRICS_CSV);
    write_text(&output, &metrics_csv(&rows))?;

    let months: Vec<&str> = rows.iter().map(|r| r.metric.month.as_str()).collect();
    info!("✓ Converted {} records to accumulated CSV", rows.len());
    info!("  Output: {}", output.display());
    info!(
        "  Languages: {}",
        distinct_langs(rows.iter().map(|r| r.metric.lang.as_str()))
    );
    if let (Some(first), Some(last)) = (months.iter().min(), months.iter().max()) {
        info!("  Months: {} to {}", first, last);
    }

    Ok(Some(output))
}

fn distinct_langs<'a>(langs: impl Iterator<Item = &'a str>) -> String {
    let mut langs: Vec<&str> = langs.collect();
    langs.sort_unstable();
    langs.dedup();
    langs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::IssueState;
    use crate::output::write_json;
    use tempfile::TempDir;

    fn contribution(lang: &str, number: u64, kind: &str, created_at: &str) -> Contribution {
        Contribution {
            lang: lang.to_string(),
            number,
            title: format!("#{}", number),
            created_at: created_at.parse().unwrap(),
            closed_at: None,
            state: IssueState::Open,
            labels: vec![format!("lang:{}", lang)],
            url: format!("https://github.com/acme/docs/{}/{}", kind, number),
        }
    }

    fn metric(lang: &str, month: &str, lines: u64, pages: u64, coverage: f64) -> MonthlyMetric {
        MonthlyMetric {
            lang: lang.to_string(),
            month: month.to_string(),
            lines_added: lines,
            pages_added: pages,
            files_updated: 0,
            coverage_pct: coverage,
            pr_count: 1,
        }
    }

    // ==================== Contribution Series ====================

    #[test]
    fn test_contributions_accumulate_per_locale() {
        let records = vec![
            contribution("es", 3, "pull", "2025-02-01T00:00:00Z"),
            contribution("ja", 4, "pull", "2025-01-15T00:00:00Z"),
            contribution("es", 1, "pull", "2025-01-01T00:00:00Z"),
            contribution("es", 2, "issues", "2025-01-10T00:00:00Z"),
            contribution("es", 5, "pull", "2025-02-01T00:00:00Z"),
        ];

        let rows = accumulate_contributions(&records);
        let summary: Vec<(&str, u64)> = rows.iter().map(|r| (r.lang.as_str(), r.count)).collect();

        assert_eq!(summary, vec![("es", 1), ("es", 3), ("ja", 1)]);
    }

    #[test]
    fn test_contributions_csv_format() {
        let rows = accumulate_contributions(&[contribution("es", 1, "pull", "2025-01-01T12:30:00Z")]);

        assert_eq!(
            contributions_csv(&rows),
            "lang,date,count\nes,2025-01-01T12:30:00Z,1\n"
        );
    }

    // ==================== Metric Series ====================

    #[test]
    fn test_metrics_running_totals_and_coverage_change() {
        let records = vec![
            metric("es", "2025-02", 5, 0, 81.5),
            metric("ja", "2025-01", 7, 2, 40.0),
            metric("es", "2025-01", 10, 1, 80.0),
        ];

        let rows = accumulate_metrics(&records);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].metric.month, "2025-01");
        assert_eq!((rows[0].total_lines, rows[0].total_pages), (10, 1));
        assert_eq!(rows[0].coverage_change, 0.0);

        assert_eq!(rows[1].metric.month, "2025-02");
        assert_eq!((rows[1].total_lines, rows[1].total_pages), (15, 1));
        assert_eq!(rows[1].coverage_change, 1.5);

        assert_eq!(rows[2].metric.lang, "ja");
        assert_eq!(rows[2].total_lines, 7);
        assert_eq!(rows[2].coverage_change, 0.0);
    }

    #[test]
    fn test_coverage_change_has_no_negative_zero() {
        let rows = accumulate_metrics(&[
            metric("es", "2025-01", 0, 0, 80.04),
            metric("es", "2025-02", 0, 0, 80.0),
        ]);

        assert!(metrics_csv(&rows).ends_with(",0.0\n"));
        assert!(!metrics_csv(&rows).contains("-0.0"));
    }

    #[test]
    fn test_metrics_csv_format() {
        let rows = accumulate_metrics(&[metric("es", "2025-01", 15, 1, 80.0)]);

        let csv = metrics_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("lang,month,lines_added,pages_added,files_updated,coverage_pct,pr_count,total_lines,total_pages,coverage_change")
        );
        assert_eq!(lines.next(), Some("es,2025-01,15,1,0,80.0,1,15,1,0.0"));
    }

    // ==================== File Conversion ====================

    #[test]
    fn test_missing_input_names_fetch_binary() {
        let temp_dir = TempDir::new().unwrap();
        let err = accumulate_metrics_file(&temp_dir.path().join("release_metrics.json")).unwrap_err();

        assert!(err.to_string().contains("lang-metrics"));
    }

    #[test]
    fn test_empty_metrics_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("release_metrics.json");
        write_json::<MonthlyMetric>(&input, &[]).unwrap();

        assert!(accumulate_metrics_file(&input).unwrap().is_none());
        assert!(!temp_dir.path().join(METRICS_CSV).exists());
    }

    #[test]
    fn test_contributions_file_written_next_to_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("lang_contributions.json");
        write_json(&input, &[contribution("es", 1, "pull", "2025-01-01T00:00:00Z")]).unwrap();

        let output = accumulate_contributions_file(&input).unwrap();

        assert_eq!(output, temp_dir.path().join(CONTRIBUTIONS_CSV));
        let csv = std::fs::read_to_string(output).unwrap();
        assert!(csv.contains("es,2025-01-01T00:00:00Z,1"));
    }
}
