use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

// Monthly release tags look like `2025.01`
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// The calendar month covered by a `YYYY.MM` release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseWindow {
    pub tag: String,
    /// First day of the month, inclusive.
    pub start: NaiveDate,
    /// Last day of the month, inclusive.
    pub end: NaiveDate,
    /// `YYYY-MM` label used in output records.
    pub month: String,
}

impl ReleaseWindow {
    /// Parse a release tag. Returns `None` unless the tag is exactly
    /// `YYYY.MM` with a month between 01 and 12.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let regex = TAG_REGEX
            .get_or_init(|| Regex::new(r"^(\d{4})\.(\d{2})$").expect("tag pattern is valid"));
        let caps = regex.captures(tag)?;

        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;

        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;

        Some(Self {
            tag: tag.to_string(),
            start,
            end,
            month: format!("{}-{}", &caps[1], &caps[2]),
        })
    }

    /// Year component of the tag.
    pub fn year(&self) -> &str {
        &self.tag[..4]
    }

    /// `merged:` search qualifier covering the whole month.
    pub fn merged_qualifier(&self) -> String {
        format!(
            "merged:{}..{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Keep the monthly release tags of `year`, oldest first.
pub fn select_releases<I, S>(tags: I, year: &str) -> Vec<ReleaseWindow>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut windows: Vec<ReleaseWindow> = tags
        .into_iter()
        .filter_map(|tag| ReleaseWindow::from_tag(tag.as_ref()))
        .filter(|window| window.year() == year)
        .collect();

    windows.sort_by(|a, b| a.tag.cmp(&b.tag));
    windows.dedup_by(|a, b| a.tag == b.tag);
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== Tag Parsing ====================

    #[test]
    fn test_window_for_regular_month() {
        let window = ReleaseWindow::from_tag("2025.10").expect("valid tag");

        assert_eq!(window.start, date(2025, 10, 1));
        assert_eq!(window.end, date(2025, 10, 31));
        assert_eq!(window.month, "2025-10");
        assert_eq!(window.merged_qualifier(), "merged:2025-10-01..2025-10-31");
    }

    #[test]
    fn test_february_end_dates() {
        assert_eq!(
            ReleaseWindow::from_tag("2025.02").unwrap().end,
            date(2025, 2, 28)
        );
        assert_eq!(
            ReleaseWindow::from_tag("2024.02").unwrap().end,
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let window = ReleaseWindow::from_tag("2024.12").unwrap();
        assert_eq!(window.end, date(2024, 12, 31));
    }

    #[test]
    fn test_malformed_tags_rejected() {
        for tag in ["bad-tag", "2025.13x", "2025.13", "2025.00", "v2025.01", "2025.1", "25.01", ""] {
            assert!(ReleaseWindow::from_tag(tag).is_none(), "{} should be rejected", tag);
        }
    }

    // ==================== Release Selection ====================

    #[test]
    fn test_select_filters_year_and_sorts() {
        let tags = ["2025.06", "2024.12", "bad-tag", "2025.01", "2025.13x"];

        let selected: Vec<String> = select_releases(tags, "2025")
            .into_iter()
            .map(|w| w.tag)
            .collect();

        assert_eq!(selected, vec!["2025.01", "2025.06"]);
    }

    #[test]
    fn test_select_with_no_matches() {
        assert!(select_releases(["2023.01", "latest"], "2025").is_empty());
    }

    #[test]
    fn test_select_drops_duplicate_tags() {
        let selected = select_releases(["2025.03", "2025.03"], "2025");
        assert_eq!(selected.len(), 1);
    }

    // ==================== Properties ====================

    proptest! {
        #[test]
        fn prop_end_is_last_day_of_month(year in 1970i32..2200, month in 1u32..=12) {
            let tag = format!("{:04}.{:02}", year, month);
            let window = ReleaseWindow::from_tag(&tag).unwrap();

            prop_assert_eq!(window.start.day(), 1);
            prop_assert_eq!(window.end.month(), month);
            prop_assert!((28..=31).contains(&window.end.day()));
            prop_assert_eq!(window.end.succ_opt().unwrap().day(), 1);
        }
    }
}
