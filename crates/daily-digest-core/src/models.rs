//! Report data models shared by the resolver, synchronizer, CLI, and server.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::channel::Channel;

/// Sentinel rendered for reports whose date cannot be determined.
pub const UNKNOWN_DATE: &str = "unknown";

/// Calendar date of a report, or unknown.
///
/// Orders unknown dates below every known date, so a descending sort puts
/// them last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReportDate(pub Option<NaiveDate>);

impl ReportDate {
    pub const UNKNOWN: ReportDate = ReportDate(None);

    /// Parse an ISO `YYYY-MM-DD` date; anything else is unknown.
    pub fn parse(s: &str) -> Self {
        ReportDate(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }

    /// Date from the leading `YYYY-MM-DD` segment of a file name.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.get(..10) {
            Some(head) => Self::parse(head),
            None => Self::UNKNOWN,
        }
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            None => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl Serialize for ReportDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ReportDate::parse(&s))
    }
}

/// One logical report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Opaque identifier, see [`crate::slug`].
    pub identifier: String,
    pub channel: Channel,
    pub title: String,
    pub date: ReportDate,
    /// Bare basename, round-trips through the identifier codec.
    pub file_name: String,
    pub excerpt: String,
    pub item_count: u64,
    pub theme_count: u64,
    /// ISO-8601 timestamp of the last modification, when known.
    pub updated_at: Option<String>,
}

/// A report summary plus its full Markdown text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub content: String,
}

/// File name without its final extension, used as a fallback title.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Listing order: date descending, then file name descending.
pub fn compare_reports(a: &ReportSummary, b: &ReportSummary) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.file_name.cmp(&a.file_name))
}

/// Sort reports in listing order.
pub fn sort_reports(reports: &mut [ReportSummary]) {
    reports.sort_by(compare_reports);
}
