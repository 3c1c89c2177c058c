//! Markdown metadata extraction.
//!
//! Derives a title, a short plain-text excerpt, and the update/theme counts
//! from a report's text. Counts come from the localized summary phrases the
//! report generator writes (`**12** 条 RSS 更新`, `**4** 个核心主题`).
//!
//! Extraction sits behind [`MetadataExtractor`] so the resolver does not
//! depend on the phrasing; tests and other locales can supply their own.

use once_cell::sync::Lazy;

use regex::Regex;
use serde::Serialize;

/// Maximum excerpt length, in characters.
pub const EXCERPT_MAX_CHARS: usize = 160;

/// Excerpt used when no body line survives filtering.
pub const EMPTY_EXCERPT: &str = "暂无摘要。";

/// Number of body lines joined into the excerpt.
const EXCERPT_LINES: usize = 2;

static ITEM_COUNT_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(\d+)\*\*\s*条\s*(?:RSS\s*)?更新").expect("valid item count pattern")
});
static ITEM_COUNT_PLAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*条\s*(?:RSS\s*)?更新").expect("valid item count pattern")
});
static THEME_COUNT_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(\d+)\*\*\s*个\s*(?:核心)?主题").expect("valid theme count pattern")
});
static THEME_COUNT_PLAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*个\s*(?:核心)?主题").expect("valid theme count pattern")
});

/// Fields derived from a report's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub excerpt: String,
    pub item_count: u64,
    pub theme_count: u64,
}

/// Strategy for deriving [`Metadata`] from document text.
pub trait MetadataExtractor: Send + Sync {
    /// Extract metadata. `fallback_title` is used when the text has no
    /// non-empty line.
    fn extract(&self, text: &str, fallback_title: &str) -> Metadata;
}

/// Extractor for the generated daily reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyReportExtractor;

impl MetadataExtractor for DailyReportExtractor {
    fn extract(&self, text: &str, fallback_title: &str) -> Metadata {
        Metadata {
            title: extract_title(text).unwrap_or(fallback_title).to_string(),
            excerpt: build_excerpt(text),
            item_count: first_count(text, &ITEM_COUNT_BOLD, &ITEM_COUNT_PLAIN),
            theme_count: first_count(text, &THEME_COUNT_BOLD, &THEME_COUNT_PLAIN),
        }
    }
}

/// First non-empty line, trimmed.
pub fn extract_title(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

/// The bold form wins over the plain form, matching how the generator
/// emphasizes the headline figure.
fn first_count(text: &str, bold: &Regex, plain: &Regex) -> u64 {
    bold.captures(text)
        .or_else(|| plain.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Short plain-text preview of the report body.
pub fn build_excerpt(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_markup_line(l))
        .take(EXCERPT_LINES)
        .collect();
    if lines.is_empty() {
        return EMPTY_EXCERPT.to_string();
    }

    lines
        .join(" ")
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .take(EXCERPT_MAX_CHARS)
        .collect()
}

/// Headings, blockquotes, footnote definitions, and horizontal rules.
fn is_markup_line(line: &str) -> bool {
    line.starts_with('#')
        || line.starts_with('>')
        || line.starts_with("[^")
        || line.starts_with("---")
        || is_rule(line)
}

fn is_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], '-' | '*' | '_')
        && compact.iter().all(|c| *c == compact[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Metadata {
        DailyReportExtractor.extract(text, "fallback")
    }

    #[test]
    fn test_counts_bold() {
        let m = extract("# 日报\n\n> 今日共 **12** 条 RSS 更新，提炼 **4** 个核心主题\n");
        assert_eq!(m.item_count, 12);
        assert_eq!(m.theme_count, 4);
    }

    #[test]
    fn test_counts_plain() {
        let m = extract("共 7 条更新\n3 个主题");
        assert_eq!(m.item_count, 7);
        assert_eq!(m.theme_count, 3);
    }

    #[test]
    fn test_bold_preferred_over_plain() {
        let m = extract("5 条更新 之后 **9** 条更新");
        assert_eq!(m.item_count, 9);
    }

    #[test]
    fn test_counts_absent() {
        let m = extract("# Title\n\nNothing numeric here.");
        assert_eq!(m.item_count, 0);
        assert_eq!(m.theme_count, 0);
    }

    #[test]
    fn test_title() {
        assert_eq!(extract("\n\n  # Heading  \nbody").title, "# Heading");
        assert_eq!(extract("").title, "fallback");
        assert_eq!(extract("   \n\t\n").title, "fallback");
    }

    #[test]
    fn test_excerpt_skips_markup() {
        let text = "# Title\n> quote\n[^1]: note\n---\n***\nFirst **bold** line\n\n- `code` item\nThird line";
        let m = extract(text);
        assert_eq!(m.excerpt, "First bold line - code item");
        assert!(!m.excerpt.starts_with('#'));
        assert!(!m.excerpt.starts_with('>'));
    }

    #[test]
    fn test_excerpt_truncated_to_char_limit() {
        let line_a = "a".repeat(100);
        let line_b = "b".repeat(99);
        let text = format!("# heading\n> quote\n{}\n{}\n", line_a, line_b);
        let excerpt = extract(&text).excerpt;
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
        assert!(excerpt.starts_with(&line_a));
    }

    #[test]
    fn test_excerpt_multibyte_boundary() {
        let text = format!("{}\n{}", "报".repeat(120), "告".repeat(120));
        let excerpt = extract(&text).excerpt;
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
        assert!(excerpt.ends_with('告'));
    }

    #[test]
    fn test_excerpt_placeholder() {
        assert_eq!(extract("# only\n> quotes\n").excerpt, EMPTY_EXCERPT);
        assert_eq!(extract("").excerpt, EMPTY_EXCERPT);
    }
}
