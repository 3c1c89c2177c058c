//! Channel registry.
//!
//! A channel is a logical content stream (AI, crypto, finance) with its own
//! storage namespace and file-naming marker. The registry is a static table:
//! lookups are a `match` on [`Channel`] and nothing is mutated at runtime.
//!
//! | Channel | Marker | Default prefix |
//! |---------|--------|----------------|
//! | `ai` | `日报` | `daily-news/reports` |
//! | `crypto` | `加密日报` | `daily-news/crypto-reports` |
//! | `finance` | `财经日报` | `daily-news/finance-reports` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Substrings that mark alternate-format derivatives of a report
/// (WeChat layout, raw material bundles). Never listed in any channel.
pub const DERIVATIVE_MARKERS: &[&str] = &["公众号格式", "素材"];

/// File extensions accepted as Markdown reports (compared case-insensitively).
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// A logical content channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ai,
    Crypto,
    Finance,
}

impl Channel {
    /// Every channel, in default detail-search order.
    pub const ALL: [Channel; 3] = [Channel::Ai, Channel::Crypto, Channel::Finance];

    pub fn as_str(&self) -> &'static str {
        self.config().key
    }

    /// Static configuration for this channel.
    pub fn config(&self) -> &'static ChannelConfig {
        match self {
            Channel::Ai => &AI,
            Channel::Crypto => &CRYPTO,
            Channel::Finance => &FINANCE,
        }
    }

    /// Channel search order for a detail lookup: the preferred channel
    /// first (if any), then the remaining channels in default order.
    pub fn search_order(preferred: Option<Channel>) -> Vec<Channel> {
        let mut order = Vec::with_capacity(Self::ALL.len());
        if let Some(p) = preferred {
            order.push(p);
        }
        order.extend(Self::ALL.iter().copied().filter(|c| Some(*c) != preferred));
        order
    }

    /// Whether `file_name` belongs to this channel's report set.
    pub fn qualifies(&self, file_name: &str) -> bool {
        self.config().qualifies(file_name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("unknown channel: '{}' (expected ai, crypto, or finance)", s))
    }
}

/// Static per-channel configuration.
#[derive(Debug)]
pub struct ChannelConfig {
    /// Channel key used in URLs, config sections, and logs.
    pub key: &'static str,
    /// Substring that must appear in a qualifying file name.
    pub report_marker: &'static str,
    /// Default object-store prefix for the channel's reports and index.
    pub default_prefix: &'static str,
    /// Environment variables that override the prefix, highest priority first.
    pub prefix_env: &'static [&'static str],
    /// Environment variables that override the remote index URL, highest priority first.
    pub index_url_env: &'static [&'static str],
    /// Channel-specific markers that disqualify a file in addition to
    /// [`DERIVATIVE_MARKERS`].
    pub exclude_markers: &'static [&'static str],
}

impl ChannelConfig {
    /// Qualification rule: Markdown extension, contains the marker, and
    /// carries no exclusion marker.
    pub fn qualifies(&self, file_name: &str) -> bool {
        if !has_markdown_extension(file_name) {
            return false;
        }
        if !file_name.contains(self.report_marker) {
            return false;
        }
        !DERIVATIVE_MARKERS
            .iter()
            .chain(self.exclude_markers.iter())
            .any(|m| file_name.contains(m))
    }
}

fn has_markdown_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => MARKDOWN_EXTENSIONS
            .iter()
            .any(|e| ext.eq_ignore_ascii_case(e)),
        _ => false,
    }
}

static AI: ChannelConfig = ChannelConfig {
    key: "ai",
    report_marker: "日报",
    default_prefix: "daily-news/reports",
    prefix_env: &["AI_REPORTS_OSS_PREFIX", "ALIYUN_OSS_PREFIX", "OSS_PREFIX"],
    index_url_env: &["AI_REPORTS_INDEX_URL", "OSS_REPORTS_INDEX_URL"],
    exclude_markers: &["加密日报", "财经日报"],
};

static CRYPTO: ChannelConfig = ChannelConfig {
    key: "crypto",
    report_marker: "加密日报",
    default_prefix: "daily-news/crypto-reports",
    prefix_env: &["CRYPTO_REPORTS_OSS_PREFIX"],
    index_url_env: &["CRYPTO_REPORTS_INDEX_URL"],
    exclude_markers: &[],
};

static FINANCE: ChannelConfig = ChannelConfig {
    key: "finance",
    report_marker: "财经日报",
    default_prefix: "daily-news/finance-reports",
    prefix_env: &["FINANCE_REPORTS_OSS_PREFIX"],
    index_url_env: &["FINANCE_REPORTS_INDEX_URL"],
    exclude_markers: &[],
};
