//! Report resolution.
//!
//! Produces report listings and report details for a channel, choosing the
//! source per channel on every call:
//!
//! 1. If an absolute HTTP(S) index URL can be resolved for the channel
//!    ([`Config::index_url`]), the remote index is authoritative. It is
//!    fetched cache-busted; a network failure, non-success status, or
//!    malformed body yields zero reports, never an error.
//! 2. Otherwise the local report directories are scanned
//!    ([`crate::local`]).
//!
//! Listings are sorted date descending, then file name descending.
//!
//! Detail lookups decode the identifier, then try each channel in search
//! order (preferred channel first) and return the first channel where both
//! the summary and its full content resolve. A summary is never returned
//! without content.
//!
//! Nothing is cached between calls.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use daily_digest_core::extract::{EMPTY_EXCERPT, EXCERPT_MAX_CHARS};
use daily_digest_core::models::file_stem;
use daily_digest_core::{
    slug, sort_reports, Channel, DailyReportExtractor, MetadataExtractor, ReportDate,
    ReportDetail, ReportSummary, SlugError,
};
use reqwest::Url;
use thiserror::Error;

use crate::config::{absolute_http_url, Config};
use crate::fetch::{cache_busted, Fetch, HttpFetcher};
use crate::index::{parse_index, IndexItem};
use crate::local;
use crate::object_store::{join_object_name, object_url, public_object_url, uri_encode};

/// Why a detail lookup produced nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("report not found: {0}")]
    InvalidIdentifier(#[from] SlugError),
    #[error("report not found: {0}")]
    NotFound(String),
}

/// Where a channel's reports are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSource {
    Remote { index_url: Url, prefix: String },
    Local { dirs: Vec<PathBuf> },
}

/// A report listed in a remote index, with the URL its full text is
/// fetched from.
#[derive(Debug, Clone)]
struct RemoteReport {
    summary: ReportSummary,
    content_url: String,
}

/// Resolves report listings and details from the remote index or local
/// directories.
#[derive(Clone)]
pub struct ReportResolver {
    config: Arc<Config>,
    fetch: Arc<dyn Fetch>,
    extractor: Arc<dyn MetadataExtractor>,
}

impl ReportResolver {
    pub fn new(
        config: Arc<Config>,
        fetch: Arc<dyn Fetch>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            config,
            fetch,
            extractor,
        }
    }

    /// Resolver with an HTTP fetcher (using the storage timeout) and the
    /// daily report extractor.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let fetch = HttpFetcher::new(config.storage.timeout())?;
        Ok(Self::new(
            config,
            Arc::new(fetch),
            Arc::new(DailyReportExtractor),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The source `channel` is read from under the current configuration.
    pub fn source(&self, channel: Channel) -> ChannelSource {
        match self.config.index_url(channel) {
            Some(index_url) => ChannelSource::Remote {
                index_url,
                prefix: self.config.channel_prefix(channel),
            },
            None => ChannelSource::Local {
                dirs: self.config.local.report_dirs(),
            },
        }
    }

    /// All reports of `channel`, in listing order.
    pub async fn all_reports(&self, channel: Channel) -> Vec<ReportSummary> {
        let mut reports = match self.source(channel) {
            ChannelSource::Remote { index_url, prefix } => self
                .remote_reports(channel, &index_url, &prefix)
                .await
                .into_iter()
                .map(|r| r.summary)
                .collect(),
            ChannelSource::Local { dirs } => self.local_reports(channel, dirs).await,
        };
        sort_reports(&mut reports);
        reports
    }

    /// Full report for `identifier`, searching `preferred` first.
    pub async fn report_by_slug(
        &self,
        identifier: &str,
        preferred: Option<Channel>,
    ) -> Result<ReportDetail, ResolveError> {
        let file_name = slug::decode(identifier)?;

        for channel in Channel::search_order(preferred) {
            if !channel.qualifies(&file_name) {
                continue;
            }
            if let Some(detail) = self.detail_in_channel(channel, &file_name).await {
                return Ok(detail);
            }
        }

        Err(ResolveError::NotFound(file_name))
    }

    async fn detail_in_channel(&self, channel: Channel, file_name: &str) -> Option<ReportDetail> {
        match self.source(channel) {
            ChannelSource::Remote { index_url, prefix } => {
                let report = self
                    .remote_reports(channel, &index_url, &prefix)
                    .await
                    .into_iter()
                    .find(|r| r.summary.file_name == file_name)?;
                let content = self.fetch_content(channel, &report.content_url).await?;
                Some(ReportDetail {
                    summary: report.summary,
                    content,
                })
            }
            ChannelSource::Local { dirs } => {
                let extractor = self.extractor.clone();
                let file_name = file_name.to_string();
                let joined = tokio::task::spawn_blocking(move || {
                    let (path, content) = local::read_report(&dirs, &file_name)?;
                    let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
                    let summary = local::summary_from_content(
                        &file_name,
                        channel,
                        &content,
                        modified,
                        extractor.as_ref(),
                    );
                    Some(ReportDetail { summary, content })
                })
                .await;
                match joined {
                    Ok(detail) => detail,
                    Err(e) => {
                        tracing::warn!(%channel, error = %e, "local detail lookup failed");
                        None
                    }
                }
            }
        }
    }

    async fn fetch_content(&self, channel: Channel, url: &str) -> Option<String> {
        match self.fetch.get_text(url).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(%channel, url = %url, error = %e, "report content unavailable");
                None
            }
        }
    }

    async fn remote_reports(
        &self,
        channel: Channel,
        index_url: &Url,
        prefix: &str,
    ) -> Vec<RemoteReport> {
        let url = cache_busted(index_url);
        let text = match self.fetch.get_text(url.as_str()).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(%channel, index_url = %index_url, error = %e, "remote index unavailable");
                return Vec::new();
            }
        };
        let items = match parse_index(&text) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(%channel, index_url = %index_url, error = %e, "remote index malformed");
                return Vec::new();
            }
        };

        let mut seen = std::collections::HashSet::new();
        let reports: Vec<RemoteReport> = items
            .iter()
            .filter_map(|item| {
                let file_name = item.file_name()?;
                if !channel.qualifies(file_name) || !seen.insert(file_name.to_string()) {
                    return None;
                }
                Some(self.remote_item(channel, item, file_name, index_url, prefix))
            })
            .collect();

        tracing::debug!(%channel, count = reports.len(), "resolved remote index");
        reports
    }

    fn remote_item(
        &self,
        channel: Channel,
        item: &IndexItem,
        file_name: &str,
        index_url: &Url,
        prefix: &str,
    ) -> RemoteReport {
        let date = item
            .date()
            .map(ReportDate::parse)
            .filter(ReportDate::is_known)
            .unwrap_or_else(|| ReportDate::from_file_name(file_name));

        let summary = ReportSummary {
            identifier: slug::encode(file_name),
            channel,
            title: item
                .title()
                .map(str::to_string)
                .unwrap_or_else(|| file_stem(file_name).to_string()),
            date,
            file_name: file_name.to_string(),
            excerpt: item
                .excerpt()
                .map(|e| e.chars().take(EXCERPT_MAX_CHARS).collect())
                .unwrap_or_else(|| EMPTY_EXCERPT.to_string()),
            item_count: item.item_count(),
            theme_count: item.theme_count(),
            updated_at: item.updated_at().map(str::to_string),
        };

        RemoteReport {
            content_url: self.content_url(item, file_name, index_url, prefix),
            summary,
        }
    }

    /// Content URL for an index item, first match wins:
    /// explicit absolute `url`, public base + object name, bucket host +
    /// object name, then the derived `<prefix>/<fileName>` object path
    /// (relative to the index URL when no storage host is known).
    fn content_url(&self, item: &IndexItem, file_name: &str, index_url: &Url, prefix: &str) -> String {
        if let Some(url) = item.url().and_then(absolute_http_url) {
            return url.to_string();
        }

        let storage = &self.config.storage;
        if let Some(object) = item.object_name() {
            if let Some(base) = storage.public_base_url() {
                return object_url(base, object);
            }
            if let Some(host) = storage.bucket_host_url() {
                return object_url(&host, object);
            }
        }

        let derived = join_object_name(prefix, file_name);
        if let Some(url) = public_object_url(storage, &derived) {
            return url;
        }
        index_url
            .join(&uri_encode(file_name))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| object_url(index_url.as_str(), file_name))
    }

    async fn local_reports(&self, channel: Channel, dirs: Vec<PathBuf>) -> Vec<ReportSummary> {
        let extractor = self.extractor.clone();
        let joined = tokio::task::spawn_blocking(move || {
            local::list_report_files(&dirs, channel)
                .iter()
                .filter_map(|file| match local::summarize(file, channel, extractor.as_ref()) {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        tracing::warn!(%channel, path = %file.path.display(), error = %e, "skipping unreadable report");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await;

        match joined {
            Ok(reports) => reports,
            Err(e) => {
                tracing::warn!(%channel, error = %e, "local scan failed");
                Vec::new()
            }
        }
    }
}
