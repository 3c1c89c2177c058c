//! Unauthenticated HTTP reads of remote indexes and report bodies.
//!
//! The resolver reads published objects through their public URLs, so it
//! needs no credentials. [`Fetch`] keeps that I/O behind a trait; tests use
//! a map-backed implementation.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;

use crate::object_store::truncate_body;

/// Reads text from an absolute URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the body. Non-success statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// [`Fetch`] over `reqwest` with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("GET {} failed (HTTP {}): {}", url, status, truncate_body(&body));
        }

        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

/// Append a `t=<millis>` query parameter so CDN caches are bypassed.
pub fn cache_busted(url: &Url) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair("t", &Utc::now().timestamp_millis().to_string());
    busted
}
