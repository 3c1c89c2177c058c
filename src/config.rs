//! Configuration parsing, environment overrides, and per-channel resolution.
//!
//! Configuration is loaded once per process from a TOML file (default
//! `config/digest.toml`) and then overlaid with environment variables by
//! [`Config::apply_env`]. Nothing below the CLI/server entry points reads the
//! environment; the resolver and synchronizer receive a finished [`Config`].
//!
//! # Example
//!
//! ```toml
//! [storage]
//! access_key_id = "LTAI..."
//! access_key_secret = "..."
//! bucket = "daily-news"
//! endpoint = "https://oss-cn-beijing.aliyuncs.com"
//! public_base_url = "https://cdn.example.com"
//! timeout_secs = 12
//!
//! [local]
//! output_dir = "outputs"
//! fallback_dir = "/tmp/daily-news-outputs"
//!
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [channels.crypto]
//! prefix = "daily-news/crypto-reports"
//! index_url = "https://cdn.example.com/daily-news/crypto-reports/index.json"
//! ```
//!
//! # Environment Variables
//!
//! Storage credentials: `ALIYUN_OSS_ACCESS_KEY_ID` / `OSS_ACCESS_KEY_ID`,
//! `ALIYUN_OSS_ACCESS_KEY_SECRET` / `OSS_ACCESS_KEY_SECRET`,
//! `ALIYUN_OSS_BUCKET_NAME` / `OSS_BUCKET_NAME`,
//! `ALIYUN_OSS_ENDPOINT` / `OSS_ENDPOINT`,
//! `ALIYUN_OSS_PUBLIC_BASE_URL` / `OSS_PUBLIC_BASE_URL`.
//! Channel prefix and index URL variables are listed in the channel registry
//! ([`daily_digest_core::ChannelConfig`]). The first non-empty variable in each
//! list wins and replaces the file value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use daily_digest_core::Channel;
use reqwest::Url;
use serde::Deserialize;

use crate::object_store;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub channels: HashMap<String, ChannelOverride>,
}

/// Object-store credentials and addressing.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            bucket: String::new(),
            endpoint: default_endpoint(),
            public_base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "oss-cn-beijing.aliyuncs.com".to_string()
}
fn default_timeout_secs() -> u64 {
    12
}

impl StorageConfig {
    /// Endpoint host with scheme and trailing slashes removed.
    pub fn normalized_endpoint(&self) -> String {
        normalize_endpoint(&self.endpoint)
    }

    /// True when every field needed to sign a request is present.
    pub fn is_usable(&self) -> bool {
        !self.access_key_id.trim().is_empty()
            && !self.access_key_secret.trim().is_empty()
            && !self.bucket.trim().is_empty()
            && !self.normalized_endpoint().is_empty()
    }

    /// Public base URL without trailing slash, if configured.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    /// `https://<bucket>.<endpoint>`, if bucket and endpoint are set.
    pub fn bucket_host_url(&self) -> Option<String> {
        let bucket = self.bucket.trim();
        let endpoint = self.normalized_endpoint();
        if bucket.is_empty() || endpoint.is_empty() {
            None
        } else {
            Some(format!("https://{}.{}", bucket, endpoint))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Strip scheme and trailing slashes from an endpoint.
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Strip surrounding whitespace and slashes from an object prefix.
pub fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().trim_matches('/').to_string()
}

/// Local directories scanned when a channel has no remote index.
#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fallback_dir: default_fallback_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_fallback_dir() -> PathBuf {
    std::env::temp_dir().join("daily-news-outputs")
}

impl LocalConfig {
    /// Candidate directories in lookup order; the first holding a file wins.
    pub fn report_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.output_dir.clone()];
        if self.fallback_dir != self.output_dir {
            dirs.push(self.fallback_dir.clone());
        }
        dirs
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Per-channel overrides of the registry defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelOverride {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub index_url: Option<String>,
}

type StorageSetter = fn(&mut StorageConfig, String);

const STORAGE_ENV: &[(&[&str], StorageSetter)] = &[
    (
        &["ALIYUN_OSS_ACCESS_KEY_ID", "OSS_ACCESS_KEY_ID"],
        |s, v| s.access_key_id = v,
    ),
    (
        &["ALIYUN_OSS_ACCESS_KEY_SECRET", "OSS_ACCESS_KEY_SECRET"],
        |s, v| s.access_key_secret = v,
    ),
    (
        &["ALIYUN_OSS_BUCKET_NAME", "OSS_BUCKET_NAME"],
        |s, v| s.bucket = v,
    ),
    (&["ALIYUN_OSS_ENDPOINT", "OSS_ENDPOINT"], |s, v| s.endpoint = v),
    (
        &["ALIYUN_OSS_PUBLIC_BASE_URL", "OSS_PUBLIC_BASE_URL"],
        |s, v| s.public_base_url = Some(v),
    ),
];

/// First non-empty value among `names`.
fn first_env(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| lookup(n))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl Config {
    /// Overlay environment values onto this config.
    ///
    /// `lookup` is the environment accessor; pass `|k| std::env::var(k).ok()`
    /// in production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (names, set) in STORAGE_ENV {
            if let Some(value) = first_env(&lookup, names) {
                set(&mut self.storage, value);
            }
        }

        for channel in Channel::ALL {
            let cfg = channel.config();
            let prefix = first_env(&lookup, cfg.prefix_env);
            let index_url = first_env(&lookup, cfg.index_url_env);
            if prefix.is_none() && index_url.is_none() {
                continue;
            }
            let entry = self
                .channels
                .entry(channel.as_str().to_string())
                .or_default();
            if prefix.is_some() {
                entry.prefix = prefix;
            }
            if index_url.is_some() {
                entry.index_url = index_url;
            }
        }
    }

    fn channel_override(&self, channel: Channel) -> Option<&ChannelOverride> {
        self.channels.get(channel.as_str())
    }

    /// Object prefix for `channel`, normalized (no leading/trailing slash).
    pub fn channel_prefix(&self, channel: Channel) -> String {
        self.channel_override(channel)
            .and_then(|o| o.prefix.as_deref())
            .map(normalize_prefix)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| channel.config().default_prefix.to_string())
    }

    /// Object name of the channel's index document.
    pub fn index_object_name(&self, channel: Channel) -> String {
        object_store::join_object_name(&self.channel_prefix(channel), "index.json")
    }

    /// Absolute HTTP(S) URL of the channel's remote index, if one can be
    /// constructed.
    ///
    /// An explicit index URL always takes precedence. If it is present but
    /// not an absolute http/https URL, the remote source is treated as
    /// absent rather than falling through to the storage-derived URL.
    pub fn index_url(&self, channel: Channel) -> Option<Url> {
        let explicit = self
            .channel_override(channel)
            .and_then(|o| o.index_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty());

        match explicit {
            Some(raw) => absolute_http_url(raw),
            None if self.storage.is_usable() => {
                object_store::public_object_url(&self.storage, &self.index_object_name(channel))
                    .and_then(|u| absolute_http_url(&u))
            }
            None => None,
        }
    }
}

/// Parse `raw` as an absolute URL with an http/https scheme and a host.
pub fn absolute_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists (defaults otherwise), then apply the process
/// environment.
pub fn load_with_env(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };
    config.apply_env(|k| std::env::var(k).ok());
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.storage.timeout_secs == 0 {
        bail!("storage.timeout_secs must be > 0");
    }
    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }
    for key in config.channels.keys() {
        key.parse::<Channel>()
            .map_err(|e| anyhow::anyhow!("[channels.{}]: {}", key, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn usable_storage() -> StorageConfig {
        StorageConfig {
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            bucket: "news".into(),
            endpoint: "https://oss-cn-beijing.aliyuncs.com/".into(),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.storage.is_usable());
        assert_eq!(config.storage.timeout_secs, 12);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.local.output_dir, PathBuf::from("outputs"));
    }

    #[test]
    fn test_parse_channels_table() {
        let config: Config = toml::from_str(
            r#"
            [channels.crypto]
            prefix = "/custom/crypto/"
            "#,
        )
        .unwrap();
        assert_eq!(config.channel_prefix(Channel::Crypto), "custom/crypto");
        assert_eq!(config.channel_prefix(Channel::Ai), "daily-news/reports");
        assert_eq!(
            config.index_object_name(Channel::Crypto),
            "custom/crypto/index.json"
        );
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(&path, "[channels.stocks]\nprefix = \"x\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint(" https://oss.example.com// "), "oss.example.com");
        assert_eq!(normalize_endpoint("http://x"), "x");
        assert!(usable_storage().is_usable());
    }

    #[test]
    fn test_env_overrides_storage_in_priority_order() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("ALIYUN_OSS_ACCESS_KEY_ID", "primary"),
            ("OSS_ACCESS_KEY_ID", "secondary"),
            ("OSS_ACCESS_KEY_SECRET", "s"),
            ("ALIYUN_OSS_BUCKET_NAME", "  "),
            ("OSS_BUCKET_NAME", "bucket"),
        ]));
        assert_eq!(config.storage.access_key_id, "primary");
        assert_eq!(config.storage.access_key_secret, "s");
        assert_eq!(config.storage.bucket, "bucket");
        assert!(config.storage.is_usable());
    }

    #[test]
    fn test_env_sets_every_storage_field() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("OSS_ACCESS_KEY_ID", "id"),
            ("OSS_ACCESS_KEY_SECRET", "secret"),
            ("OSS_BUCKET_NAME", "news"),
            ("OSS_ENDPOINT", "oss-cn-hangzhou.aliyuncs.com"),
            ("OSS_PUBLIC_BASE_URL", "https://cdn.example.com"),
        ]));
        assert_eq!(config.storage.access_key_id, "id");
        assert_eq!(config.storage.access_key_secret, "secret");
        assert_eq!(config.storage.bucket, "news");
        assert_eq!(config.storage.endpoint, "oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(
            config.storage.public_base_url.as_deref(),
            Some("https://cdn.example.com")
        );
    }

    #[test]
    fn test_env_overrides_channel() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("OSS_PREFIX", "from-generic"),
            ("AI_REPORTS_OSS_PREFIX", "from-ai"),
            ("CRYPTO_REPORTS_INDEX_URL", "https://cdn.example.com/c/index.json"),
        ]));
        assert_eq!(config.channel_prefix(Channel::Ai), "from-ai");
        assert_eq!(
            config.index_url(Channel::Crypto).unwrap().as_str(),
            "https://cdn.example.com/c/index.json"
        );
        assert!(config.index_url(Channel::Finance).is_none());
    }

    #[test]
    fn test_index_url_derived_from_storage() {
        let mut config = Config {
            storage: usable_storage(),
            ..Config::default()
        };
        assert_eq!(
            config.index_url(Channel::Ai).unwrap().as_str(),
            "https://news.oss-cn-beijing.aliyuncs.com/daily-news/reports/index.json"
        );

        config.storage.public_base_url = Some("https://cdn.example.com/".into());
        assert_eq!(
            config.index_url(Channel::Finance).unwrap().as_str(),
            "https://cdn.example.com/daily-news/finance-reports/index.json"
        );
    }

    #[test]
    fn test_unusable_explicit_index_url_means_absent() {
        let mut config = Config {
            storage: usable_storage(),
            ..Config::default()
        };
        config.channels.insert(
            "ai".to_string(),
            ChannelOverride {
                prefix: None,
                index_url: Some("/reports/index.json".into()),
            },
        );
        assert!(config.index_url(Channel::Ai).is_none());

        config.channels.get_mut("ai").unwrap().index_url =
            Some("ftp://host/index.json".into());
        assert!(config.index_url(Channel::Ai).is_none());
    }

    #[test]
    fn test_report_dirs_dedup() {
        let local = LocalConfig {
            output_dir: PathBuf::from("/a"),
            fallback_dir: PathBuf::from("/a"),
        };
        assert_eq!(local.report_dirs(), vec![PathBuf::from("/a")]);
    }

    #[test]
    fn test_load_config_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(&path, "[storage]\ntimeout_secs = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
