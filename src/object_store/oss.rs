//! Aliyun OSS client.
//!
//! Issues GET, PUT, and DELETE requests against a single bucket using the
//! OSS header signature:
//!
//! ```text
//! StringToSign = VERB + "\n"
//!              + Content-MD5 + "\n"
//!              + Content-Type + "\n"
//!              + Date + "\n"
//!              + "/" + bucket + "/" + object
//! Authorization: OSS <AccessKeyId>:base64(HMAC-SHA1(secret, StringToSign))
//! ```
//!
//! Every request is signed with the current time and carries the
//! configured timeout. Requests go to
//! `https://<bucket>.<endpoint>/<percent-encoded-object>`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode};
use sha1::Sha1;

use super::{
    canonical_object_name, encode_object_path, public_object_url, truncate_body, ObjectStore,
    ObjectStoreError, OnMissing,
};
use crate::config::StorageConfig;

type HmacSha1 = Hmac<Sha1>;

/// Signed HTTP client for one OSS bucket.
#[derive(Debug, Clone)]
pub struct OssClient {
    storage: StorageConfig,
    /// Scheme + host requests are sent to.
    request_base: String,
    http: reqwest::Client,
}

impl OssClient {
    /// Build a client, or fail with [`ObjectStoreError::NotConfigured`] when
    /// the storage configuration is incomplete.
    pub fn new(storage: &StorageConfig) -> Result<Self, ObjectStoreError> {
        if !storage.is_usable() {
            return Err(ObjectStoreError::NotConfigured);
        }
        let request_base = storage
            .bucket_host_url()
            .ok_or(ObjectStoreError::NotConfigured)?;
        let http = reqwest::Client::builder()
            .timeout(storage.timeout())
            .build()
            .map_err(|e| ObjectStoreError::Transport {
                op: "init",
                object: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            storage: storage.clone(),
            request_base,
            http,
        })
    }

    /// Send requests to `base` instead of the bucket host. Used for
    /// S3-compatible gateways and local stubs; the signature still covers
    /// `/<bucket>/<object>`.
    pub fn with_request_base(mut self, base: impl Into<String>) -> Self {
        self.request_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket.trim()
    }

    fn sign(&self, method: &Method, content_type: &str, date: &str, object: &str) -> String {
        let to_sign = string_to_sign(method.as_str(), content_type, date, self.bucket(), object);
        let mut mac = HmacSha1::new_from_slice(self.storage.access_key_secret.trim().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    async fn send(
        &self,
        op: &'static str,
        method: Method,
        object: &str,
        body: Option<(Vec<u8>, &str)>,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let date = http_date();
        let content_type = body.as_ref().map(|(_, ct)| *ct).unwrap_or("");
        let signature = self.sign(&method, content_type, &date, object);
        let url = format!("{}/{}", self.request_base, encode_object_path(object));

        let mut req = self
            .http
            .request(method, &url)
            .header("Date", &date)
            .header(
                "Authorization",
                format!("OSS {}:{}", self.storage.access_key_id.trim(), signature),
            );
        if let Some((bytes, ct)) = body {
            req = req.header("Content-Type", ct).body(bytes);
        }

        tracing::debug!(op, object, url = %url, "oss request");
        req.send().await.map_err(|e| ObjectStoreError::Transport {
            op,
            object: object.to_string(),
            message: if e.is_timeout() {
                format!("timed out: {}", e)
            } else {
                e.to_string()
            },
        })
    }
}

/// Canonical signature input for an OSS request.
pub(crate) fn string_to_sign(
    method: &str,
    content_type: &str,
    date: &str,
    bucket: &str,
    object: &str,
) -> String {
    format!(
        "{}\n\n{}\n{}\n/{}/{}",
        method, content_type, date, bucket, object
    )
}

/// RFC 7231 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn status_error(
    op: &'static str,
    object: &str,
    resp: reqwest::Response,
) -> ObjectStoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ObjectStoreError::Status {
        op,
        object: object.to_string(),
        status,
        body: truncate_body(&body),
    }
}

#[async_trait]
impl ObjectStore for OssClient {
    async fn get_object(
        &self,
        name: &str,
        on_missing: OnMissing,
    ) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let object = canonical_object_name(name)?;
        let resp = self.send("GetObject", Method::GET, &object, None).await?;

        if resp.status() == StatusCode::NOT_FOUND && on_missing == OnMissing::Empty {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error("GetObject", &object, resp).await);
        }

        let bytes = resp.bytes().await.map_err(|e| ObjectStoreError::Transport {
            op: "GetObject",
            object: object.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(bytes.to_vec()))
    }

    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let object = canonical_object_name(name)?;
        let resp = self
            .send("PutObject", Method::PUT, &object, Some((body, content_type)))
            .await?;
        if !resp.status().is_success() {
            return Err(status_error("PutObject", &object, resp).await);
        }
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError> {
        let object = canonical_object_name(name)?;
        let resp = self
            .send("DeleteObject", Method::DELETE, &object, None)
            .await?;
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(status_error("DeleteObject", &object, resp).await)
    }

    fn public_url(&self, name: &str) -> Option<String> {
        let object = canonical_object_name(name).ok()?;
        public_object_url(&self.storage, &object)
    }
}
