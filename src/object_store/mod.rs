//! Object store access.
//!
//! The [`ObjectStore`] trait is the seam between the index synchronizer and
//! the bucket it maintains. Two implementations ship with the crate:
//!
//! | Type | Backing | Used by |
//! |------|---------|---------|
//! | [`OssClient`] | Signed HTTP against an OSS bucket | CLI, server |
//! | [`InMemoryObjectStore`] | `HashMap` behind a lock | tests |
//!
//! Object names are canonicalized before use: leading slashes are stripped
//! and empty names are rejected. Public URLs percent-encode each path
//! segment and prefer a configured public base URL over the bucket host.

mod memory;
mod oss;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageConfig;

pub use memory::InMemoryObjectStore;
pub use oss::OssClient;

/// Longest response body excerpt kept in a [`ObjectStoreError::Status`].
pub const ERROR_BODY_LIMIT: usize = 500;

/// How a read treats a missing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// A 404 yields `Ok(None)`.
    Empty,
    /// A 404 is an error like any other non-success status.
    Fail,
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object storage is not configured (access key id, secret, bucket, and endpoint are required)")]
    NotConfigured,

    #[error("invalid object name: {0:?}")]
    InvalidObjectName(String),

    #[error("{op} {object}: {message}")]
    Transport {
        op: &'static str,
        object: String,
        message: String,
    },

    #[error("{op} {object} failed (HTTP {status}): {body}")]
    Status {
        op: &'static str,
        object: String,
        status: u16,
        body: String,
    },
}

impl ObjectStoreError {
    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ObjectStoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Bucket-style object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's bytes.
    async fn get_object(
        &self,
        name: &str,
        on_missing: OnMissing,
    ) -> Result<Option<Vec<u8>>, ObjectStoreError>;

    /// Write an object, replacing any previous content.
    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Remove an object. Removing an absent object succeeds.
    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError>;

    /// Browsable URL for an object, if one can be derived.
    fn public_url(&self, name: &str) -> Option<String>;
}

/// Collapse empty path segments (leading, trailing, and doubled slashes) so
/// the signed resource and the request path name the same key; reject names
/// with no segments left.
pub fn canonical_object_name(name: &str) -> Result<String, ObjectStoreError> {
    let segments: Vec<&str> = name.trim().split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ObjectStoreError::InvalidObjectName(name.to_string()));
    }
    Ok(segments.join("/"))
}

/// `<prefix>/<file_name>`, or just `file_name` when the prefix is empty.
pub fn join_object_name(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// Percent-encode each segment of an object path, dropping empty segments.
pub fn encode_object_path(name: &str) -> String {
    name.split('/')
        .filter(|s| !s.is_empty())
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Public URL of `object` under `base` (no trailing slash expected).
pub fn object_url(base: &str, object: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), encode_object_path(object))
}

/// Browsable URL for `object`: the public base URL when configured,
/// otherwise `https://<bucket>.<endpoint>`.
pub fn public_object_url(storage: &StorageConfig, object: &str) -> Option<String> {
    let base = storage
        .public_base_url()
        .map(str::to_string)
        .or_else(|| storage.bucket_host_url())?;
    Some(object_url(&base, object))
}

/// URI-encode a string per RFC 3986.
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
pub fn uri_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Keep at most [`ERROR_BODY_LIMIT`] characters of a response body.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
