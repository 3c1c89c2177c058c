//! Index synchronization on report deletion.
//!
//! A deletion removes the report object from the bucket and rewrites the
//! channel's `index.json` without the matching entry:
//!
//! 1. Read the current index (`OnMissing::Empty`: a missing index is an
//!    empty one). Any other read failure, or a body that is not a valid
//!    index, aborts the deletion so a transient error can never clobber the
//!    index with an empty item list.
//! 2. Take the first item whose file name matches; its object name wins,
//!    otherwise `<prefix>/<fileName>` is used.
//! 3. Delete the object (absent objects are fine).
//! 4. Write back the remaining items, sorted file name descending, as a
//!    fresh [`IndexDocument`]. A failed write is a failed deletion.
//!
//! Read-modify-write is serialized per channel inside one
//! [`IndexSynchronizer`]. Writers in different processes (or separate
//! synchronizer instances) are not coordinated: a writer whose read
//! predates another writer's put will overwrite it and can resurrect the
//! entry that writer removed. Closing that gap needs a conditional write
//! keyed on the object's ETag.

use std::collections::HashMap;
use std::sync::Arc;

use daily_digest_core::{slug, Channel, SlugError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::index::{parse_index, sort_items, IndexDocument, IndexItem};
use crate::object_store::{join_object_name, ObjectStore, ObjectStoreError, OnMissing};

/// Content type of the rewritten index object.
pub const INDEX_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("object storage is not configured")]
    NotConfigured,

    #[error(transparent)]
    InvalidFileName(#[from] SlugError),

    #[error("index {object} is unreadable: {reason}")]
    MalformedIndex { object: String, reason: String },

    #[error(transparent)]
    Store(#[from] ObjectStoreError),

    #[error("failed to encode index: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub file_name: String,
    pub object_name: String,
    pub deleted_url: Option<String>,
    pub index_url: Option<String>,
    /// False when the index held no entry for the file.
    pub removed_from_index: bool,
}

/// Keeps each channel's remote index consistent with object deletions.
pub struct IndexSynchronizer {
    store: Arc<dyn ObjectStore>,
    config: Arc<Config>,
    locks: HashMap<Channel, Mutex<()>>,
}

impl IndexSynchronizer {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<Config>) -> Self {
        let locks = Channel::ALL.iter().map(|c| (*c, Mutex::new(()))).collect();
        Self {
            store,
            config,
            locks,
        }
    }

    /// Remove `file_name` from `channel`'s bucket prefix and index.
    ///
    /// `file_name` is reduced to its basename and must qualify for the
    /// channel.
    pub async fn delete_report(
        &self,
        channel: Channel,
        file_name: &str,
    ) -> Result<DeleteOutcome, SyncError> {
        if !self.config.storage.is_usable() {
            return Err(SyncError::NotConfigured);
        }

        let file_name = slug::basename(file_name.trim())
            .ok_or_else(|| SlugError::NotBasename(file_name.to_string()))?
            .to_string();
        if !channel.qualifies(&file_name) {
            return Err(SlugError::NotQualified { file_name, channel }.into());
        }

        let prefix = self.config.channel_prefix(channel);
        let index_object = self.config.index_object_name(channel);

        // Every channel gets a lock in `new`.
        let _guard = self.locks[&channel].lock().await;

        let items = self.load_items(&index_object).await?;
        let (matched, mut remaining) = split_matching(items, &file_name);

        let object_name = matched
            .as_ref()
            .and_then(IndexItem::object_name)
            .map(str::to_string)
            .unwrap_or_else(|| join_object_name(&prefix, &file_name));

        self.store.delete_object(&object_name).await?;
        tracing::info!(%channel, object = %object_name, "deleted report object");

        sort_items(&mut remaining);
        let document = IndexDocument::new(&prefix, remaining);
        self.store
            .put_object(&index_object, document.to_bytes()?, INDEX_CONTENT_TYPE)
            .await?;
        tracing::info!(
            %channel,
            index = %index_object,
            count = document.count,
            removed = matched.is_some(),
            "rewrote index"
        );

        Ok(DeleteOutcome {
            deleted_url: self.store.public_url(&object_name),
            index_url: self.store.public_url(&index_object),
            removed_from_index: matched.is_some(),
            file_name,
            object_name,
        })
    }

    async fn load_items(&self, index_object: &str) -> Result<Vec<IndexItem>, SyncError> {
        let Some(bytes) = self.store.get_object(index_object, OnMissing::Empty).await? else {
            tracing::debug!(index = %index_object, "index missing, treating as empty");
            return Ok(Vec::new());
        };
        let text = String::from_utf8(bytes).map_err(|e| SyncError::MalformedIndex {
            object: index_object.to_string(),
            reason: e.to_string(),
        })?;
        parse_index(&text).map_err(|e| SyncError::MalformedIndex {
            object: index_object.to_string(),
            reason: format!("{:#}", e),
        })
    }
}

/// What a full deletion touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub file_name: String,
    pub channel: Channel,
    /// Present when object storage is configured.
    pub remote: Option<DeleteOutcome>,
    pub local_removed: Vec<String>,
}

impl RemovalReport {
    pub fn removed_anything(&self) -> bool {
        self.remote.is_some() || !self.local_removed.is_empty()
    }
}

/// Delete a report everywhere it may live: the bucket and index (when
/// `sync` is given) and every local report directory.
///
/// The remote step runs first; if it fails, local files are left alone.
pub async fn remove_report(
    sync: Option<&IndexSynchronizer>,
    local_dirs: Vec<std::path::PathBuf>,
    channel: Channel,
    file_name: &str,
) -> anyhow::Result<RemovalReport> {
    let file_name = slug::basename(file_name.trim())
        .ok_or_else(|| SlugError::NotBasename(file_name.to_string()))?
        .to_string();
    if !channel.qualifies(&file_name) {
        return Err(SlugError::NotQualified { file_name, channel }.into());
    }

    let remote = match sync {
        Some(sync) => Some(sync.delete_report(channel, &file_name).await?),
        None => None,
    };

    let name = file_name.clone();
    let local_removed =
        tokio::task::spawn_blocking(move || crate::local::remove_report_file(&local_dirs, &name))
            .await??
            .iter()
            .map(|p| p.display().to_string())
            .collect();

    Ok(RemovalReport {
        file_name,
        channel,
        remote,
        local_removed,
    })
}

/// Split off the first item named `file_name`; later duplicates are kept.
fn split_matching(items: Vec<IndexItem>, file_name: &str) -> (Option<IndexItem>, Vec<IndexItem>) {
    let mut matched = None;
    let mut remaining = Vec::with_capacity(items.len());
    for item in items {
        if matched.is_none() && item.file_name() == Some(file_name) {
            matched = Some(item);
        } else {
            remaining.push(item);
        }
    }
    (matched, remaining)
}
