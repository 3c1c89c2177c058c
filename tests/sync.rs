use std::sync::Arc;

use async_trait::async_trait;
use daily_digest::config::{Config, StorageConfig};
use daily_digest::index::parse_index;
use daily_digest::object_store::{InMemoryObjectStore, ObjectStore, ObjectStoreError, OnMissing};
use daily_digest::sync::{IndexSynchronizer, SyncError, INDEX_CONTENT_TYPE};
use daily_digest_core::Channel;
use serde_json::{json, Value};
use tokio::sync::Barrier;

const PREFIX: &str = "daily-news/reports";
const INDEX: &str = "daily-news/reports/index.json";

fn config() -> Arc<Config> {
    Arc::new(Config {
        storage: StorageConfig {
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            bucket: "news".into(),
            public_base_url: Some("https://cdn.example.com".into()),
            ..StorageConfig::default()
        },
        ..Config::default()
    })
}

fn seeded_store(names: &[&str]) -> Arc<InMemoryObjectStore> {
    let store = Arc::new(InMemoryObjectStore::with_public_base("https://cdn.example.com"));
    let items: Vec<Value> = names
        .iter()
        .map(|n| {
            json!({
                "fileName": n,
                "objectName": format!("{}/{}", PREFIX, n),
                "title": n,
            })
        })
        .collect();
    store.insert(
        INDEX,
        json!({ "generated_at": "x", "count": items.len(), "prefix": PREFIX, "items": items })
            .to_string(),
        INDEX_CONTENT_TYPE,
    );
    for n in names {
        store.insert(&format!("{}/{}", PREFIX, n), "body", "text/markdown");
    }
    store
}

fn index_names(store: &InMemoryObjectStore) -> Vec<String> {
    let text = String::from_utf8(store.get(INDEX).unwrap()).unwrap();
    parse_index(&text)
        .unwrap()
        .iter()
        .filter_map(|i| i.file_name().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_delete_removes_object_and_entry() {
    let a = "2024-05-01 - A 日报.md";
    let b = "2024-05-02 - B 日报.md";
    let c = "2024-05-03 - C 日报.md";
    let store = seeded_store(&[a, c, b]);
    let sync = IndexSynchronizer::new(store.clone(), config());

    let outcome = sync.delete_report(Channel::Ai, b).await.unwrap();

    assert_eq!(outcome.object_name, format!("{}/{}", PREFIX, b));
    assert!(outcome.removed_from_index);
    assert_eq!(
        outcome.deleted_url.as_deref(),
        Some("https://cdn.example.com/daily-news/reports/2024-05-02%20-%20B%20%E6%97%A5%E6%8A%A5.md")
    );
    assert_eq!(
        outcome.index_url.as_deref(),
        Some("https://cdn.example.com/daily-news/reports/index.json")
    );
    assert!(!store.contains(&outcome.object_name));
    assert_eq!(index_names(&store), vec![c.to_string(), a.to_string()]);

    let doc: Value = serde_json::from_slice(&store.get(INDEX).unwrap()).unwrap();
    assert_eq!(doc["count"], 2);
    assert_eq!(doc["prefix"], PREFIX);
    assert_ne!(doc["generated_at"], "x");
    assert_eq!(doc["items"][0]["title"], c, "unknown fields preserved");

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["fileName"], b);
    assert_eq!(json["removedFromIndex"], true);
}

#[tokio::test]
async fn test_delete_unlisted_uses_derived_object_name() {
    let a = "2024-05-01 - A 日报.md";
    let store = seeded_store(&[a]);
    store.insert(&format!("{}/2024-05-09 - Z 日报.md", PREFIX), "body", "text/markdown");
    let sync = IndexSynchronizer::new(store.clone(), config());

    let outcome = sync
        .delete_report(Channel::Ai, "2024-05-09 - Z 日报.md")
        .await
        .unwrap();
    assert!(!outcome.removed_from_index);
    assert_eq!(outcome.object_name, format!("{}/2024-05-09 - Z 日报.md", PREFIX));
    assert!(!store.contains(&outcome.object_name));
    assert_eq!(index_names(&store), vec![a.to_string()]);
}

#[tokio::test]
async fn test_index_write_failure_is_hard_error() {
    let a = "2024-05-01 - A 日报.md";
    let store = seeded_store(&[a]);
    store.fail_puts(true);
    let sync = IndexSynchronizer::new(store.clone(), config());

    let err = sync.delete_report(Channel::Ai, a).await.unwrap_err();
    match err {
        SyncError::Store(e) => assert_eq!(e.status(), Some(503)),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(index_names(&store), vec![a.to_string()]);
}

#[tokio::test]
async fn test_concurrent_deletes_same_synchronizer() {
    let names = [
        "2024-05-01 - A 日报.md",
        "2024-05-02 - B 日报.md",
        "2024-05-03 - C 日报.md",
    ];
    let store = seeded_store(&names);
    let sync = Arc::new(IndexSynchronizer::new(store.clone(), config()));

    let s1 = sync.clone();
    let s2 = sync.clone();
    let (r1, r2) = tokio::join!(
        s1.delete_report(Channel::Ai, names[0]),
        s2.delete_report(Channel::Ai, names[2]),
    );
    r1.unwrap();
    r2.unwrap();

    assert_eq!(index_names(&store), vec![names[1].to_string()]);
}

/// Store wrapper that holds every index read at a barrier, so two writers
/// both read the index before either writes it back.
struct BarrierStore {
    inner: Arc<InMemoryObjectStore>,
    barrier: Barrier,
}

#[async_trait]
impl ObjectStore for BarrierStore {
    async fn get_object(
        &self,
        name: &str,
        on_missing: OnMissing,
    ) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let body = self.inner.get_object(name, on_missing).await?;
        if name.ends_with("index.json") {
            self.barrier.wait().await;
        }
        Ok(body)
    }

    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.inner.put_object(name, body, content_type).await
    }

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete_object(name).await
    }

    fn public_url(&self, name: &str) -> Option<String> {
        self.inner.public_url(name)
    }
}

/// Independent writers (separate processes in production) are not
/// coordinated: the last write wins and resurrects the other deletion's
/// entry even though its object is gone.
#[tokio::test]
async fn test_independent_writers_lose_update() {
    let names = [
        "2024-05-01 - A 日报.md",
        "2024-05-02 - B 日报.md",
        "2024-05-03 - C 日报.md",
    ];
    let inner = seeded_store(&names);
    let store = Arc::new(BarrierStore {
        inner: inner.clone(),
        barrier: Barrier::new(2),
    });
    let first = IndexSynchronizer::new(store.clone(), config());
    let second = IndexSynchronizer::new(store.clone(), config());

    let (r1, r2) = tokio::join!(
        first.delete_report(Channel::Ai, names[0]),
        second.delete_report(Channel::Ai, names[2]),
    );
    r1.unwrap();
    r2.unwrap();

    assert!(!inner.contains(&format!("{}/{}", PREFIX, names[0])));
    assert!(!inner.contains(&format!("{}/{}", PREFIX, names[2])));

    let remaining = index_names(&inner);
    assert_eq!(remaining.len(), 2, "one deletion was overwritten: {:?}", remaining);
    assert!(remaining.contains(&names[1].to_string()));
}
