//! In-memory [`ObjectStore`] for tests.
//!
//! Objects live in a `HashMap` behind `std::sync::RwLock`. Every delete is
//! recorded so tests can assert which objects were removed, and writes can
//! be switched to fail to exercise error propagation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::{canonical_object_name, object_url, ObjectStore, ObjectStoreError, OnMissing};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    deletes: Mutex<Vec<String>>,
    fail_puts: AtomicBool,
    public_base: Option<String>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public URLs are derived from `base` (otherwise `public_url` is `None`).
    pub fn with_public_base(base: impl Into<String>) -> Self {
        Self {
            public_base: Some(base.into()),
            ..Self::default()
        }
    }

    /// Seed an object without going through the trait.
    pub fn insert(&self, name: &str, body: impl Into<Vec<u8>>, content_type: &str) {
        self.objects.write().unwrap().insert(
            name.trim_start_matches('/').to_string(),
            StoredObject {
                body: body.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(name.trim_start_matches('/'))
            .map(|o| o.body.clone())
    }

    pub fn content_type(&self, name: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(name.trim_start_matches('/'))
            .map(|o| o.content_type.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Object names passed to `delete_object`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    /// Make every subsequent `put_object` fail with HTTP 503.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(
        &self,
        name: &str,
        on_missing: OnMissing,
    ) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let object = canonical_object_name(name)?;
        match self.get(&object) {
            Some(body) => Ok(Some(body)),
            None if on_missing == OnMissing::Empty => Ok(None),
            None => Err(ObjectStoreError::Status {
                op: "GetObject",
                object,
                status: 404,
                body: "NoSuchKey".to_string(),
            }),
        }
    }

    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let object = canonical_object_name(name)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Status {
                op: "PutObject",
                object,
                status: 503,
                body: "ServiceUnavailable".to_string(),
            });
        }
        self.insert(&object, body, content_type);
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError> {
        let object = canonical_object_name(name)?;
        self.deletes.lock().unwrap().push(object.clone());
        self.objects.write().unwrap().remove(&object);
        Ok(())
    }

    fn public_url(&self, name: &str) -> Option<String> {
        let object = canonical_object_name(name).ok()?;
        self.public_base.as_deref().map(|b| object_url(b, &object))
    }
}
