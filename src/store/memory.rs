//! In-memory object store with call counters.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ObjectMeta, ObjectStore, StoreError, StoredObject};

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Bytes,
    content_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: BTreeMap<String, BTreeMap<String, MemoryObject>>,
    deny_listing: bool,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.buckets.entry(bucket.into()).or_default();
        self
    }

    pub fn with_object(
        mut self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> Self {
        self.buckets.entry(bucket.into()).or_default().insert(
            key.into(),
            MemoryObject {
                bytes: bytes.into(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    /// Make `list_buckets` fail, as a store without list permission would.
    pub fn with_listing_denied(mut self) -> Self {
        self.deny_listing = true;
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Total operations served
    pub fn total_calls(&self) -> usize {
        self.head_calls() + self.get_calls() + self.list_calls()
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<&MemoryObject, StoreError> {
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects.get(key).ok_or_else(|| StoreError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let object = self.lookup(bucket, key)?;
        Ok(ObjectMeta {
            size: Some(object.bytes.len() as u64),
            content_type: object.content_type.clone(),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let object = self.lookup(bucket, key)?;
        Ok(StoredObject {
            bytes: object.bytes.clone(),
            content_type: object.content_type.clone(),
        })
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_listing {
            return Err(StoreError::AccessDenied("ListBuckets".to_string()));
        }
        Ok(self.buckets.keys().cloned().collect())
    }
}
