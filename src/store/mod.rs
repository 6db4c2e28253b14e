//! Object store abstraction.
//!
//! The render pipeline only needs three operations from a store: the size
//! and declared type of an object, its bytes, and the list of buckets (for
//! not-found diagnostics). Backends:
//!
//! - [`S3ObjectStore`] - any S3-compatible service via `aws-sdk-s3`
//! - [`FsObjectStore`] - directories on local disk, one per bucket
//! - [`InMemoryObjectStore`] - fixed contents with call counters, for tests

pub mod fs;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    #[error("bucket '{0}' not found")]
    BucketNotFound(String),

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ObjectNotFound { .. } | StoreError::BucketNotFound(_)
        )
    }
}

/// Size and declared type of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// Bytes of a stored object plus its declared type
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;
}

/// Builds the configured backend.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config.backend {
        StorageBackend::S3 => Ok(Arc::new(S3ObjectStore::from_config(&config.s3).await?)),
        StorageBackend::Filesystem => {
            let fs = config.filesystem.as_ref().ok_or_else(|| {
                StoreError::Backend("storage.filesystem.root is required".to_string())
            })?;
            Ok(Arc::new(FsObjectStore::new(&fs.root)))
        }
    }
}

/// Content type implied by a key's extension, for backends that store none.
pub fn guess_content_type(key: &str) -> Option<&'static str> {
    let extension = key.rsplit_once('.')?.1.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "mp4" => "video/mp4",
        _ => return None,
    };
    Some(content_type)
}
