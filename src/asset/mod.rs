//! Asset resolution: fetch an object and classify it.
//!
//! Classification is by key suffix only. The size ceiling is checked against
//! the store's metadata before the body is downloaded, and again against the
//! downloaded length for stores that report no size.

use bytes::Bytes;
use std::sync::Arc;

use crate::constants::DEFAULT_PASSTHROUGH_CONTENT_TYPE;
use crate::error::RenderError;
use crate::store::{ObjectStore, StoreError};

/// What the render pipeline does with an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Pdf,
    Image,
    /// Returned byte-for-byte, never watermarked
    Passthrough,
}

impl AssetKind {
    pub fn classify(key: &str) -> Self {
        let extension = key
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => AssetKind::Pdf,
            "jpg" | "jpeg" | "png" | "gif" | "webp" => AssetKind::Image,
            _ => AssetKind::Passthrough,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Pdf => "pdf",
            AssetKind::Image => "image",
            AssetKind::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub kind: AssetKind,
    pub bytes: Bytes,
    /// Store-declared type, or `application/octet-stream`
    pub content_type: String,
}

impl ResolvedAsset {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub struct AssetResolver {
    store: Arc<dyn ObjectStore>,
    max_object_bytes: u64,
}

impl AssetResolver {
    pub fn new(store: Arc<dyn ObjectStore>, max_object_bytes: u64) -> Self {
        Self {
            store,
            max_object_bytes,
        }
    }

    pub async fn fetch(&self, bucket: &str, key: &str) -> Result<ResolvedAsset, RenderError> {
        let kind = AssetKind::classify(key);

        let meta = match self.store.head(bucket, key).await {
            Ok(meta) => meta,
            Err(e) => return Err(self.store_error(bucket, key, e).await),
        };
        if let Some(size) = meta.size {
            self.check_size(size)?;
        }

        let object = match self.store.get(bucket, key).await {
            Ok(object) => object,
            Err(e) => return Err(self.store_error(bucket, key, e).await),
        };
        self.check_size(object.bytes.len() as u64)?;

        let content_type = object
            .content_type
            .or(meta.content_type)
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PASSTHROUGH_CONTENT_TYPE.to_string());

        tracing::debug!(
            bucket = %bucket,
            file = %key,
            kind = kind.as_str(),
            size = object.bytes.len(),
            store = self.store.name(),
            "Fetched asset"
        );

        Ok(ResolvedAsset {
            kind,
            bytes: object.bytes,
            content_type,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), RenderError> {
        if size > self.max_object_bytes {
            return Err(RenderError::PayloadTooLarge {
                size,
                max: self.max_object_bytes,
            });
        }
        Ok(())
    }

    async fn store_error(&self, bucket: &str, key: &str, err: StoreError) -> RenderError {
        match err {
            StoreError::ObjectNotFound { .. } | StoreError::BucketNotFound(_) => {
                self.not_found(bucket, key, err).await
            }
            StoreError::InvalidKey(k) => RenderError::BadRequest(format!("Invalid object key '{}'", k)),
            StoreError::AccessDenied(_) | StoreError::Backend(_) => {
                tracing::error!(bucket = %bucket, file = %key, error = %err, "Object store request failed");
                RenderError::StoreUnavailable(err.to_string())
            }
        }
    }

    /// Builds a not-found message that says whether the bucket or the file
    /// is missing, listing the available buckets in the former case.
    async fn not_found(&self, bucket: &str, key: &str, err: StoreError) -> RenderError {
        let file_missing = || {
            RenderError::NotFound(format!("File '{}' not found in bucket '{}'", key, bucket))
        };

        match self.store.list_buckets().await {
            Ok(buckets) if buckets.iter().any(|b| b == bucket) => file_missing(),
            Ok(buckets) => {
                let available = if buckets.is_empty() {
                    "(none)".to_string()
                } else {
                    buckets.join(", ")
                };
                RenderError::NotFound(format!(
                    "Bucket '{}' not found. Available buckets: {}",
                    bucket, available
                ))
            }
            Err(list_err) => {
                tracing::debug!(error = %list_err, "Could not list buckets for not-found diagnostics");
                match err {
                    StoreError::BucketNotFound(_) => {
                        RenderError::NotFound(format!("Bucket '{}' not found", bucket))
                    }
                    _ => file_missing(),
                }
            }
        }
    }
}
