//! Local filesystem object store: `<root>/<bucket>/<key>`.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{guess_content_type, ObjectMeta, ObjectStore, StoreError, StoredObject};

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a bucket/key pair to a path under the root, rejecting
    /// anything that could escape it.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let bucket_path = self.bucket_path(bucket)?;
        if key.is_empty() || key.contains('\0') || key.contains('\\') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let key_path = Path::new(key);
        if !key_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(bucket_path.join(key_path))
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        if bucket.is_empty()
            || bucket.contains(['/', '\\', '\0'])
            || bucket == "."
            || bucket == ".."
        {
            return Err(StoreError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    /// Distinguishes a missing bucket from a missing key.
    async fn not_found(&self, bucket: &str, key: &str) -> StoreError {
        match self.bucket_path(bucket) {
            Ok(path) if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) => {
                StoreError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            }
            Ok(_) => StoreError::BucketNotFound(bucket.to_string()),
            Err(e) => e,
        }
    }

    async fn map_io_error(&self, err: std::io::Error, bucket: &str, key: &str) -> StoreError {
        match err.kind() {
            ErrorKind::NotFound => self.not_found(bucket, key).await,
            ErrorKind::PermissionDenied => StoreError::AccessDenied(format!("{}/{}", bucket, key)),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = self.object_path(bucket, key)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => return Err(self.map_io_error(e, bucket, key).await),
        };
        if !metadata.is_file() {
            return Err(self.not_found(bucket, key).await);
        }
        Ok(ObjectMeta {
            size: Some(metadata.len()),
            content_type: guess_content_type(key).map(str::to_string),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let path = self.object_path(bucket, key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => return Err(self.map_io_error(e, bucket, key).await),
        };
        Ok(StoredObject {
            bytes: Bytes::from(data),
            content_type: guess_content_type(key).map(str::to_string),
        })
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::Backend(format!("{}: {}", self.root.display(), e)))?;

        let mut buckets = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    buckets.push(name.to_string());
                }
            }
        }
        buckets.sort();
        Ok(buckets)
    }
}
