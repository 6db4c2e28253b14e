//! Object store configuration types.
//!
//! Two backends are supported:
//!
//! - **s3**: any S3-compatible endpoint. Buckets are addressed per request,
//!   so only the connection settings live here.
//! - **filesystem**: each top-level directory under `root` is a bucket.
//!   Intended for local development and tests.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_S3_TIMEOUT_SECS;

fn default_s3_timeout() -> u64 {
    DEFAULT_S3_TIMEOUT_SECS
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3Config {
    #[serde(default)]
    pub region: String,
    /// Custom endpoint (MinIO, LocalStack, Supabase storage, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Static access key. Leave empty together with `secret_key` to use the
    /// default AWS credential chain.
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub force_path_style: bool,
    #[serde(default = "default_s3_timeout")]
    pub timeout: u64,
}

impl S3Config {
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.region.trim().is_empty() {
            return Err("storage.s3.region is required for the s3 backend".to_string());
        }
        if self.access_key.is_empty() != self.secret_key.is_empty() {
            return Err(
                "storage.s3.access_key and storage.s3.secret_key must be set together".to_string(),
            );
        }
        if self.timeout == 0 {
            return Err("storage.s3.timeout must be > 0 seconds".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemConfig>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            StorageBackend::S3 => self.s3.validate(),
            StorageBackend::Filesystem => match &self.filesystem {
                Some(fs) if !fs.root.trim().is_empty() => Ok(()),
                _ => Err(
                    "storage.filesystem.root is required for the filesystem backend".to_string(),
                ),
            },
        }
    }
}
