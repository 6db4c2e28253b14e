//! S3-compatible object store.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

use super::{ObjectMeta, ObjectStore, StoreError, StoredObject};
use crate::config::S3Config;

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }

    /// Builds a client from configuration. Without static credentials the
    /// default AWS provider chain is used.
    pub async fn from_config(config: &S3Config) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Backend)?;

        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .timeout_config(timeouts);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if config.has_static_credentials() {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "inkmark-config",
            ));
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self::from_client(S3Client::from_conf(s3_config)))
    }
}

/// Maps an SDK failure to a store error using the S3 error code, falling
/// back to the HTTP status for bodiless responses (HEAD).
fn classify_error<E>(err: &SdkError<E, HttpResponse>, bucket: &str, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    match (err.code(), status) {
        (Some("NoSuchBucket"), _) => StoreError::BucketNotFound(bucket.to_string()),
        (Some("NoSuchKey"), _) | (Some("NotFound"), _) | (_, Some(404)) => {
            StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        }
        (Some("AccessDenied"), _) | (_, Some(403)) => {
            StoreError::AccessDenied(format!("{}/{}", bucket, key))
        }
        _ => StoreError::Backend(DisplayErrorContext(err).to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_error(&e, bucket, key))?;

        Ok(ObjectMeta {
            size: response.content_length().and_then(|len| u64::try_from(len).ok()),
            content_type: response.content_type().map(str::to_string),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_error(&e, bucket, key))?;

        let content_type = response.content_type().map(str::to_string);
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to read S3 body: {e}")))?
            .into_bytes();

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| classify_error(&e, "", ""))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }
}
