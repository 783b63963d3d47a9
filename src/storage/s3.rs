use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{Client, presigning::PresigningConfig};

use super::{DocumentStore, StorageError, check_ttl};

/// Presigns document URLs against one S3 bucket.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
    ttl: Duration,
}

impl S3DocumentStore {
    pub fn new(client: Client, bucket: String, ttl: Duration) -> Result<Self, StorageError> {
        Ok(Self {
            client,
            bucket,
            ttl: check_ttl(ttl)?,
        })
    }

    /// Build a client from the shared AWS config, optionally pointed at a
    /// local S3-compatible endpoint.
    pub fn client_from_config(
        config: &aws_config::SdkConfig,
        endpoint_url: Option<&str>,
    ) -> Client {
        let mut builder = aws_sdk_s3::config::Builder::from(config);
        if let Some(endpoint) = endpoint_url {
            // Local stacks only serve path-style bucket addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Client::from_conf(builder.build())
    }

    fn presigning(&self, key: &str) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(self.ttl).map_err(|err| StorageError::Presign {
            key: key.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(self.presigning(key)?)
            .await
            .map_err(|err| StorageError::Presign {
                key: key.to_string(),
                message: err.to_string(),
            })?;

        tracing::debug!(key, bucket = %self.bucket, "Presigned document upload");
        Ok(request.uri().to_string())
    }

    async fn presign_download(&self, key: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning(key)?)
            .await
            .map_err(|err| StorageError::Presign {
                key: key.to_string(),
                message: err.to_string(),
            })?;

        tracing::debug!(key, bucket = %self.bucket, "Presigned document download");
        Ok(request.uri().to_string())
    }
}
