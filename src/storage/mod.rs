//! Document object storage.
//!
//! Document bytes never pass through the API. Clients upload and download
//! directly against the bucket using short-lived presigned URLs handed out
//! by a [`DocumentStore`].

pub mod events;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;

/// Longest expiry S3 accepts for a presigned URL.
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("presigned url expiry must be between 1 second and 7 days, got {0:?}")]
    InvalidExpiry(Duration),

    #[error("failed to presign `{key}`: {message}")]
    Presign { key: String, message: String },
}

/// Validate a presigned URL lifetime.
pub fn check_ttl(ttl: Duration) -> Result<Duration, StorageError> {
    if ttl < Duration::from_secs(1) || ttl > MAX_PRESIGN_TTL {
        return Err(StorageError::InvalidExpiry(ttl));
    }
    Ok(ttl)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// URL the client PUTs the document bytes to.
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError>;

    /// URL the client GETs the document bytes from.
    async fn presign_download(&self, key: &str) -> Result<String, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_secs(1), true)]
    #[case(Duration::from_secs(900), true)]
    #[case(MAX_PRESIGN_TTL, true)]
    #[case(Duration::from_millis(500), false)]
    #[case(MAX_PRESIGN_TTL + Duration::from_secs(1), false)]
    fn ttl_bounds(#[case] ttl: Duration, #[case] valid: bool) {
        assert_eq!(check_ttl(ttl).is_ok(), valid);
    }
}
