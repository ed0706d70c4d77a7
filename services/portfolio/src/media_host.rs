//! Media host client
//!
//! The remote object store is opaque to the rest of the service: it takes
//! bytes (or a source URL) and returns a durable public URL plus an opaque
//! handle used for later deletion. The production implementation targets an
//! S3-compatible bucket; tests substitute their own implementation of
//! [`MediaHost`].

use anyhow::Result;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use uuid::Uuid;

/// Failures from the remote store
#[derive(Error, Debug)]
pub enum MediaHostError {
    #[error("upload to media host failed: {0}")]
    Upload(String),

    #[error("fetch from source url failed: {0}")]
    Fetch(String),

    #[error("delete from media host failed: {0}")]
    Delete(String),
}

/// Durable reference returned by a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Opaque handle needed to delete the object later
    pub media_id: String,
    /// Public URL serving the object
    pub url: String,
}

/// Contract the upload pipeline holds against the remote store
pub trait MediaHost: Send + Sync {
    /// Store raw bytes and return the durable reference
    async fn store_bytes(
        &self,
        bytes: Bytes,
        content_type: &str,
        extension: &str,
    ) -> Result<StoredMedia, MediaHostError>;

    /// Fetch a remote source URL and store its content
    async fn store_from_url(&self, source_url: &str) -> Result<StoredMedia, MediaHostError>;

    /// Remove a previously stored object
    async fn delete(&self, media_id: &str) -> Result<(), MediaHostError>;
}

/// Media host configuration
#[derive(Debug, Clone)]
pub struct MediaHostConfig {
    /// Bucket receiving uploads
    pub bucket: String,
    /// Base URL under which bucket objects are publicly served
    pub public_base_url: String,
    /// Key prefix for all objects written by this service
    pub key_prefix: String,
    /// Per-attempt timeout for remote calls, in seconds
    pub request_timeout: u64,
    /// Upload attempts before giving up
    pub max_attempts: u32,
}

impl MediaHostConfig {
    /// Create a new MediaHostConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MEDIA_BUCKET_NAME`: bucket receiving uploads (required)
    /// - `MEDIA_PUBLIC_BASE_URL`: public base URL of the bucket (required)
    /// - `MEDIA_KEY_PREFIX`: object key prefix (default: "portfolio")
    /// - `MEDIA_REQUEST_TIMEOUT`: per-attempt timeout in seconds (default: 30)
    /// - `MEDIA_MAX_ATTEMPTS`: upload attempts before giving up (default: 3)
    pub fn from_env() -> Result<Self> {
        let bucket = std::env::var("MEDIA_BUCKET_NAME")
            .map_err(|_| anyhow::anyhow!("MEDIA_BUCKET_NAME environment variable not set"))?;

        let public_base_url = std::env::var("MEDIA_PUBLIC_BASE_URL")
            .map_err(|_| anyhow::anyhow!("MEDIA_PUBLIC_BASE_URL environment variable not set"))?;

        let key_prefix =
            std::env::var("MEDIA_KEY_PREFIX").unwrap_or_else(|_| "portfolio".to_string());

        let request_timeout = std::env::var("MEDIA_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_attempts = std::env::var("MEDIA_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        Ok(MediaHostConfig {
            bucket,
            public_base_url,
            key_prefix,
            request_timeout,
            max_attempts,
        })
    }
}

/// S3-backed media host
#[derive(Clone)]
pub struct S3MediaHost {
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    config: MediaHostConfig,
}

impl S3MediaHost {
    pub fn new(client: aws_sdk_s3::Client, config: MediaHostConfig) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            config,
        }
    }

    fn object_key(&self, extension: &str) -> String {
        format!(
            "{}/{}.{}",
            self.config.key_prefix,
            Uuid::new_v4().simple(),
            extension
        )
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout)
    }
}

impl MediaHost for S3MediaHost {
    async fn store_bytes(
        &self,
        bytes: Bytes,
        content_type: &str,
        extension: &str,
    ) -> Result<StoredMedia, MediaHostError> {
        let key = self.object_key(extension);
        let mut attempt = 0;

        // Transient bucket failures are retried with exponential backoff.
        loop {
            attempt += 1;

            let send = self
                .client
                .put_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .content_type(content_type)
                .body(ByteStream::from(bytes.clone()))
                .send();

            let failure = match timeout(self.request_timeout(), send).await {
                Ok(Ok(_)) => {
                    info!("stored object {} after {} attempt(s)", key, attempt);
                    return Ok(StoredMedia {
                        url: self.public_url(&key),
                        media_id: key,
                    });
                }
                Ok(Err(e)) => format!("{}", DisplayErrorContext(e)),
                Err(_) => format!("timed out after {}s", self.config.request_timeout),
            };

            if attempt >= self.config.max_attempts {
                return Err(MediaHostError::Upload(format!(
                    "{} (after {} attempts)",
                    failure, attempt
                )));
            }

            warn!(
                "upload attempt {}/{} for {} failed: {}",
                attempt, self.config.max_attempts, key, failure
            );
            sleep(Duration::from_secs(2u64.pow(attempt))).await;
        }
    }

    async fn store_from_url(&self, source_url: &str) -> Result<StoredMedia, MediaHostError> {
        let response = timeout(self.request_timeout(), self.http.get(source_url).send())
            .await
            .map_err(|_| {
                MediaHostError::Fetch(format!(
                    "timed out after {}s",
                    self.config.request_timeout
                ))
            })?
            .and_then(|r| r.error_for_status())
            .map_err(|e| MediaHostError::Fetch(e.to_string()))?;

        if let Some(length) = response.content_length() {
            if length as usize > crate::validation::MAX_UPLOAD_BYTES {
                return Err(MediaHostError::Fetch("source exceeds upload limit".to_string()));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if !content_type.starts_with("image/") {
            return Err(MediaHostError::Fetch(format!(
                "source is not an image ({})",
                content_type
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaHostError::Fetch(e.to_string()))?;

        if bytes.len() > crate::validation::MAX_UPLOAD_BYTES {
            return Err(MediaHostError::Fetch("source exceeds upload limit".to_string()));
        }

        let extension = extension_for(&content_type);
        self.store_bytes(bytes, &content_type, extension).await
    }

    async fn delete(&self, media_id: &str) -> Result<(), MediaHostError> {
        let send = self
            .client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(media_id)
            .send();

        match timeout(self.request_timeout(), send).await {
            Ok(Ok(_)) => {
                info!("deleted object {}", media_id);
                Ok(())
            }
            Ok(Err(e)) => Err(MediaHostError::Delete(format!("{}", DisplayErrorContext(e)))),
            Err(_) => Err(MediaHostError::Delete(format!(
                "timed out after {}s",
                self.config.request_timeout
            ))),
        }
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "img",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/tiff"), "img");
    }

    #[test]
    #[serial]
    fn config_requires_bucket_and_base_url() {
        unsafe {
            std::env::remove_var("MEDIA_BUCKET_NAME");
            std::env::remove_var("MEDIA_PUBLIC_BASE_URL");
        }

        assert!(MediaHostConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn config_defaults() {
        unsafe {
            std::env::set_var("MEDIA_BUCKET_NAME", "portfolio-media");
            std::env::set_var("MEDIA_PUBLIC_BASE_URL", "https://cdn.example.com/");
            std::env::remove_var("MEDIA_KEY_PREFIX");
            std::env::remove_var("MEDIA_REQUEST_TIMEOUT");
            std::env::remove_var("MEDIA_MAX_ATTEMPTS");
        }

        let config = MediaHostConfig::from_env().unwrap();
        assert_eq!(config.bucket, "portfolio-media");
        assert_eq!(config.key_prefix, "portfolio");
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.max_attempts, 3);

        unsafe {
            std::env::remove_var("MEDIA_BUCKET_NAME");
            std::env::remove_var("MEDIA_PUBLIC_BASE_URL");
        }
    }
}
