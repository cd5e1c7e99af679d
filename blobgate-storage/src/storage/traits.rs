//! Storage backend traits

use async_trait::async_trait;
use blobgate_auth::{BlobSasPermissions, ConnectionStringError, SasError};
use blobgate_core::KeyError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Error raised by the source of a write body
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of a write, consumed chunk by chunk as it arrives
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + 'a>>;

/// A complete buffer as a one-chunk body
pub fn byte_stream(data: impl Into<Bytes>) -> ByteStream<'static> {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] ConnectionStringError),

    /// The body stream failed before the write completed; nothing was committed
    #[error("Failed to read upload body: {0}")]
    Body(#[source] BoxError),

    #[error("Request to storage failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage service returned {status} {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to sign access URL: {0}")]
    Signing(#[from] SasError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result of a write
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub etag: Option<String>,
    pub size: u64,
    /// Number of staged blocks, zero for a single put
    pub blocks: usize,
}

/// A read-only URL for one blob
#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: Url,
    pub permissions: BlobSasPermissions,
    pub expires_on: DateTime<Utc>,
}

impl SignedUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Blob store the gateway writes to and signs URLs for
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Short name of the backend, reported by the health endpoint
    fn name(&self) -> &'static str;

    /// Stream `data` into `container/key`, replacing any existing blob.
    ///
    /// The blob is only replaced once the stream has ended without error.
    async fn write(
        &self,
        container: &str,
        key: &str,
        data: ByteStream<'_>,
    ) -> Result<WriteResult, StorageError>;

    /// Whether `container/key` exists. A missing container counts as missing.
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError>;

    /// URL of `container/key` without any query string
    fn blob_url(&self, container: &str, key: &str) -> Result<Url, StorageError>;

    /// Read-only SAS URL for `container/key`, valid from now for `ttl`
    fn sign_read_url(
        &self,
        container: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, StorageError>;
}
