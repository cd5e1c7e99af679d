//! In-memory ephemeral storage backend

use super::signing;
use super::traits::*;
use async_trait::async_trait;
use blobgate_auth::StorageCredentials;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use md5::{Digest, Md5};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// In-memory stored blob
struct InMemoryBlob {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

/// Properties of a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub size: u64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

/// In-memory container
struct InMemoryContainer {
    blobs: DashMap<String, InMemoryBlob>,
}

impl InMemoryContainer {
    fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }
}

/// Ephemeral (in-memory) storage backend
///
/// Containers are created on first write. URLs are signed with the
/// configured credentials, the Azurite development account by default.
pub struct EphemeralStorage {
    containers: DashMap<String, Arc<InMemoryContainer>>,
    credentials: StorageCredentials,
}

impl Default for EphemeralStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStorage {
    pub fn new() -> Self {
        Self::with_credentials(StorageCredentials::development())
    }

    pub fn with_credentials(credentials: StorageCredentials) -> Self {
        Self {
            containers: DashMap::new(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &StorageCredentials {
        &self.credentials
    }

    /// Content of a stored blob
    pub fn get(&self, container: &str, key: &str) -> Option<Bytes> {
        let container = self.containers.get(container)?;
        let blob = container.blobs.get(key)?;
        Some(blob.data.clone())
    }

    /// Size, ETag and modification time of a stored blob
    pub fn properties(&self, container: &str, key: &str) -> Option<BlobProperties> {
        let container = self.containers.get(container)?;
        let blob = container.blobs.get(key)?;
        Some(BlobProperties {
            size: blob.data.len() as u64,
            etag: blob.etag.clone(),
            last_modified: blob.last_modified,
        })
    }

    /// Number of blobs in a container
    pub fn blob_count(&self, container: &str) -> usize {
        self.containers
            .get(container)
            .map_or(0, |c| c.blobs.len())
    }

    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        format!("\"{}\"", hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl BlobStorage for EphemeralStorage {
    fn name(&self) -> &'static str {
        "ephemeral"
    }

    async fn write(
        &self,
        container: &str,
        key: &str,
        mut data: ByteStream<'_>,
    ) -> Result<WriteResult, StorageError> {
        if container.is_empty() {
            return Err(StorageError::Internal("container name is empty".to_string()));
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = data.next().await {
            buf.extend_from_slice(&chunk.map_err(StorageError::Body)?);
        }
        let data = buf.freeze();

        let container_ref = self
            .containers
            .entry(container.to_string())
            .or_insert_with(|| Arc::new(InMemoryContainer::new()))
            .clone();

        let etag = Self::compute_etag(&data);
        let size = data.len() as u64;

        container_ref.blobs.insert(
            key.to_string(),
            InMemoryBlob {
                data,
                etag: etag.clone(),
                last_modified: Utc::now(),
            },
        );

        Ok(WriteResult {
            etag: Some(etag),
            size,
            blocks: 0,
        })
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .containers
            .get(container)
            .is_some_and(|c| c.blobs.contains_key(key)))
    }

    fn blob_url(&self, container: &str, key: &str) -> Result<Url, StorageError> {
        signing::blob_url(self.credentials.blob_endpoint(), container, key)
    }

    fn sign_read_url(
        &self,
        container: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, StorageError> {
        signing::sign_read_url(&self.credentials, container, key, ttl)
    }
}
