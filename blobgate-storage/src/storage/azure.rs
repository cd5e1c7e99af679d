//! Azure Blob Storage backend over the REST API

use super::signing;
use super::traits::*;
use crate::xml;
use async_trait::async_trait;
use base64::Engine;
use blobgate_auth::{authorization_header, StorageCredentials};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use md5::{Digest, Md5};
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Service version sent with every request
pub const API_VERSION: &str = "2022-11-02";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_SINGLE_PUT_LIMIT: usize = 64 * 1024 * 1024;
const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Tuning for the REST backend
#[derive(Debug, Clone)]
pub struct AzureBlobConfig {
    /// Whole-request timeout of the HTTP client
    pub timeout: Duration,
    /// Largest payload written with a single Put Blob
    pub single_put_limit: usize,
    /// Block size for staged writes
    pub block_size: usize,
}

impl Default for AzureBlobConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            single_put_limit: DEFAULT_SINGLE_PUT_LIMIT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Blob storage backed by an Azure Storage account
pub struct AzureBlobStorage {
    client: reqwest::Client,
    credentials: StorageCredentials,
    config: AzureBlobConfig,
}

impl std::fmt::Debug for AzureBlobStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStorage")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish()
    }
}

impl AzureBlobStorage {
    pub fn new(credentials: StorageCredentials, config: AzureBlobConfig) -> Result<Self, StorageError> {
        if config.block_size == 0 {
            return Err(StorageError::Internal("block size must be positive".to_string()));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            credentials,
            config,
        })
    }

    pub fn from_connection_string(
        conn_str: &str,
        config: AzureBlobConfig,
    ) -> Result<Self, StorageError> {
        Self::new(StorageCredentials::from_connection_string(conn_str)?, config)
    }

    pub fn credentials(&self) -> &StorageCredentials {
        &self.credentials
    }

    /// Send a signed request
    async fn send(
        &self,
        method: Method,
        url: Url,
        mut headers: Vec<(String, String)>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, StorageError> {
        let request_id = Uuid::new_v4().to_string();
        headers.push(("x-ms-version".to_string(), API_VERSION.to_string()));
        headers.push((
            "x-ms-date".to_string(),
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ));
        headers.push(("x-ms-client-request-id".to_string(), request_id.clone()));

        // The transport sets Content-Length from the body; it still has to be signed
        let mut signed_headers = headers.clone();
        if let Some(body) = &body {
            signed_headers.push(("Content-Length".to_string(), body.len().to_string()));
        }
        let authorization =
            authorization_header(&self.credentials, method.as_str(), &url, &signed_headers);

        debug!(method = %method, path = %url.path(), request_id = %request_id, "Blob service request");

        let mut request = self.client.request(method, url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.header("Authorization", authorization);
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    /// Turn a non-success response into a service error
    async fn service_error(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let header_code = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let parsed = xml::parse_error(&body).unwrap_or_default();

        let code = header_code
            .or(parsed.code)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        let message = parsed
            .message
            .map(|m| m.lines().next().unwrap_or_default().to_string())
            .unwrap_or_else(|| status.to_string());

        StorageError::Service {
            status: status.as_u16(),
            code,
            message,
        }
    }

    fn etag(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn content_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }

    async fn put_blob(&self, url: Url, data: Bytes) -> Result<WriteResult, StorageError> {
        let size = data.len() as u64;
        let headers = vec![
            ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
            ("Content-MD5".to_string(), Self::content_md5(&data)),
        ];

        let response = self.send(Method::PUT, url, headers, Some(data)).await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }

        Ok(WriteResult {
            etag: Self::etag(&response),
            size,
            blocks: 0,
        })
    }

    /// Stage one block of a staged write
    async fn put_block(
        &self,
        url: &Url,
        upload: &mut StagedUpload,
        block: Bytes,
    ) -> Result<(), StorageError> {
        let block_id = upload.next_id();

        let mut block_url = url.clone();
        block_url
            .query_pairs_mut()
            .append_pair("comp", "block")
            .append_pair("blockid", &block_id);

        let size = block.len() as u64;
        let headers = vec![("Content-MD5".to_string(), Self::content_md5(&block))];
        let response = self.send(Method::PUT, block_url, headers, Some(block)).await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }

        upload.block_ids.push(block_id);
        upload.size += size;
        Ok(())
    }

    /// Commit the staged blocks in order
    async fn put_block_list(&self, url: Url, upload: StagedUpload) -> Result<WriteResult, StorageError> {
        let mut list_url = url;
        list_url.query_pairs_mut().append_pair("comp", "blocklist");
        let body = Bytes::from(xml::format_block_list(&upload.block_ids));
        let headers = vec![
            ("Content-Type".to_string(), "application/xml".to_string()),
            ("Content-MD5".to_string(), Self::content_md5(&body)),
        ];

        let response = self.send(Method::PUT, list_url, headers, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }

        Ok(WriteResult {
            etag: Self::etag(&response),
            size: upload.size,
            blocks: upload.block_ids.len(),
        })
    }
}

/// Blocks staged so far by one write
struct StagedUpload {
    /// Fixed-length id prefix, unique to this write
    prefix: String,
    block_ids: Vec<String>,
    size: u64,
}

impl StagedUpload {
    fn new() -> Self {
        Self {
            prefix: Uuid::new_v4().simple().to_string(),
            block_ids: Vec::new(),
            size: 0,
        }
    }

    fn next_id(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}-{:06}", self.prefix, self.block_ids.len()))
    }
}

#[async_trait]
impl BlobStorage for AzureBlobStorage {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn write(
        &self,
        container: &str,
        key: &str,
        mut data: ByteStream<'_>,
    ) -> Result<WriteResult, StorageError> {
        let url = self.blob_url(container, key)?;
        let block_size = self.config.block_size;

        // Buffer up to the single-put limit, then stage full blocks as they fill
        let mut pending = BytesMut::new();
        let mut staged: Option<StagedUpload> = None;

        while let Some(chunk) = data.next().await {
            pending.extend_from_slice(&chunk.map_err(StorageError::Body)?);
            if staged.is_none() && pending.len() <= self.config.single_put_limit {
                continue;
            }

            let upload = staged.get_or_insert_with(StagedUpload::new);
            while pending.len() >= block_size {
                let block = pending.split_to(block_size).freeze();
                self.put_block(&url, upload, block).await?;
            }
        }

        match staged {
            None => self.put_blob(url, pending.freeze()).await,
            Some(mut upload) => {
                if !pending.is_empty() {
                    self.put_block(&url, &mut upload, pending.freeze()).await?;
                }
                debug!(blocks = upload.block_ids.len(), bytes = upload.size, "Committing block list");
                self.put_block_list(url, upload).await
            }
        }
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError> {
        let url = self.blob_url(container, key)?;
        let response = self.send(Method::HEAD, url, Vec::new(), None).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::service_error(response).await),
        }
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
