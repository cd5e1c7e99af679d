//! Storage account connection strings
//!
//! Format: `DefaultEndpointsProtocol=https;AccountName=NAME;AccountKey=KEY;EndpointSuffix=core.windows.net`
//! with an optional `BlobEndpoint=URL` overriding the derived endpoint.

use base64::Engine;
use thiserror::Error;
use url::Url;

/// Azurite development account name
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Azurite development account key (published, not a secret)
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Errors while parsing a connection string
#[derive(Debug, Error)]
pub enum ConnectionStringError {
    #[error("Connection string is empty")]
    Empty,

    #[error("Malformed connection string segment: '{0}'")]
    MalformedSegment(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("AccountKey is not valid base64: {0}")]
    InvalidAccountKey(#[from] base64::DecodeError),

    #[error("Invalid blob endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Credentials and endpoint of one storage account
#[derive(Clone)]
pub struct StorageCredentials {
    account_name: String,
    account_key: Vec<u8>,
    blob_endpoint: Url,
}

impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .finish()
    }
}

impl StorageCredentials {
    /// Build credentials from an account name, a base64 account key and a blob endpoint
    pub fn new(
        account_name: impl Into<String>,
        account_key_b64: &str,
        blob_endpoint: &str,
    ) -> Result<Self, ConnectionStringError> {
        let account_key = base64::engine::general_purpose::STANDARD.decode(account_key_b64.trim())?;
        let blob_endpoint =
            Url::parse(blob_endpoint).map_err(|e| ConnectionStringError::InvalidEndpoint {
                endpoint: blob_endpoint.to_string(),
                reason: e.to_string(),
            })?;

        if blob_endpoint.cannot_be_a_base() {
            return Err(ConnectionStringError::InvalidEndpoint {
                endpoint: blob_endpoint.to_string(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self {
            account_name: account_name.into(),
            account_key,
            blob_endpoint,
        })
    }

    /// Credentials of the Azurite development account
    pub fn development() -> Self {
        Self::development_with_endpoint(DEVELOPMENT_BLOB_ENDPOINT)
            .expect("development credentials are well formed")
    }

    /// Development account credentials against a custom blob endpoint
    pub fn development_with_endpoint(blob_endpoint: &str) -> Result<Self, ConnectionStringError> {
        Self::new(DEVELOPMENT_ACCOUNT_NAME, DEVELOPMENT_ACCOUNT_KEY, blob_endpoint)
    }

    /// Parse a connection string.
    ///
    /// Fields are matched by exact name; values are split at the first `=` so
    /// base64 padding in `AccountKey` is preserved. Unknown fields are ignored.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, ConnectionStringError> {
        let conn_str = conn_str.trim();
        if conn_str.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut blob_endpoint = None;
        let mut development = false;

        for segment in conn_str.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            let value = value.trim();

            match name.trim() {
                "AccountName" => account_name = Some(value),
                "AccountKey" => account_key = Some(value),
                "DefaultEndpointsProtocol" => protocol = Some(value),
                "EndpointSuffix" => suffix = Some(value),
                "BlobEndpoint" => blob_endpoint = Some(value),
                "UseDevelopmentStorage" => development = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if development {
            return Self::development_with_endpoint(blob_endpoint.unwrap_or(DEVELOPMENT_BLOB_ENDPOINT));
        }

        let account_name = account_name
            .filter(|v| !v.is_empty())
            .ok_or(ConnectionStringError::MissingField("AccountName"))?;
        let account_key = account_key
            .filter(|v| !v.is_empty())
            .ok_or(ConnectionStringError::MissingField("AccountKey"))?;

        let endpoint = match blob_endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => format!(
                "{}://{}.blob.{}",
                protocol.unwrap_or(DEFAULT_PROTOCOL),
                account_name,
                suffix.unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
            ),
        };

        Self::new(account_name, account_key, &endpoint)
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Decoded account key bytes, used as the HMAC key
    pub fn account_key(&self) -> &[u8] {
        &self.account_key
    }

    pub fn blob_endpoint(&self) -> &Url {
        &self.blob_endpoint
    }
}
