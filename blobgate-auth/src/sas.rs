//! Blob service shared access signatures

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::shared_key::sign;
use crate::StorageCredentials;

/// Service version the SAS is signed for
pub const SAS_VERSION: &str = "2022-11-02";

/// Signed resource type for a single blob
const SIGNED_RESOURCE_BLOB: &str = "b";

/// Query values keep only unreserved characters
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Errors while building a SAS token
#[derive(Debug, Error)]
pub enum SasError {
    #[error("SAS grants no permissions")]
    NoPermissions,

    #[error("SAS expiry {expiry} is not after its start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    },
}

/// Permissions granted by a blob SAS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobSasPermissions {
    pub read: bool,
    pub add: bool,
    pub create: bool,
    pub write: bool,
    pub delete: bool,
}

impl BlobSasPermissions {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Permission string in the canonical `racwd` order
    pub fn as_sp(&self) -> String {
        [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
        ]
        .iter()
        .filter(|(granted, _)| *granted)
        .map(|(_, c)| *c)
        .collect()
    }
}

/// Protocols a SAS may be used over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasProtocol {
    Https,
    HttpsAndHttp,
}

impl SasProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::HttpsAndHttp => "https,http",
        }
    }
}

/// Format a timestamp the way SAS fields expect: `2026-10-19T11:00:00Z`
pub fn format_sas_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Builder for a service SAS scoped to one blob
#[derive(Debug, Clone)]
pub struct BlobSasBuilder<'a> {
    container: &'a str,
    blob: &'a str,
    permissions: BlobSasPermissions,
    start: Option<DateTime<Utc>>,
    expiry: DateTime<Utc>,
    protocol: Option<SasProtocol>,
}

impl<'a> BlobSasBuilder<'a> {
    pub fn new(
        container: &'a str,
        blob: &'a str,
        permissions: BlobSasPermissions,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            container,
            blob,
            permissions,
            start: None,
            expiry,
            protocol: None,
        }
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn protocol(mut self, protocol: SasProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Create the string to sign for service version 2020-12-06 and later
    pub fn string_to_sign(&self, account_name: &str) -> String {
        let start = self.start.as_ref().map(format_sas_time).unwrap_or_default();
        let canonicalized_resource =
            format!("/blob/{}/{}/{}", account_name, self.container, self.blob);

        [
            self.permissions.as_sp().as_str(),
            start.as_str(),
            format_sas_time(&self.expiry).as_str(),
            canonicalized_resource.as_str(),
            "", // signed identifier
            "", // signed IP
            self.protocol.map(|p| p.as_str()).unwrap_or_default(),
            SAS_VERSION,
            SIGNED_RESOURCE_BLOB,
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n")
    }

    /// Sign with the account key and assemble the query string
    pub fn sign(&self, credentials: &StorageCredentials) -> Result<SasToken, SasError> {
        if self.permissions.is_empty() {
            return Err(SasError::NoPermissions);
        }
        if let Some(start) = self.start {
            if start >= self.expiry {
                return Err(SasError::InvalidWindow {
                    start,
                    expiry: self.expiry,
                });
            }
        }

        let signature = sign(
            credentials.account_key(),
            &self.string_to_sign(credentials.account_name()),
        );

        let mut fields: Vec<(&str, String)> = vec![("sp", self.permissions.as_sp())];
        if let Some(start) = &self.start {
            fields.push(("st", format_sas_time(start)));
        }
        fields.push(("se", format_sas_time(&self.expiry)));
        if let Some(protocol) = self.protocol {
            fields.push(("spr", protocol.as_str().to_string()));
        }
        fields.push(("sv", SAS_VERSION.to_string()));
        fields.push(("sr", SIGNED_RESOURCE_BLOB.to_string()));
        fields.push(("sig", signature));

        let query = fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, utf8_percent_encode(value, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(SasToken {
            query,
            permissions: self.permissions,
            expiry: self.expiry,
        })
    }
}

/// A signed SAS query string
#[derive(Debug, Clone)]
pub struct SasToken {
    query: String,
    permissions: BlobSasPermissions,
    expiry: DateTime<Utc>,
}

impl SasToken {
    /// The query string, without a leading `?`
    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub fn permissions(&self) -> BlobSasPermissions {
        self.permissions
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }
}

impl std::fmt::Display for SasToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.query)
    }
}
