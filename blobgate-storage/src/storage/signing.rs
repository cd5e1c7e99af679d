//! Blob URLs and read-only SAS URLs shared by the backends

use blobgate_auth::{BlobSasBuilder, BlobSasPermissions, StorageCredentials};
use blobgate_core::KeyError;
use chrono::{SubsecRound, Utc};
use std::time::Duration;
use url::Url;

use super::traits::{SignedUrl, StorageError};

/// `<endpoint>/<container>/<key>`, each key segment percent-encoded
pub(crate) fn blob_url(endpoint: &Url, container: &str, key: &str) -> Result<Url, StorageError> {
    if container.is_empty() {
        return Err(StorageError::Internal("container name is empty".to_string()));
    }
    if let Some(segment) = key.split('/').find(|s| *s == "." || *s == "..") {
        return Err(KeyError::DotSegment(segment.to_string()).into());
    }

    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| StorageError::Internal(format!("blob endpoint {} has no path", endpoint)))?
        .pop_if_empty()
        .push(container)
        .extend(key.split('/'));

    Ok(url)
}

/// Sign a read-only SAS for `container/key`, valid from now for `ttl`
pub(crate) fn sign_read_url(
    credentials: &StorageCredentials,
    container: &str,
    key: &str,
    ttl: Duration,
) -> Result<SignedUrl, StorageError> {
    let mut url = blob_url(credentials.blob_endpoint(), container, key)?;

    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| StorageError::Internal(format!("SAS lifetime out of range: {}", e)))?;
    let expiry = (Utc::now() + ttl).trunc_subsecs(0);

    let token =
        BlobSasBuilder::new(container, key, BlobSasPermissions::read_only(), expiry).sign(credentials)?;
    url.set_query(Some(token.as_str()));

    Ok(SignedUrl {
        url,
        permissions: token.permissions(),
        expires_on: token.expiry(),
    })
}
