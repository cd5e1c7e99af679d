//! Azure Storage authentication for blobgate
//!
//! Parses account connection strings, signs Blob service requests with
//! Shared Key authorization and issues service SAS tokens.

pub mod connection_string;
pub mod sas;
pub mod shared_key;

pub use connection_string::{ConnectionStringError, StorageCredentials};
pub use sas::{BlobSasBuilder, BlobSasPermissions, SasError, SasProtocol, SasToken, SAS_VERSION};
pub use shared_key::authorization_header;
