//! Blob storage backends

mod azure;
mod ephemeral;
mod signing;
mod traits;


pub use azure::{AzureBlobConfig, AzureBlobStorage, API_VERSION};
pub use ephemeral::{BlobProperties, EphemeralStorage};
pub use traits::{byte_stream, BlobStorage, BoxError, ByteStream, SignedUrl, StorageError, WriteResult};
