//! Blob storage for blobgate
//!
//! This crate provides the storage client adapter the gateway talks to: a
//! `BlobStorage` trait, a REST backend for Azure Blob Storage and an
//! in-memory backend for development and tests.

pub mod storage;
pub mod xml;

pub use storage::{
    byte_stream, AzureBlobConfig, AzureBlobStorage, BlobProperties, BlobStorage, BoxError,
    ByteStream, EphemeralStorage, SignedUrl, StorageError, WriteResult,
};
