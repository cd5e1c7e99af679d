//! Core types for blobgate
//!
//! This crate provides the error taxonomy, object key type and request IDs
//! shared by the storage backends and the HTTP gateway.

pub mod error;
pub mod key;
pub mod request_id;

pub use error::{ErrorCode, GatewayError};
pub use key::{KeyError, ObjectKey};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
