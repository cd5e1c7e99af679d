//! Test utilities for blobgate
//!
//! Provides utilities for end-to-end testing of the gateway:
//! - Run the gateway in-process on a random port
//! - Inspect what the in-memory backend stored
//! - Client helpers for each endpoint
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blobgate_test::TestServer;
//!
//! #[tokio::test]
//! async fn test_upload() {
//!     let server = TestServer::start().await.unwrap();
//!     let client = server.client();
//!
//!     let response = client.upload("alice", "notes.txt", b"hello".to_vec()).await.unwrap();
//!     assert_eq!(response.status, 200);
//! }
//! ```

pub mod client;
pub mod server;

pub use client::{ApiResponse, ClientError, GatewayClient};
pub use server::{TestError, TestServer};

/// Timeout for waiting on the server
pub const STARTUP_TIMEOUT_SECS: u64 = 10;
