//! blobgate: upload files to Azure Blob Storage and hand out read-only links
//!
//! The library exposes the router and its state so the binary and the
//! integration tests build the same application.

pub mod config;
pub mod handlers;
pub mod router;

pub use config::{Backend, Config};
pub use handlers::sas::SAS_TTL;
pub use router::{create_router, AppState, DEFAULT_BODY_LIMIT, DEFAULT_CONTAINER};
