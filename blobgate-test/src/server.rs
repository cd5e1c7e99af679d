//! In-process test server

use blobgate::{create_router, AppState, DEFAULT_CONTAINER};
use blobgate_storage::EphemeralStorage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::STARTUP_TIMEOUT_SECS;

/// A running gateway backed by in-memory storage
pub struct TestServer {
    /// The task serving requests
    handle: JoinHandle<()>,
    /// The address the server listens on
    addr: SocketAddr,
    /// Base URL
    base_url: String,
    storage: Arc<EphemeralStorage>,
    container: String,
}

impl TestServer {
    /// Start a gateway on a random port with default settings
    pub async fn start() -> Result<Self, TestError> {
        Self::start_with(DEFAULT_CONTAINER, blobgate::DEFAULT_BODY_LIMIT).await
    }

    /// Start a gateway writing to `container` with a request body limit
    pub async fn start_with(container: &str, body_limit: usize) -> Result<Self, TestError> {
        let storage = Arc::new(EphemeralStorage::new());
        let state = AppState::new(storage.clone(), container).with_body_limit(body_limit);
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| TestError::StartFailed(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| TestError::StartFailed(e.to_string()))?;

        info!(addr = %addr, "Starting blobgate test server");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Test server stopped");
            }
        });

        // Wait for server to be ready
        let base_url = format!("http://{}", addr);
        let health = format!("{}/health", base_url);
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_secs(STARTUP_TIMEOUT_SECS) {
            if let Ok(response) = reqwest::get(&health).await {
                if response.status().is_success() {
                    info!(addr = %addr, "blobgate ready");
                    return Ok(Self {
                        handle,
                        addr,
                        base_url,
                        storage,
                        container: container.to_string(),
                    });
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        handle.abort();
        Err(TestError::StartupTimeout)
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// The backend the server writes to
    pub fn storage(&self) -> &EphemeralStorage {
        &self.storage
    }

    /// Get a client for the server
    pub fn client(&self) -> crate::GatewayClient {
        crate::GatewayClient::new(self.base_url.clone())
    }

    /// Stop the server
    pub fn stop(&self) {
        info!("Stopping blobgate test server");
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with test server
#[derive(Debug)]
pub enum TestError {
    StartFailed(String),
    StartupTimeout,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::StartFailed(msg) => write!(f, "Failed to start server: {}", msg),
            TestError::StartupTimeout => write!(f, "Server startup timed out"),
        }
    }
}

impl std::error::Error for TestError {}
