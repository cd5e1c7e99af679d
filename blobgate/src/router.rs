//! HTTP router for the gateway

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use blobgate_core::{RequestId, REQUEST_ID_HEADER};
use blobgate_storage::BlobStorage;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{health, sas, upload};

/// Default container for uploads
pub const DEFAULT_CONTAINER: &str = "weez-file-webview";

/// Default request body limit: 512 MiB
pub const DEFAULT_BODY_LIMIT: usize = 512 * 1024 * 1024;

/// State shared by all handlers, immutable after startup
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn BlobStorage>,
    pub container: Arc<str>,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(storage: Arc<dyn BlobStorage>, container: impl Into<String>) -> Self {
        Self {
            storage,
            container: Arc::from(container.into()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Tag each request with a fresh ID and echo it on the response
async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::new();
    req.extensions_mut().insert(id.clone());

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/upload", post(upload::upload_file))
        .route("/generate-sas", post(sas::generate_sas))
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
