//! Liveness endpoint

use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;

use super::json_response;
use crate::router::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    storage: &'static str,
    container: &'a str,
}

/// `GET /health`. Does not touch the store.
pub async fn health_check(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "running",
            storage: state.storage.name(),
            container: &state.container,
        },
    )
}
