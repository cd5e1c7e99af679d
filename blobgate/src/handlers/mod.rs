//! HTTP handlers for the gateway operations

pub mod health;
pub mod sas;
pub mod upload;

use axum::{
    body::Body,
    extract::multipart::MultipartError,
    http::{header, StatusCode},
    response::Response,
};
use blobgate_core::GatewayError;
use serde::Serialize;

/// Create a JSON response
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap_or_default()))
        .unwrap()
}

/// Map a gateway error to its HTTP response
pub(crate) fn error_response(error: &GatewayError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(error.to_json()))
        .unwrap()
}

/// A multipart body that could not be read; a length-limit failure stays 413
pub(crate) fn multipart_error(error: &MultipartError) -> GatewayError {
    GatewayError::body_rejected(error.status().as_u16(), error.body_text())
}

#[cfg(test)]
mod tests;
