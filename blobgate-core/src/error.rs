//! Gateway error types and formatting

use serde::Serialize;
use thiserror::Error;

/// Error kinds surfaced to HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A required input was absent or empty after trimming
    MissingField,
    /// The request body could not be decoded, or named an unaddressable key
    InvalidRequest,
    /// The request body exceeded the configured limit
    PayloadTooLarge,
    /// The referenced object does not exist
    NotFound,
    /// The object store rejected or failed the operation
    StorageError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "MissingField",
            Self::InvalidRequest => "InvalidRequest",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::NotFound => "NotFound",
            Self::StorageError => "StorageError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingField | Self::InvalidRequest => 400,
            Self::NotFound => 404,
            Self::PayloadTooLarge => 413,
            Self::StorageError => 500,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a gateway operation.
///
/// `message` is what the client sees under the `error` key. `details` carries
/// the underlying cause when the message is a generic one.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingField, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Error for a request body that could not be read, keeping a 413 status
    pub fn body_rejected(status: u16, message: impl Into<String>) -> Self {
        match status {
            413 => Self::payload_too_large(message),
            _ => Self::invalid_request(message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Format as the JSON error body: `{"error": ..., "details": ...}`
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            error: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<&'a str>,
        }

        let error = JsonError {
            error: &self.message,
            details: self.details.as_deref(),
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(r#"{{"error":"{}"}}"#, self.code.as_str())
        })
    }
}
