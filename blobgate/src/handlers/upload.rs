//! `POST /upload`: store a file under the uploader's namespace

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::Response,
    Extension,
};
use blobgate_core::{GatewayError, KeyError, ObjectKey, RequestId};
use blobgate_storage::{byte_stream, BoxError, ByteStream, StorageError};
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{error_response, json_response, multipart_error};
use crate::router::AppState;

const MISSING_FIELDS: &str = "Username or file missing";

#[derive(Debug, Serialize)]
struct UploadResponse<'a> {
    message: &'static str,
    filename: &'a str,
}

/// Key for an upload, or the response rejecting it
fn object_key(request_id: &RequestId, username: &str, file_name: &str) -> Result<ObjectKey, Response> {
    ObjectKey::new(username, file_name).map_err(|e| match e {
        KeyError::EmptyUser | KeyError::EmptyFileName => {
            warn!(request_id = %request_id, "Upload missing username or file");
            error_response(&GatewayError::missing_field(MISSING_FIELDS))
        }
        e => {
            warn!(request_id = %request_id, error = %e, "Upload key rejected");
            error_response(&GatewayError::invalid_request(e.to_string()))
        }
    })
}

fn malformed(request_id: &RequestId, e: &MultipartError) -> Response {
    let error = multipart_error(e);
    warn!(request_id = %request_id, status = error.http_status(), error = %error.message, "Malformed upload body");
    error_response(&error)
}

/// Write `data` under `key` and report the outcome
async fn store(state: &AppState, request_id: &RequestId, key: &ObjectKey, data: ByteStream<'_>) -> Response {
    match state.storage.write(&state.container, key.as_str(), data).await {
        Ok(result) => {
            info!(
                request_id = %request_id,
                user = %key.user(),
                key = %key,
                container = %state.container,
                bytes = result.size,
                blocks = result.blocks,
                "File uploaded"
            );
            json_response(
                StatusCode::OK,
                &UploadResponse {
                    message: "File uploaded successfully",
                    filename: key.file_name(),
                },
            )
        }
        // The request body broke off mid-file: a client error, nothing was committed
        Err(StorageError::Body(source)) => match source.downcast_ref::<MultipartError>() {
            Some(e) => malformed(request_id, e),
            None => {
                warn!(request_id = %request_id, key = %key, error = %source, "Upload body failed");
                error_response(&GatewayError::invalid_request(source.to_string()))
            }
        },
        Err(e) => {
            error!(request_id = %request_id, key = %key, error = %e, "Upload failed");
            error_response(&GatewayError::storage(e.to_string()))
        }
    }
}

/// `POST /upload`
///
/// The first `username` and the first `file` part with a file name are used.
/// When `username` comes first the file is streamed into storage as it
/// arrives; a file sent ahead of the username is held until the key is known.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // Not a multipart body at all: there is no username and no file
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(request_id = %request_id, reason = %rejection.body_text(), "Upload rejected");
            return error_response(&GatewayError::missing_field(MISSING_FIELDS));
        }
    };

    let mut username: Option<String> = None;
    let mut held: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return malformed(&request_id, &e),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("username") if username.is_none() => match field.text().await {
                Ok(text) => username = Some(text),
                Err(e) => return malformed(&request_id, &e),
            },
            Some("file") if held.is_none() => {
                // A part without a file name is not a file
                let Some(file_name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string)
                else {
                    continue;
                };

                if let Some(username) = &username {
                    let key = match object_key(&request_id, username, &file_name) {
                        Ok(key) => key,
                        Err(response) => return response,
                    };
                    let data: ByteStream<'_> = Box::pin(field.map_err(|e| Box::new(e) as BoxError));
                    return store(&state, &request_id, &key, data).await;
                }

                match field.bytes().await {
                    Ok(data) => held = Some((file_name, data)),
                    Err(e) => return malformed(&request_id, &e),
                }
            }
            _ => {}
        }
    }

    let (Some(username), Some((file_name, data))) = (username, held) else {
        warn!(request_id = %request_id, "Upload missing username or file");
        return error_response(&GatewayError::missing_field(MISSING_FIELDS));
    };

    match object_key(&request_id, &username, &file_name) {
        Ok(key) => store(&state, &request_id, &key, byte_stream(data)).await,
        Err(response) => response,
    }
}
