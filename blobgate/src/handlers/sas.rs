//! `POST /generate-sas`: issue a read-only URL for an uploaded file

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::Response,
    Extension,
};
use blobgate_core::{GatewayError, KeyError, ObjectKey, RequestId};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{error_response, json_response, multipart_error};
use crate::router::AppState;

/// Lifetime of an issued URL
pub const SAS_TTL: Duration = Duration::from_secs(3600);

const MISSING_FIELDS: &str = "Username and filename required";
const SIGNING_FAILED: &str = "Failed to generate access URL";

#[derive(Debug, Serialize)]
struct SasResponse<'a> {
    sas_url: &'a str,
}

/// `username` and `filename` from a JSON, urlencoded or multipart body.
///
/// Values are untrimmed; a field that is absent or not a string is `None`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SasParams {
    pub username: Option<String>,
    pub filename: Option<String>,
}

impl SasParams {
    fn from_json(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            Value::Object(map) if !map.is_empty() => {
                let field = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);
                Some(Self {
                    username: field("username"),
                    filename: field("filename"),
                })
            }
            _ => None,
        }
    }

    fn from_form(body: &[u8]) -> Self {
        let mut params = Self::default();
        for (name, value) in form_urlencoded::parse(body) {
            match name.as_ref() {
                "username" if params.username.is_none() => params.username = Some(value.into_owned()),
                "filename" if params.filename.is_none() => params.filename = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, GatewayError> {
        let mut params = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(&e))?
        {
            let name = field.name().map(str::to_string);
            let slot = match name.as_deref() {
                Some("username") if params.username.is_none() => &mut params.username,
                Some("filename") if params.filename.is_none() => &mut params.filename,
                _ => continue,
            };
            *slot = Some(
                field.text().await.map_err(|e| multipart_error(&e))?,
            );
        }

        Ok(params)
    }
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime == "application/json" || mime.ends_with("+json")
}

#[async_trait]
impl<S> FromRequest<S> for SasParams
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|r| {
                error_response(&GatewayError::body_rejected(r.status().as_u16(), r.body_text()))
            })?;
            return Self::from_multipart(multipart)
                .await
                .map_err(|e| error_response(&e));
        }

        let body = Bytes::from_request(req, state).await.map_err(|r| {
            error_response(&GatewayError::body_rejected(r.status().as_u16(), r.body_text()))
        })?;

        // A JSON body that does not decode to a non-empty object falls back to form fields
        if is_json(&content_type) {
            if let Some(params) = Self::from_json(&body) {
                return Ok(params);
            }
        }

        Ok(Self::from_form(&body))
    }
}

/// `POST /generate-sas`
pub async fn generate_sas(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: SasParams,
) -> Response {
    let username = params.username.unwrap_or_default();
    let filename = params.filename.unwrap_or_default();

    let key = match ObjectKey::new(&username, &filename) {
        Ok(key) => key,
        Err(KeyError::EmptyUser | KeyError::EmptyFileName) => {
            warn!(request_id = %request_id, "SAS request missing username or filename");
            return error_response(&GatewayError::missing_field(MISSING_FIELDS));
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "SAS key rejected");
            return error_response(&GatewayError::invalid_request(e.to_string()));
        }
    };

    match state.storage.exists(&state.container, key.as_str()).await {
        Ok(true) => {}
        Ok(false) => {
            info!(request_id = %request_id, key = %key, "SAS requested for missing file");
            return error_response(&GatewayError::not_found("File not found in storage"));
        }
        Err(e) => {
            error!(request_id = %request_id, key = %key, error = %e, "SAS generation error");
            return error_response(&GatewayError::storage(SIGNING_FAILED).with_details(e.to_string()));
        }
    }

    match state
        .storage
        .sign_read_url(&state.container, key.as_str(), SAS_TTL)
    {
        Ok(signed) => {
            info!(
                request_id = %request_id,
                user = %key.user(),
                key = %key,
                expires_on = %signed.expires_on,
                "Issued read-only URL"
            );
            json_response(
                StatusCode::OK,
                &SasResponse {
                    sas_url: signed.as_str(),
                },
            )
        }
        Err(e) => {
            error!(request_id = %request_id, key = %key, error = %e, "SAS generation error");
            error_response(&GatewayError::storage(SIGNING_FAILED).with_details(e.to_string()))
        }
    }
}
