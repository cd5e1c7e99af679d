//! Client for the gateway endpoints

use reqwest::multipart::{Form, Part};
use reqwest::{header::HeaderMap, Client, Response};
use serde_json::Value;

/// Status, headers and JSON body of a gateway response
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    async fn read(response: Response) -> Result<Self, ClientError> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ClientError::ParseError(e.to_string()))?
        };
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// The `error` field of an error body
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Client for interacting with blobgate
pub struct GatewayClient {
    base_url: String,
    client: Client,
}

impl GatewayClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        ApiResponse::read(self.client.get(&url).send().await?).await
    }

    /// Upload a file as `username`
    pub async fn upload(
        &self,
        username: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<ApiResponse, ClientError> {
        let form = Form::new()
            .text("username", username.to_string())
            .part("file", Part::bytes(data).file_name(file_name.to_string()));
        self.upload_form(form).await
    }

    /// `POST /upload` with an arbitrary multipart form
    pub async fn upload_form(&self, form: Form) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/upload", self.base_url);
        ApiResponse::read(self.client.post(&url).multipart(form).send().await?).await
    }

    /// `POST /generate-sas` with a JSON body
    pub async fn generate_sas(&self, username: &str, filename: &str) -> Result<ApiResponse, ClientError> {
        self.generate_sas_json(&serde_json::json!({
            "username": username,
            "filename": filename,
        }))
        .await
    }

    /// `POST /generate-sas` with an arbitrary JSON body
    pub async fn generate_sas_json(&self, body: &Value) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/generate-sas", self.base_url);
        ApiResponse::read(self.client.post(&url).json(body).send().await?).await
    }

    /// `POST /generate-sas` with urlencoded form fields
    pub async fn generate_sas_form(&self, fields: &[(&str, &str)]) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/generate-sas", self.base_url);
        ApiResponse::read(self.client.post(&url).form(fields).send().await?).await
    }

    /// CORS preflight for `path` from `origin`
    pub async fn preflight(&self, path: &str, origin: &str) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .client
            .request(reqwest::Method::OPTIONS, &url)
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type")
            .send()
            .await?)
    }
}

#[derive(Debug)]
pub enum ClientError {
    RequestError(reqwest::Error),
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::RequestError(e) => write!(f, "Request error: {}", e),
            ClientError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::RequestError(e)
    }
}
