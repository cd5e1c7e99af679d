//! Handler tests driving the router in-process

use super::*;
use crate::router::{create_router, AppState};
use async_trait::async_trait;
use axum::{http::Request, Router};
use blobgate_core::REQUEST_ID_HEADER;
use blobgate_storage::{
    BlobStorage, ByteStream, EphemeralStorage, SignedUrl, StorageError, WriteResult,
};
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use url::Url;

const CONTAINER: &str = "weez-file-webview";
const BOUNDARY: &str = "blobgate-test-boundary";

/// In-memory storage that counts calls and can be told to fail
#[derive(Default)]
struct RecordingStorage {
    inner: EphemeralStorage,
    writes: AtomicUsize,
    chunks: AtomicUsize,
    exists_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    fail_writes: bool,
    fail_exists: bool,
    fail_sign: bool,
}

impl RecordingStorage {
    fn failure() -> StorageError {
        StorageError::Service {
            status: 503,
            code: "ServerBusy".to_string(),
            message: "The server is busy".to_string(),
        }
    }
}

#[async_trait]
impl BlobStorage for RecordingStorage {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn write(
        &self,
        container: &str,
        key: &str,
        data: ByteStream<'_>,
    ) -> Result<WriteResult, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Self::failure());
        }
        let chunks = &self.chunks;
        let data = Box::pin(data.inspect_ok(move |_| {
            chunks.fetch_add(1, Ordering::SeqCst);
        }));
        self.inner.write(container, key, data).await
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists {
            return Err(Self::failure());
        }
        self.inner.exists(container, key).await
    }

    fn blob_url(&self, container: &str, key: &str) -> Result<Url, StorageError> {
        self.inner.blob_url(container, key)
    }

    fn sign_read_url(
        &self,
        container: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, StorageError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign {
            return Err(StorageError::Internal("signing key unavailable".to_string()));
        }
        self.inner.sign_read_url(container, key, ttl)
    }
}

fn app(storage: &Arc<RecordingStorage>) -> Router {
    create_router(AppState::new(storage.clone(), CONTAINER))
}

fn limited_app(storage: &Arc<RecordingStorage>, body_limit: usize) -> Router {
    create_router(AppState::new(storage.clone(), CONTAINER).with_body_limit(body_limit))
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, Option<&'a str>, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                let disposition = match file_name {
                    Some(file_name) => format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    ),
                    None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
                };
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[Part]) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(axum::body::Body::from(multipart_body(parts)))
        .unwrap()
}

/// Multipart request whose body arrives in `piece`-sized chunks with pauses between them
fn trickled_multipart_request(uri: &str, parts: &[Part], piece: usize) -> Request<axum::body::Body> {
    let pieces: Vec<Vec<u8>> = multipart_body(parts).chunks(piece).map(<[u8]>::to_vec).collect();
    let stream = futures::stream::unfold(pieces.into_iter(), |mut pieces| async move {
        let piece = pieces.next()?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Some((Ok::<_, std::io::Error>(Bytes::from(piece)), pieces))
    });

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(axum::body::Body::from_stream(stream))
        .unwrap()
}

fn request(uri: &str, content_type: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn upload(storage: &Arc<RecordingStorage>, user: &str, file: &str, data: &[u8]) {
    let (status, _) = send(
        app(storage),
        multipart_request(
            "/upload",
            &[Part::Text("username", user), Part::File("file", Some(file), data)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// HELPERS
// =============================================================================

mod response_tests {
    use super::*;
    use blobgate_core::GatewayError;

    #[tokio::test]
    async fn test_error_response_status_and_body() {
        let response = error_response(&GatewayError::not_found("File not found in storage"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"File not found in storage"}"#);
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(StatusCode::OK, &serde_json::json!({"sas_url": "x"}));
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"sas_url":"x"}"#);
    }
}

// =============================================================================
// ROUTER
// =============================================================================

mod router_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let storage = Arc::new(RecordingStorage::default());
        let req = Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap();

        let (status, json) = send(app(&storage), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "running");
        assert_eq!(json["storage"], "recording");
        assert_eq!(json["container"], CONTAINER);
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let storage = Arc::new(RecordingStorage::default());
        let req = Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app(&storage).oneshot(req).await.unwrap();
        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(id.len(), 32);
    }

    #[tokio::test]
    async fn test_cors_preflight_any_origin() {
        let storage = Arc::new(RecordingStorage::default());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/generate-sas")
            .header(header::ORIGIN, "https://viewer.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app(&storage).oneshot(req).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let storage = Arc::new(RecordingStorage::default());
        let req = Request::builder()
            .uri("/upload")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app(&storage).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

// =============================================================================
// UPLOAD
// =============================================================================

mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_success() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some("notes.txt"), b"hello"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "File uploaded successfully");
        assert_eq!(json["filename"], "notes.txt");
        assert_eq!(
            storage.inner.get(CONTAINER, "alice/notes.txt").unwrap(),
            Bytes::from("hello")
        );
    }

    #[tokio::test]
    async fn test_upload_file_before_username() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, _) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[
                    Part::File("file", Some("a.bin"), &[0, 1, 2, 255]),
                    Part::Text("username", "bob"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            storage.inner.get(CONTAINER, "bob/a.bin").unwrap(),
            Bytes::from_static(&[0, 1, 2, 255])
        );
    }

    #[tokio::test]
    async fn test_upload_trims_username() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "  alice \t", "notes.txt", b"x").await;
        assert!(storage.inner.get(CONTAINER, "alice/notes.txt").is_some());
    }

    #[tokio::test]
    async fn test_upload_empty_file_is_stored() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "empty.txt", b"").await;
        assert_eq!(
            storage.inner.get(CONTAINER, "alice/empty.txt").unwrap(),
            Bytes::new()
        );
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "a.txt", b"first").await;
        upload(&storage, "alice", "a.txt", b"second").await;

        assert_eq!(
            storage.inner.get(CONTAINER, "alice/a.txt").unwrap(),
            Bytes::from("second")
        );
        assert_eq!(storage.inner.blob_count(CONTAINER), 1);
    }

    #[tokio::test]
    async fn test_upload_missing_username() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request("/upload", &[Part::File("file", Some("a.txt"), b"x")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username or file missing");
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_blank_username() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[
                    Part::Text("username", "   "),
                    Part::File("file", Some("a.txt"), b"x"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username or file missing");
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request("/upload", &[Part::Text("username", "alice")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username or file missing");
    }

    #[tokio::test]
    async fn test_upload_file_part_without_name() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[Part::Text("username", "alice"), Part::File("file", None, b"x")],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username or file missing");
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_not_multipart() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            request("/upload", "application/json", r#"{"username":"alice"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username or file missing");
    }

    #[tokio::test]
    async fn test_upload_malformed_multipart() {
        let storage = Arc::new(RecordingStorage::default());
        let req = request(
            "/upload",
            &format!("multipart/form-data; boundary={}", BOUNDARY),
            &format!("--{}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice", BOUNDARY),
        );

        let (status, json) = send(app(&storage), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_dot_segment_file_name() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some(".."), b"x"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_ne!(json["error"], "Username or file missing");
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_is_streamed_in_chunks() {
        let storage = Arc::new(RecordingStorage::default());
        let data: Vec<u8> = (0..16 * 1024).map(|i| (i % 251) as u8).collect();

        let (status, _) = send(
            app(&storage),
            trickled_multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some("big.bin"), &data),
                ],
                1024,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(storage.chunks.load(Ordering::SeqCst) > 1);
        assert_eq!(
            storage.inner.get(CONTAINER, "alice/big.bin").unwrap(),
            Bytes::from(data)
        );
    }

    #[tokio::test]
    async fn test_upload_over_body_limit_is_413() {
        let storage = Arc::new(RecordingStorage::default());
        let data = vec![0u8; 64 * 1024];

        let (status, json) = send(
            limited_app(&storage, 1024),
            multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some("big.bin"), &data),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json["error"].is_string());
        assert_eq!(storage.inner.blob_count(CONTAINER), 0);
    }

    #[tokio::test]
    async fn test_upload_over_body_limit_while_streaming_is_413() {
        let storage = Arc::new(RecordingStorage::default());
        let data = vec![7u8; 8 * 1024];

        let (status, json) = send(
            limited_app(&storage, 2048),
            trickled_multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some("big.bin"), &data),
                ],
                512,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json["error"].is_string());
        assert_eq!(storage.inner.blob_count(CONTAINER), 0);
    }

    #[tokio::test]
    async fn test_upload_storage_failure() {
        let storage = Arc::new(RecordingStorage {
            fail_writes: true,
            ..RecordingStorage::default()
        });
        let (status, json) = send(
            app(&storage),
            multipart_request(
                "/upload",
                &[
                    Part::Text("username", "alice"),
                    Part::File("file", Some("a.txt"), b"x"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("The server is busy"));
        assert!(json.get("details").is_none());
    }
}

// =============================================================================
// SIGN
// =============================================================================

mod sas_tests {
    use super::*;

    fn sas_url(json: &Value) -> Url {
        Url::parse(json["sas_url"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_sas_from_json() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "notes.txt", b"hello").await;

        let (status, json) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":"alice","filename":"notes.txt"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let url = sas_url(&json);
        let base = storage.inner.blob_url(CONTAINER, "alice/notes.txt").unwrap();
        assert_eq!(url.path(), base.path());

        let query: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(query["sp"], "r");
        assert_eq!(query["sr"], "b");
        assert!(query.contains_key("se"));
        assert!(query.contains_key("sig"));
        assert_eq!(storage.sign_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sas_from_form() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "bob smith", "report.pdf", b"%PDF").await;

        let (status, json) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/x-www-form-urlencoded",
                "username=bob+smith&filename=report.pdf",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(sas_url(&json).path().ends_with("/bob%20smith/report.pdf"));
    }

    #[tokio::test]
    async fn test_sas_from_multipart() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "notes.txt", b"hello").await;

        let (status, _) = send(
            app(&storage),
            multipart_request(
                "/generate-sas",
                &[
                    Part::Text("username", "alice"),
                    Part::Text("filename", "notes.txt"),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sas_trims_inputs() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "notes.txt", b"hello").await;

        let (status, _) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":" alice ","filename":"\tnotes.txt\n"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sas_missing_fields_skip_storage() {
        let storage = Arc::new(RecordingStorage::default());

        for body in [
            r#"{"username":"alice"}"#,
            r#"{"filename":"notes.txt"}"#,
            r#"{"username":"   ","filename":"notes.txt"}"#,
            r#"{"username":42,"filename":"notes.txt"}"#,
        ] {
            let (status, json) =
                send(app(&storage), request("/generate-sas", "application/json", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(json["error"], "Username and filename required");
        }

        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(storage.sign_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sas_invalid_json() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            request("/generate-sas", "application/json", "{not json"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username and filename required");
    }

    #[tokio::test]
    async fn test_sas_over_body_limit_is_413() {
        let storage = Arc::new(RecordingStorage::default());
        let body = format!(
            r#"{{"username":"alice","filename":"notes.txt","pad":"{}"}}"#,
            "x".repeat(4096)
        );

        let (status, json) = send(
            limited_app(&storage, 1024),
            request("/generate-sas", "application/json", &body),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json["error"].is_string());
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sas_not_found_skips_signing() {
        let storage = Arc::new(RecordingStorage::default());
        let (status, json) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":"alice","filename":"missing.txt"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "File not found in storage");
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.sign_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sas_is_scoped_to_user() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "notes.txt", b"hello").await;

        let (status, _) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":"bob","filename":"notes.txt"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sas_existence_failure() {
        let storage = Arc::new(RecordingStorage {
            fail_exists: true,
            ..RecordingStorage::default()
        });
        let (status, json) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":"alice","filename":"notes.txt"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to generate access URL");
        assert!(json["details"].as_str().unwrap().contains("ServerBusy"));
        assert_eq!(storage.sign_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sas_signing_failure() {
        let storage = Arc::new(RecordingStorage {
            fail_sign: true,
            ..RecordingStorage::default()
        });
        upload(&storage, "alice", "notes.txt", b"hello").await;

        let (status, json) = send(
            app(&storage),
            request(
                "/generate-sas",
                "application/json",
                r#"{"username":"alice","filename":"notes.txt"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to generate access URL");
        assert!(json["details"]
            .as_str()
            .unwrap()
            .contains("signing key unavailable"));
    }

    #[tokio::test]
    async fn test_sas_each_request_signs_fresh() {
        let storage = Arc::new(RecordingStorage::default());
        upload(&storage, "alice", "notes.txt", b"hello").await;

        for _ in 0..2 {
            let (status, _) = send(
                app(&storage),
                request(
                    "/generate-sas",
                    "application/json",
                    r#"{"username":"alice","filename":"notes.txt"}"#,
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 2);
        assert_eq!(storage.sign_calls.load(Ordering::SeqCst), 2);
    }
}
