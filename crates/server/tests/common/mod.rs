//! Common test utilities for API testing with mocks.
//!
//! Builds the real router over a render service whose browser, network and
//! ffmpeg collaborators are all mocks, so requests run in-process.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sketchloop_core::{
    testing::{MockLauncher, SessionScript},
    Config,
};

/// Re-export fixtures for test convenience
pub use sketchloop_core::testing::fixtures;

use fixtures::{fast_settings, MockPipeline};

const BOUNDARY: &str = "sketchloop-test-boundary";

/// Test fixture with controllable mocks behind the router.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_render() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post_render(&[Part::image("cat.png", b"...")]).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock browser, retriever, transcoder and job store
    pub mocks: MockPipeline,
    /// Temporary directory holding the storage root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response, for non-JSON endpoints
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// One multipart form field.
pub struct Part {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

impl Part {
    pub fn image(file_name: &str, data: &[u8]) -> Self {
        Self {
            name: "image".to_string(),
            file_name: Some(file_name.to_string()),
            data: data.to_vec(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            file_name: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

impl TestFixture {
    /// Fixture whose browser session walks the wizard cleanly.
    pub fn new() -> Self {
        Self::with_script(SessionScript::happy("XYZ", "foo"))
    }

    pub fn with_script(script: SessionScript) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage_root = temp_dir.path().join("storage");

        let mocks = MockPipeline::new(MockLauncher::new(script));
        let settings = fast_settings(&storage_root);

        let config = Config {
            storage: settings.storage.clone(),
            wizard: settings.wizard.clone(),
            retriever: settings.retriever.clone(),
            ..Default::default()
        };

        let render = Arc::new(mocks.service(settings).with_picker(|_| 0));
        let state = Arc::new(sketchloop_server::state::AppState::new(config, render));
        let router = sketchloop_server::api::create_router(state);

        Self {
            router,
            mocks,
            temp_dir,
        }
    }

    /// Path under the storage root.
    pub fn storage(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join("storage").join(relative)
    }

    /// Send a GET request and parse the JSON body.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await.into_json()
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart form to /api/render.
    pub async fn post_render(&self, parts: &[Part]) -> TestResponse {
        self.send(render_request(parts)).await.into_json()
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            content_type,
            body,
        }
    }
}

impl RawResponse {
    fn into_json(self) -> TestResponse {
        let body: Value = if self.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.body).unwrap_or(Value::Null)
        };
        TestResponse {
            status: self.status,
            body,
        }
    }
}

/// Multipart POST to /api/render.
pub fn render_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/render")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match &part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: image/png\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
