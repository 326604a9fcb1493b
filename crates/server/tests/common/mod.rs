//! Common test utilities for in-process API testing with mocks.
//!
//! [`TestFixture`] builds the full router around a [`MockEncoder`], with
//! upload and converted directories inside a temp dir, so every endpoint can
//! be exercised without ffmpeg or pandoc.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sizefit_core::{
    create_event_system, Config, Dispatcher, EncoderCapabilities, EventSink, EventStore,
    JobRunner, JobsConfig, MemoryEventStore, ServerConfig, StorageConfig,
};
use sizefit_server::api::create_router;
use sizefit_server::state::AppState;

pub use sizefit_core::testing::{fixtures, MockEncoder};

/// In-process server backed by a mock encoder.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock encoder shared by every media category
    pub encoder: MockEncoder,
    pub event_store: Arc<dyn EventStore>,
    /// Holds the upload and converted directories
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_encoder(MockEncoder::new(), JobsConfig::default()).await
    }

    pub async fn with_encoder(encoder: MockEncoder, jobs_config: JobsConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                max_upload_mb: 1,
            },
            storage: StorageConfig {
                upload_dir: temp_dir.path().join("uploads"),
                converted_dir: temp_dir.path().join("converted"),
            },
            jobs: jobs_config.clone(),
            ..Default::default()
        };
        std::fs::create_dir_all(&config.storage.upload_dir).unwrap();
        std::fs::create_dir_all(&config.storage.converted_dir).unwrap();

        let event_store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new(1000));
        let (event_handle, event_writer) = create_event_system(Arc::clone(&event_store), 100);
        tokio::spawn(event_writer.run());

        let sink: Arc<dyn EventSink> = Arc::new(event_handle);
        let dispatcher = Arc::new(Dispatcher::with_encoder(encoder.clone(), Arc::clone(&sink)));
        let jobs = JobRunner::new(jobs_config, dispatcher, sink);

        let capabilities = EncoderCapabilities::from_encoder_list("h264_nvenc");
        let state = Arc::new(AppState::new(
            config,
            jobs,
            Arc::clone(&event_store),
            capabilities,
        ));

        Self {
            router: create_router(state),
            encoder,
            event_store,
            temp_dir,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    pub fn converted_dir(&self) -> PathBuf {
        self.temp_dir.path().join("converted")
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    /// POST a multipart form
    pub async fn post_form(&self, path: &str, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.request(request).await
    }

    /// Execute a request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }

    /// Poll a job until it finishes.
    pub async fn wait_for_job(&self, job_id: &str) -> TestResponse {
        let path = format!("/api/v1/jobs/{}", job_id);
        for _ in 0..200 {
            let response = self.get(&path).await;
            if response.body["status"]["state"] == "finished" {
                return response;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }
}

/// Hand-built multipart/form-data body.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "sizefit-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// Assert that a response has a specific status code
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
