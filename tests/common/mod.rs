#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{body::Body, http::Request, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use cidadao_api::app::{router, AppState};
use cidadao_api::config::UploadConfig;

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The full router on a real socket, in-memory storage, uploads in a temp dir
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub upload_dir: TempDir,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let upload_dir = TempDir::new().context("failed to create upload dir")?;
        let app = router(AppState::in_memory(&upload_config(&upload_dir)));

        let listener = TcpListener::bind("127.0.0.1:0").context("failed to bind test port")?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        // Each #[tokio::test] owns a runtime, so the shared server gets its own
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("test server runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("test server");
            });
        });

        Ok(Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            upload_dir,
        })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to start test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

fn upload_config(dir: &TempDir) -> UploadConfig {
    UploadConfig {
        directory: dir.path().to_path_buf(),
        preview_rows: 50,
        sample_rows: 5,
    }
}

/// Create a user and return a bearer token for it
pub async fn login_as(server: &TestServer, name: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let password = "s3cret-pass";

    let res = client
        .post(server.url("/users"))
        .json(&json!({ "name": name, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "user creation failed: {}",
        res.status()
    );

    let res = client
        .post(server.url("/login"))
        .form(&[("username", name), ("password", password)])
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    body["data"]["access_token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no access_token")
}

/// Minimal valid create payload
pub fn citizen_payload(name: &str, national_id: &str, neighborhood: &str) -> Value {
    json!({
        "full_name": name,
        "national_id": national_id,
        "neighborhood": neighborhood,
        "full_address": "Rua das Flores, 100",
    })
}

/// In-process router over the memory store, uploads in a fresh temp dir
pub fn memory_app() -> (Router, TempDir) {
    let dir = TempDir::new().expect("temp upload dir");
    let app = router(AppState::in_memory(&upload_config(&dir)));
    (app, dir)
}

/// Drive one request through the router, returning status and JSON body
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("valid status");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}
