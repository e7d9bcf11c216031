//! Scriptable fake of the analysis backend
//!
//! Runs an axum router on an ephemeral local port. Tests script the replies
//! through [`FakeState`] and inspect what the client sent afterwards.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Canned HTTP reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One upload as seen by the backend
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedUpload {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Scripted behavior and recorded traffic
pub struct FakeState {
    pub credentials: Mutex<Option<(String, String, String)>>,
    pub upload_reply: Mutex<Reply>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    /// Set to park upload requests until `release_upload` is notified
    pub hold_uploads: AtomicBool,
    pub upload_received: Notify,
    pub release_upload: Notify,

    /// Server-side pending notification set
    pub pending: Mutex<Vec<Value>>,
    /// Replaces the `/notifications/latest` body when set
    pub latest_override: Mutex<Option<Value>>,
    /// Delay between reading the pending set and responding
    pub latest_delay: Mutex<Duration>,
    pub latest_read: Notify,
    pub latest_queries: Mutex<Vec<Option<String>>>,
    pub latest_auth: Mutex<Vec<Option<String>>>,

    pub dismiss_status: Mutex<StatusCode>,
    pub dismissed: Mutex<Vec<Value>>,
    pub dismiss_auth: Mutex<Vec<Option<String>>>,

    pub artifact: Mutex<Vec<u8>>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            credentials: Mutex::new(None),
            upload_reply: Mutex::new(Reply::ok(json!({}))),
            uploads: Mutex::new(Vec::new()),
            hold_uploads: AtomicBool::new(false),
            upload_received: Notify::new(),
            release_upload: Notify::new(),
            pending: Mutex::new(Vec::new()),
            latest_override: Mutex::new(None),
            latest_delay: Mutex::new(Duration::ZERO),
            latest_read: Notify::new(),
            latest_queries: Mutex::new(Vec::new()),
            latest_auth: Mutex::new(Vec::new()),
            dismiss_status: Mutex::new(StatusCode::OK),
            dismissed: Mutex::new(Vec::new()),
            dismiss_auth: Mutex::new(Vec::new()),
            artifact: Mutex::new(b"amended contract text".to_vec()),
        }
    }
}

/// Running fake backend
pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let router = Router::new()
            .route("/login", post(login))
            .route("/upload", post(upload))
            .route("/notifications/latest", get(latest))
            .route("/notifications/dismiss", post(dismiss))
            .route("/download/amended", get(download))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Accept `email`/`password` and issue `token`
    pub fn accept_login(&self, email: &str, password: &str, token: &str) {
        *self.state.credentials.lock().unwrap() =
            Some((email.to_string(), password.to_string(), token.to_string()));
    }

    pub fn set_upload_reply(&self, reply: Reply) {
        *self.state.upload_reply.lock().unwrap() = reply;
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn set_pending(&self, notifications: Vec<Value>) {
        *self.state.pending.lock().unwrap() = notifications;
    }

    pub fn pending(&self) -> Vec<Value> {
        self.state.pending.lock().unwrap().clone()
    }

    pub fn set_latest_override(&self, body: Option<Value>) {
        *self.state.latest_override.lock().unwrap() = body;
    }

    pub fn set_latest_delay(&self, delay: Duration) {
        *self.state.latest_delay.lock().unwrap() = delay;
    }

    pub fn set_dismiss_status(&self, status: StatusCode) {
        *self.state.dismiss_status.lock().unwrap() = status;
    }

    pub fn dismissed(&self) -> Vec<Value> {
        self.state.dismissed.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Notification record as the backend produces it
pub fn notification(message: &str, timestamp: &str) -> Value {
    json!({"message": message, "timestamp": timestamp})
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn respond(reply: &Reply) -> Response {
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body.clone(),
    )
        .into_response()
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let expected = state.credentials.lock().unwrap().clone();
    match expected {
        Some((email, password, token))
            if body["email"] == json!(email) && body["password"] == json!(password) =>
        {
            Json(json!({"token": token})).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )
            .into_response(),
    }
}

async fn upload(State(state): State<Arc<FakeState>>, headers: HeaderMap, body: Bytes) -> Response {
    state.uploads.lock().unwrap().push(RecordedUpload {
        authorization: authorization(&headers),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });
    state.upload_received.notify_one();

    if state.hold_uploads.load(Ordering::SeqCst) {
        state.release_upload.notified().await;
    }

    let reply = state.upload_reply.lock().unwrap().clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    respond(&reply)
}

async fn latest(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    uri: axum::http::Uri,
) -> Response {
    state
        .latest_queries
        .lock()
        .unwrap()
        .push(uri.query().map(str::to_string));
    state.latest_auth.lock().unwrap().push(authorization(&headers));

    let override_body = state.latest_override.lock().unwrap().clone();
    let body = match override_body {
        Some(body) => body,
        None => json!({"notifications": state.pending.lock().unwrap().clone()}),
    };
    state.latest_read.notify_one();

    let delay = *state.latest_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Json(body).into_response()
}

async fn dismiss(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.dismiss_auth.lock().unwrap().push(authorization(&headers));
    let status = *state.dismiss_status.lock().unwrap();
    if !status.is_success() {
        return (status, Json(json!({"error": "dismiss failed"}))).into_response();
    }

    let timestamp = body["timestamp"].clone();
    let removed = {
        let mut pending = state.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|n| n["timestamp"] != timestamp);
        pending.len() != before
    };
    state.dismissed.lock().unwrap().push(timestamp);
    Json(json!({"ok": true, "removed": removed})).into_response()
}

async fn download(State(state): State<Arc<FakeState>>) -> Response {
    let artifact = state.artifact.lock().unwrap().clone();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        artifact,
    )
        .into_response()
}
