#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] runs the REAL kernel routes and state against a temporary
//! public root. Notifications come from a [`FakeSource`] the test controls;
//! backend HTTP calls go to an in-process axum server from [`spawn_backend`].

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tempfile::TempDir;
use tower::ServiceExt;

use painel_kernel::api::{ApiClient, Comment};
use painel_kernel::file::{DEFAULT_MAX_UPLOAD_SIZE, VideoNamePolicy};
use painel_kernel::notifications::{ActivityTotals, NotificationSource, RefreshMode};
use painel_kernel::{AppState, Config, routes};
use painel_test_utils::{MultipartBody, TestComment};

/// Configuration pointing at `public_dir` with a backend nobody listens on.
pub fn test_config(public_dir: &std::path::Path) -> Config {
    Config {
        port: 0,
        public_dir: public_dir.to_path_buf(),
        files_url: "/public".to_string(),
        max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        video_name_policy: VideoNamePolicy::Versioned,
        api_url: "http://127.0.0.1:9/api".to_string(),
        api_token: None,
        admin_username: None,
        admin_password: None,
        api_timeout: Duration::from_secs(5),
        // Long enough that only explicit refreshes run during a test.
        notification_poll_interval: Duration::from_secs(3600),
        notification_refresh_mode: RefreshMode::Merge,
        notification_activity: false,
        cors_allowed_origins: vec!["*".to_string()],
    }
}

/// Decode a fixture into the kernel's comment type.
pub fn comment(fixture: TestComment) -> Comment {
    serde_json::from_value(fixture.to_json()).expect("fixture should decode")
}

/// Notification source driven by the test.
#[derive(Default)]
pub struct FakeSource {
    comments: Mutex<Vec<Comment>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the pending comments returned by later loads.
    pub fn set_comments(&self, comments: Vec<Comment>) {
        *self.comments.lock() = comments;
    }

    /// Make later loads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every load by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of pending-comment fetches started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSource for FakeSource {
    async fn pending_comments(&self) -> Result<Vec<Comment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("backend unreachable");
        }
        Ok(self.comments.lock().clone())
    }

    async fn activity_totals(&self) -> Result<ActivityTotals> {
        Ok(ActivityTotals {
            users: 3,
            posts: 5,
            videos: 2,
        })
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub source: Arc<FakeSource>,
    pub public_dir: TempDir,
}

impl TestApp {
    /// Create a test application with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application, adjusting the configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        Self::with_source(FakeSource::new(), adjust).await
    }

    /// Create a test application reading notifications from `source`.
    ///
    /// Seed the source before calling this: the poller loads at startup.
    pub async fn with_source(source: Arc<FakeSource>, adjust: impl FnOnce(&mut Config)) -> Self {
        let public_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(public_dir.path());
        adjust(&mut config);

        let api = ApiClient::new(&config.api_url, config.api_timeout).expect("Failed to create client");
        let state = AppState::with_source(&config, api, source.clone())
            .await
            .expect("Failed to initialize AppState");

        let router = routes::app(state.clone());

        Self {
            router,
            state,
            source,
            public_dir,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// POST a multipart form to the upload endpoint.
    pub async fn upload(&self, form: MultipartBody) -> Response {
        let content_type = form.content_type();
        self.request(
            Request::post("/api/upload")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(form.finish()))
                .unwrap(),
        )
        .await
    }

    /// Load the current notifications now.
    pub async fn refresh(&self) {
        self.state
            .notifications()
            .refresh()
            .await
            .expect("poller should be running");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.state.shutdown();
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Read a response body as raw bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Serve `router` on an ephemeral local port and return its `/api` base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}/api")
}
