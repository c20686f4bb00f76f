//! Client for the content backend's REST API.
//!
//! Every request carries the stored bearer token. A 401 from any endpoint
//! discards the token and moves the session to [`SessionState::Expired`];
//! there is no refresh flow, the operator has to log in again.

mod error;
mod resources;
pub mod types;

pub use error::ApiError;
pub use resources::{Auth, Categories, Comments, Posts, Users, Videos};
pub use types::{
    Category, CategoryInput, Comment, LoginResponse, NewUser, Page, Pagination, Post, PostInput,
    User, UserUpdate, Video, VideoInput,
};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

/// Authentication state as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token held.
    Anonymous,
    /// A token is held and attached to requests.
    Authenticated,
    /// The backend rejected the token; it has been discarded.
    Expired,
}

/// Bearer token storage shared by clones of the client.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Remove the token, returning whether one was held.
    pub fn clear(&self) -> bool {
        self.token.write().take().is_some()
    }
}

/// REST client for the content backend.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    session: watch::Sender<SessionState>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        // Validate once; endpoints are built by string concatenation.
        Url::parse(base_url)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        let (session, _) = watch::channel(SessionState::Anonymous);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                tokens: TokenStore::default(),
                session,
            }),
        })
    }

    /// Use `token` for subsequent requests.
    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.tokens.set(token);
        self.inner.session.send_replace(SessionState::Authenticated);
    }

    /// Forget the current token without marking the session expired.
    pub fn clear_token(&self) {
        self.inner.tokens.clear();
        self.inner.session.send_replace(SessionState::Anonymous);
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner.tokens.get()
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        *self.inner.session.borrow()
    }

    /// Watch session changes (e.g. to route the operator back to login).
    pub fn session_events(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn categories(&self) -> Categories<'_> {
        Categories::new(self)
    }

    pub fn posts(&self) -> Posts<'_> {
        Posts::new(self)
    }

    pub fn videos(&self) -> Videos<'_> {
        Videos::new(self)
    }

    pub fn comments(&self) -> Comments<'_> {
        Comments::new(self)
    }

    pub(crate) async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.send::<()>(Method::GET, path, query, None).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.send(Method::POST, path, &[], body).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.send(Method::PUT, path, &[], body).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send::<()>(Method::DELETE, path, &[], None).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));

        let mut request = self
            .inner
            .http
            .request(method.clone(), &url)
            .header("ngrok-skip-browser-warning", "true");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.inner.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(method = %method, path = %path, status = status.as_u16(), "backend call");

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session();
            return Err(ApiError::Unauthorized);
        }

        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn expire_session(&self) {
        if self.inner.tokens.clear() {
            warn!("backend rejected credentials, token discarded");
        }
        self.inner.session.send_replace(SessionState::Expired);
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish()
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    String::from_utf8_lossy(body).chars().take(200).collect()
}
