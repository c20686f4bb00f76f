//! Health check endpoint.
//!
//! Returns 200 OK if the upload root is writable, 503 Service Unavailable
//! otherwise. The backend session state is reported but does not affect the
//! status code.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::api::SessionState;
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    upload_root: bool,
    backend: &'static str,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let upload_root = state.upload_root_healthy().await;

    let backend = match state.api().session_state() {
        SessionState::Anonymous => "anonymous",
        SessionState::Authenticated => "authenticated",
        SessionState::Expired => "expired",
    };

    let (status, status_code) = if upload_root {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            upload_root,
            backend,
        }),
    )
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
