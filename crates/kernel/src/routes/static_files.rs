//! Serving of uploaded files.

use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Serve the public root under the configured files URL.
///
/// ServeDir rejects `..` segments, so lookups stay inside the root.
pub fn router(state: &AppState) -> Router<AppState> {
    let service = ServeDir::new(state.public_dir());
    let prefix = state.files_url().trim_end_matches('/');

    // Nesting at "/" is not allowed; an empty prefix serves from the root.
    if prefix.is_empty() {
        Router::new().fallback_service(service)
    } else {
        Router::new().nest_service(prefix, service)
    }
}
