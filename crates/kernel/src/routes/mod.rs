//! HTTP route handlers.

pub mod health;
pub mod notifications;
pub mod static_files;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Assemble every route. Shared by the server binary and integration tests;
/// transport layers (CORS, tracing) are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(upload::router(state.uploads().max_size()))
        .merge(notifications::router())
        .merge(static_files::router(&state))
        .with_state(state)
}
