//! Notification panel endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::{AppError, AppResult};
use crate::notifications::{NewNotification, Notification, NotificationSnapshot};
use crate::state::AppState;

/// Create the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).post(add_notification),
        )
        .route("/api/notifications/read-all", post(mark_all_as_read))
        .route("/api/notifications/refresh", post(refresh))
        .route("/api/notifications/{id}/read", post(mark_as_read))
}

/// GET /api/notifications
async fn list_notifications(State(state): State<AppState>) -> Json<NotificationSnapshot> {
    Json(state.notifications().snapshot())
}

/// POST /api/notifications
async fn add_notification(
    State(state): State<AppState>,
    Json(input): Json<NewNotification>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    let notification = state.notifications().add_notification(input).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// POST /api/notifications/{id}/read
async fn mark_as_read(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    if state.notifications().mark_as_read(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// POST /api/notifications/read-all
async fn mark_all_as_read(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.notifications().mark_all_as_read().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/refresh
async fn refresh(State(state): State<AppState>) -> AppResult<Json<NotificationSnapshot>> {
    Ok(Json(state.notifications().refresh().await?))
}
