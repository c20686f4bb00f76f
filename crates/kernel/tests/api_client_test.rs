//! Backend client integration tests against an in-process fake backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use common::spawn_backend;
use painel_kernel::api::{ApiClient, ApiError, SessionState};
use painel_kernel::notifications::NotificationSource;
use painel_test_utils::{pending_comment, pending_comments_envelope};

const TOKEN: &str = "token-123";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["nomeUsuario"] == "admin" && body["senhaUsuario"] == "segredo" {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login realizado",
                "usuario": { "idUsuario": 1, "nomeUsuario": "admin", "ativoAdm": true },
                "token": TOKEN,
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Credenciais inválidas" })),
        )
    }
}

async fn pending(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if headers.get("ngrok-skip-browser-warning").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "missing header" })));
    }
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token inválido" })));
    }
    let comments = [
        pending_comment(4, "Gostei muito do vídeo").by("Ana"),
        pending_comment(5, "Quando sai o próximo?").on_post(9, "Aula 2"),
    ];
    (StatusCode::OK, Json(pending_comments_envelope(&comments)))
}

async fn users(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token inválido" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "usuarios": [{ "idUsuario": 1, "nomeUsuario": "admin", "ativoAdm": true }],
            "pagination": {
                "currentPage": 1,
                "totalPages": 7,
                "totalUsuarios": 7,
                "hasNext": true,
                "hasPrev": false,
            },
        })),
    )
}

/// Posts exist only in category 1; no videos anywhere.
async fn posts(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let items = if query.get("categoria").map(String::as_str) == Some("1") {
        json!([{ "idPost": 10, "nomePost": "Boas-vindas", "idCategoria": 1, "idUsuario": 1 }])
    } else {
        json!([])
    };
    Json(json!({ "posts": items, "pagination": { "totalPosts": 1 } }))
}

async fn videos() -> Json<Value> {
    Json(json!({ "videos": [], "pagination": { "totalVideos": 0 } }))
}

async fn delete_category(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "message": format!("Categoria {id} excluída") }))
}

fn backend() -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/comentarios/pending", get(pending))
        .route("/api/users", get(users))
        .route("/api/posts", get(posts))
        .route("/api/videos", get(videos))
        .route("/api/categorias/{id}", delete(delete_category))
}

async fn client() -> ApiClient {
    let base = spawn_backend(backend()).await;
    ApiClient::new(&base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_login_stores_token_for_later_calls() {
    let api = client().await;
    assert_eq!(api.session_state(), SessionState::Anonymous);

    let login = api.auth().login("admin", "segredo").await.unwrap();
    assert_eq!(login.user.name, "admin");
    assert_eq!(api.token().as_deref(), Some(TOKEN));
    assert_eq!(api.session_state(), SessionState::Authenticated);

    let comments = api.comments().pending().await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].author, "Ana");
    assert_eq!(comments[1].post_title.as_deref(), Some("Aula 2"));
}

#[tokio::test]
async fn test_failed_login_reports_backend_message() {
    let api = client().await;

    let err = api.auth().login("admin", "errada").await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Credenciais inválidas");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(api.token().is_none());
}

#[tokio::test]
async fn test_unauthorized_response_expires_session() {
    let api = client().await;
    api.set_token("stale");
    let mut events = api.session_events();

    let err = api.comments().pending().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(api.token().is_none());
    assert_eq!(api.session_state(), SessionState::Expired);
    assert!(events.has_changed().unwrap());
    assert_eq!(*events.borrow_and_update(), SessionState::Expired);
}

#[tokio::test]
async fn test_listing_normalizes_resource_total() {
    let api = client().await;
    api.set_token(TOKEN);

    let page = api.users().list(1, 10, None).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].is_admin);
    assert_eq!(page.pagination.total_items, 7);
    assert!(page.pagination.has_next);
}

#[tokio::test]
async fn test_category_in_use_is_not_deleted() {
    let api = client().await;

    let err = api.categories().delete(1).await.unwrap_err();
    match err {
        ApiError::InUse(message) => assert!(message.contains("posts")),
        other => panic!("unexpected error: {other:?}"),
    }

    let message = api.categories().delete(2).await.unwrap();
    assert_eq!(message, "Categoria 2 excluída");
}

#[tokio::test]
async fn test_client_as_notification_source() {
    let api = client().await;
    api.set_token(TOKEN);

    let comments = api.pending_comments().await.unwrap();
    assert_eq!(comments.iter().map(|c| c.id).collect::<Vec<_>>(), vec![4, 5]);

    api.clear_token();
    assert!(api.pending_comments().await.is_err());
}
