//! Backend payloads.
//!
//! Field names follow the backend's JSON (`idUsuario`, `nomeCategoria`, ...);
//! Rust names are English.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;

/// Dashboard user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "idUsuario")]
    pub id: i64,
    #[serde(rename = "nomeUsuario")]
    pub name: String,
    #[serde(rename = "ativoAdm", default)]
    pub is_admin: bool,
}

/// Content category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "idCategoria")]
    pub id: i64,
    #[serde(rename = "nomeCategoria")]
    pub name: String,
}

/// Blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "idPost")]
    pub id: i64,
    #[serde(rename = "nomePost")]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "conteudo", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "idCategoria")]
    pub category_id: i64,
    #[serde(rename = "dataPost", default)]
    pub posted_at: String,
    #[serde(rename = "idUsuario")]
    pub user_id: i64,
    #[serde(rename = "imagemPost", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "imagemDestaque", default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(rename = "imagemConteudo", default, skip_serializing_if = "Option::is_none")]
    pub content_image: Option<String>,
    #[serde(rename = "linkExterno", default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(rename = "usuario", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Video entry; either an uploaded file or an external link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "idVideo")]
    pub id: i64,
    #[serde(rename = "nomeVideo")]
    pub title: String,
    #[serde(rename = "urlArquivo", default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(rename = "urlExterno", default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "idUsuario")]
    pub user_id: i64,
    #[serde(rename = "dataUpload", default)]
    pub uploaded_at: String,
    #[serde(rename = "idCategoria")]
    pub category_id: i64,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(rename = "usuario", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Comment awaiting (or past) moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "idComentario")]
    pub id: i64,
    #[serde(rename = "idPost")]
    pub post_id: i64,
    #[serde(rename = "nomeAutor")]
    pub author: String,
    #[serde(rename = "textoComentario")]
    pub body: String,
    /// Stored creation time as sent by the backend.
    #[serde(rename = "dataComentario")]
    pub created: String,
    #[serde(rename = "aprovado", default)]
    pub approved: bool,
    #[serde(rename = "moderado", default)]
    pub moderated: bool,
    #[serde(rename = "motivoRejeicao", default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "nomePost", default, skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
}

/// Successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "usuario")]
    pub user: User,
    pub token: String,
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    #[serde(rename = "nomeUsuario")]
    pub name: String,
    #[serde(rename = "senhaUsuario")]
    pub password: String,
    #[serde(rename = "ativoAdm", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Partial user update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "nomeUsuario", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "ativoAdm", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Input for creating or renaming a category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    #[serde(rename = "nomeCategoria")]
    pub name: String,
}

/// Post create/update fields; unset fields are left untouched on update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostInput {
    #[serde(rename = "nomePost", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "conteudo", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "idCategoria", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(rename = "imagemPost", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "imagemDestaque", skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(rename = "imagemConteudo", skip_serializing_if = "Option::is_none")]
    pub content_image: Option<String>,
    #[serde(rename = "linkExterno", skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
}

/// Video create/update fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoInput {
    #[serde(rename = "nomeVideo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "urlArquivo", skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(rename = "urlExterno", skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "idCategoria", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

/// Pagination block of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    /// Sent as `totalItems` or as a per-resource key such as `totalUsuarios`.
    #[serde(
        alias = "totalUsuarios",
        alias = "totalCategorias",
        alias = "totalPosts",
        alias = "totalVideos"
    )]
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a listing whose items sit under `key` (`usuarios`, `posts`, ...).
    ///
    /// A missing item array decodes as empty; a missing pagination block
    /// as a single empty page.
    pub(crate) fn from_envelope(mut body: Value, key: &str) -> Result<Self, ApiError> {
        let items = match body.get_mut(key).map(Value::take) {
            Some(Value::Null) | None => Vec::new(),
            Some(v) => serde_json::from_value(v)?,
        };
        let pagination = match body.get_mut("pagination").map(Value::take) {
            Some(Value::Null) | None => Pagination::default(),
            Some(v) => serde_json::from_value(v)?,
        };
        Ok(Self { items, pagination })
    }
}

/// Take a required field out of a response body.
pub(crate) fn take_field<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ApiError> {
    let value = body.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    Ok(serde_json::from_value(value)?)
}

/// `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_normalizes_resource_total_key() {
        let body = json!({
            "usuarios": [
                { "idUsuario": 1, "nomeUsuario": "ana", "ativoAdm": true },
                { "idUsuario": 2, "nomeUsuario": "rui" }
            ],
            "pagination": {
                "currentPage": 1,
                "totalPages": 3,
                "totalUsuarios": 25,
                "hasNext": true,
                "hasPrev": false
            }
        });

        let page: Page<User> = Page::from_envelope(body, "usuarios").unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].is_admin);
        assert!(!page.items[1].is_admin);
        assert_eq!(page.pagination.total_items, 25);
        assert!(page.pagination.has_next);
    }

    #[test]
    fn test_page_missing_items_is_empty() {
        let page: Page<Category> = Page::from_envelope(json!({}), "categorias").unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination, Pagination::default());
    }

    #[test]
    fn test_comment_decodes_backend_fields() {
        let comment: Comment = serde_json::from_value(json!({
            "idComentario": 7,
            "idPost": 3,
            "nomeAutor": "Maria",
            "textoComentario": "Ótimo post",
            "dataComentario": "2025-03-01T10:00:00.000Z",
            "aprovado": false,
            "moderado": false
        }))
        .unwrap();
        assert_eq!(comment.id, 7);
        assert_eq!(comment.author, "Maria");
        assert!(comment.rejection_reason.is_none());
    }

    #[test]
    fn test_take_field_missing_is_error() {
        let err = take_field::<User>(json!({ "message": "ok" }), "usuario").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
