//! Painel test utilities.
//!
//! Fixtures shaped like content backend payloads, and a multipart body
//! builder for exercising the upload endpoint.

use serde_json::{Value as JsonValue, json};

/// Boundary used by [`MultipartBody`] unless overridden.
pub const DEFAULT_BOUNDARY: &str = "painel-test-boundary";

/// Create a pending comment with default values.
pub fn pending_comment(id: i64, body: &str) -> TestComment {
    TestComment {
        id,
        post_id: 1,
        author: "Maria".to_string(),
        body: body.to_string(),
        created: "2025-03-01T10:00:00.000Z".to_string(),
        post_title: None,
    }
}

/// A comment fixture in the backend's wire format.
#[derive(Debug, Clone)]
pub struct TestComment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub body: String,
    pub created: String,
    pub post_title: Option<String>,
}

impl TestComment {
    /// Set the author name.
    pub fn by(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    /// Set the creation timestamp (raw backend string).
    pub fn created_at(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    /// Set the title of the commented post.
    pub fn on_post(mut self, post_id: i64, title: &str) -> Self {
        self.post_id = post_id;
        self.post_title = Some(title.to_string());
        self
    }

    /// Convert to backend JSON.
    pub fn to_json(&self) -> JsonValue {
        json!({
            "idComentario": self.id,
            "idPost": self.post_id,
            "nomeAutor": self.author,
            "textoComentario": self.body,
            "dataComentario": self.created,
            "aprovado": false,
            "moderado": false,
            "nomePost": self.post_title,
        })
    }
}

/// Envelope returned by the pending comments endpoint.
pub fn pending_comments_envelope(comments: &[TestComment]) -> JsonValue {
    json!({
        "comentarios": comments.iter().map(TestComment::to_json).collect::<Vec<_>>(),
        "pagination": {
            "currentPage": 1,
            "totalPages": 1,
            "totalItems": comments.len(),
            "hasNext": false,
            "hasPrev": false,
        },
    })
}

/// Builder for `multipart/form-data` request bodies.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Start an empty body with the default boundary.
    pub fn new() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY.to_string(),
            body: Vec::new(),
        }
    }

    /// Add a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a file field. `content_type` of `None` omits the part header.
    pub fn file(mut self, name: &str, file_name: &str, content_type: Option<&str>, data: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        if let Some(content_type) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the body and return its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}
