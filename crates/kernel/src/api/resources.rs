//! Per-resource endpoint groups.

use serde_json::{Value, json};
use tracing::{debug, warn};

use super::types::{Ack, Page, take_field};
use super::{
    ApiClient, ApiError, Category, CategoryInput, Comment, LoginResponse, NewUser, Post,
    PostInput, User, UserUpdate, Video, VideoInput,
};

fn page_query(page: u32, limit: u32, extra: Option<(&'static str, &str)>) -> Vec<(&'static str, String)> {
    let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if let Some((key, value)) = extra {
        query.push((key, value.to_string()));
    }
    query
}

/// `/auth` endpoints.
pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = json!({ "nomeUsuario": username, "senhaUsuario": password });
        let value = self.client.post("auth/login", Some(&body)).await?;
        let login: LoginResponse = serde_json::from_value(value)?;
        self.client.set_token(login.token.clone());
        debug!(user = %login.user.name, "logged in to backend");
        Ok(login)
    }

    /// Log out; the local token is dropped even if the backend call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.post::<()>("auth/logout", None).await;
        self.client.clear_token();
        result.map(|_| ())
    }

    /// Profile of the logged-in user.
    pub async fn me(&self) -> Result<User, ApiError> {
        take_field(self.client.get("auth/me", &[]).await?, "user")
    }
}

/// `/users` endpoints.
pub struct Users<'a> {
    client: &'a ApiClient,
}

impl<'a> Users<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// List users, optionally filtered by `user_type` (e.g. `admin`).
    pub async fn list(&self, page: u32, limit: u32, user_type: Option<&str>) -> Result<Page<User>, ApiError> {
        let query = page_query(page, limit, user_type.map(|t| ("type", t)));
        Page::from_envelope(self.client.get("users", &query).await?, "usuarios")
    }

    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        take_field(self.client.get(&format!("users/{id}"), &[]).await?, "usuario")
    }

    pub async fn create(&self, input: &NewUser) -> Result<User, ApiError> {
        take_field(self.client.post("users", Some(input)).await?, "usuario")
    }

    pub async fn update(&self, id: i64, input: &UserUpdate) -> Result<User, ApiError> {
        take_field(self.client.put(&format!("users/{id}"), Some(input)).await?, "usuario")
    }

    pub async fn delete(&self, id: i64) -> Result<String, ApiError> {
        ack(self.client.delete(&format!("users/{id}")).await?)
    }

    /// Flip the admin flag.
    pub async fn toggle_admin(&self, id: i64) -> Result<User, ApiError> {
        take_field(
            self.client.put::<()>(&format!("users/{id}/toggle-admin"), None).await?,
            "usuario",
        )
    }
}

/// `/categorias` endpoints.
pub struct Categories<'a> {
    client: &'a ApiClient,
}

impl<'a> Categories<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<Page<Category>, ApiError> {
        let query = page_query(page, limit, search.map(|s| ("search", s)));
        Page::from_envelope(self.client.get("categorias", &query).await?, "categorias")
    }

    pub async fn get(&self, id: i64) -> Result<Category, ApiError> {
        take_field(self.client.get(&format!("categorias/{id}"), &[]).await?, "categoria")
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        take_field(self.client.post("categorias", Some(input)).await?, "categoria")
    }

    pub async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category, ApiError> {
        take_field(
            self.client.put(&format!("categorias/{id}"), Some(input)).await?,
            "categoria",
        )
    }

    /// Delete a category that no post or video references.
    ///
    /// The usage probes run concurrently; a probe that fails counts as "not
    /// in use" and the delete proceeds.
    pub async fn delete(&self, id: i64) -> Result<String, ApiError> {
        let probe = vec![("categoria", id.to_string()), ("limit", "1".to_string())];
        let (posts, videos) = tokio::join!(
            self.client.get("posts", &probe),
            self.client.get("videos", &probe),
        );

        if in_use(posts, "posts") {
            return Err(ApiError::InUse(
                "Esta categoria está sendo usada em posts e não pode ser excluída.".to_string(),
            ));
        }
        if in_use(videos, "videos") {
            return Err(ApiError::InUse(
                "Esta categoria está sendo usada em vídeos e não pode ser excluída.".to_string(),
            ));
        }

        match self.client.delete(&format!("categorias/{id}")).await {
            Ok(body) => ack(body),
            Err(e) => {
                warn!(category_id = id, error = %e, "category delete failed");
                Err(e)
            }
        }
    }
}

fn in_use(probe: Result<Value, ApiError>, key: &str) -> bool {
    match probe {
        Ok(body) => body
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty()),
        Err(e) => {
            debug!(resource = key, error = %e, "category usage probe failed, ignoring");
            false
        }
    }
}

/// `/posts` endpoints.
pub struct Posts<'a> {
    client: &'a ApiClient,
}

impl<'a> Posts<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<Page<Post>, ApiError> {
        let query = page_query(page, limit, search.map(|s| ("search", s)));
        Page::from_envelope(self.client.get("posts", &query).await?, "posts")
    }

    pub async fn get(&self, id: i64) -> Result<Post, ApiError> {
        take_field(self.client.get(&format!("posts/{id}"), &[]).await?, "post")
    }

    pub async fn create(&self, input: &PostInput) -> Result<Post, ApiError> {
        take_field(self.client.post("posts", Some(input)).await?, "post")
    }

    pub async fn update(&self, id: i64, input: &PostInput) -> Result<Post, ApiError> {
        take_field(self.client.put(&format!("posts/{id}"), Some(input)).await?, "post")
    }

    pub async fn delete(&self, id: i64) -> Result<String, ApiError> {
        ack(self.client.delete(&format!("posts/{id}")).await?)
    }
}

/// `/videos` endpoints.
pub struct Videos<'a> {
    client: &'a ApiClient,
}

impl<'a> Videos<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<Page<Video>, ApiError> {
        let query = page_query(page, limit, search.map(|s| ("search", s)));
        Page::from_envelope(self.client.get("videos", &query).await?, "videos")
    }

    pub async fn get(&self, id: i64) -> Result<Video, ApiError> {
        take_field(self.client.get(&format!("videos/{id}"), &[]).await?, "video")
    }

    pub async fn create(&self, input: &VideoInput) -> Result<Video, ApiError> {
        take_field(self.client.post("videos", Some(input)).await?, "video")
    }

    pub async fn update(&self, id: i64, input: &VideoInput) -> Result<Video, ApiError> {
        take_field(self.client.put(&format!("videos/{id}"), Some(input)).await?, "video")
    }

    pub async fn delete(&self, id: i64) -> Result<String, ApiError> {
        ack(self.client.delete(&format!("videos/{id}")).await?)
    }
}

/// `/comentarios` moderation endpoints.
pub struct Comments<'a> {
    client: &'a ApiClient,
}

impl<'a> Comments<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Comments awaiting approval.
    pub async fn pending(&self) -> Result<Vec<Comment>, ApiError> {
        let body = self.client.get("comentarios/pending", &[]).await?;
        match body.get("comentarios") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => take_field(body, "comentarios"),
        }
    }

    pub async fn approve(&self, id: i64) -> Result<String, ApiError> {
        ack(self.client.put::<()>(&format!("comentarios/{id}/approve"), None).await?)
    }

    pub async fn reject(&self, id: i64, reason: &str) -> Result<String, ApiError> {
        let body = json!({ "motivo": reason });
        ack(self.client.put(&format!("comentarios/{id}/reject"), Some(&body)).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<String, ApiError> {
        ack(self.client.delete(&format!("comentarios/{id}")).await?)
    }
}

fn ack(body: Value) -> Result<String, ApiError> {
    if body.is_null() {
        return Ok(String::new());
    }
    let ack: Ack = serde_json::from_value(body)?;
    Ok(ack.message)
}
