//! Upload route handler.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    routing::post,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::file::{IncomingFile, UploadForm, UploadResult, UploadService, check_type};
use crate::state::AppState;

/// Room above the file ceiling for multipart framing and the `type` field.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Create the upload router.
///
/// The request body limit sits above the upload ceiling so oversize files
/// reach validation and get the regular size error.
pub fn router(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_size.saturating_add(BODY_OVERHEAD)))
}

/// Upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub file_name: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<UploadResult> for UploadResponse {
    fn from(result: UploadResult) -> Self {
        Self {
            success: true,
            url: result.url,
            file_name: result.file_name,
            size: result.size,
            mime_type: result.mime_type,
        }
    }
}

/// Store an uploaded video or image.
///
/// POST /api/upload
/// Content-Type: multipart/form-data
///
/// Form fields:
/// - file: the file to store
/// - type: `video` or `image`
async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let form = read_form(multipart, state.uploads()).await?;
    let result = state.uploads().upload(form).await?;
    Ok((StatusCode::OK, Json(result.into())))
}

/// Collect the `file` and `type` fields. Other fields are ignored, as are
/// repeated `file` parts after the first.
///
/// When `type` precedes the file, type and MIME are checked from the part
/// headers before any bytes are read.
async fn read_form(mut multipart: Multipart, uploads: &UploadService) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(read_error(e, &form, uploads)),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" if form.file.is_none() => {
                // A `file` part without a filename is a plain text field
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    debug!("file field without filename ignored");
                    continue;
                };
                let headers = IncomingFile {
                    file_name,
                    content_type: field.content_type().map(str::to_string),
                    data: Bytes::new(),
                };
                if let Some(declared) = form.declared_type.as_deref() {
                    check_type(&headers, Some(declared))?;
                }
                form.file = Some(headers);

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| read_error(e, &form, uploads))?;
                if let Some(file) = form.file.as_mut() {
                    file.data = data;
                }
            }
            "type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| read_error(e, &form, uploads))?;
                form.declared_type = Some(value);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Map a multipart read failure. A body over the request limit is judged on
/// what was read so far, so earlier checks keep their precedence.
fn read_error(e: MultipartError, form: &UploadForm, uploads: &UploadService) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        uploads.reject_oversize(form).into()
    } else {
        warn!(error = %e, "malformed upload form");
        AppError::BadRequest("Formulário de upload inválido".to_string())
    }
}
