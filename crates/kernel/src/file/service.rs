//! Upload gateway service.
//!
//! Validates an uploaded file against its declared type and the size
//! ceiling, picks the on-disk name, and persists it under the public root.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::storage::FileStorage;

/// Default upload ceiling (50 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Upper bound on `-N` suffixes tried for a taken video name.
const MAX_NAME_VERSIONS: u32 = 10_000;

/// Declared category of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Video,
    Image,
}

impl UploadKind {
    /// Directory under the public root.
    pub fn dir(self) -> &'static str {
        match self {
            UploadKind::Video => "videos",
            UploadKind::Image => "images",
        }
    }

    fn accepts(self, mime_type: &str) -> bool {
        match self {
            UploadKind::Video => mime_type.starts_with("video/"),
            UploadKind::Image => mime_type.starts_with("image/"),
        }
    }
}

impl FromStr for UploadKind {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(UploadKind::Video),
            "image" => Ok(UploadKind::Image),
            _ => Err(UploadError::InvalidType),
        }
    }
}

/// Naming policy for a video whose original filename is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoNamePolicy {
    /// Append `-1`, `-2`, ... before the extension until the name is free.
    Versioned,
    /// Keep the original name; the new upload replaces the old bytes.
    Preserve,
}

impl FromStr for VideoNamePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "versioned" => Ok(VideoNamePolicy::Versioned),
            "preserve" => Ok(VideoNamePolicy::Preserve),
            other => anyhow::bail!("unknown video name policy: {other}"),
        }
    }
}

/// Upload failures, in validation order.
///
/// Display strings are the messages returned to the dashboard.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Nenhum arquivo fornecido")]
    MissingFile,

    #[error("Tipo de upload inválido")]
    InvalidType,

    #[error("Arquivo deve ser um vídeo")]
    NotAVideo,

    #[error("Arquivo deve ser uma imagem")]
    NotAnImage,

    #[error("Arquivo muito grande. Máximo {max_mb}MB")]
    TooLarge { max_mb: usize },

    #[error("Erro interno do servidor")]
    Storage(#[from] anyhow::Error),
}

impl UploadError {
    /// Size failure for a ceiling of `max_size` bytes.
    pub fn too_large(max_size: usize) -> Self {
        UploadError::TooLarge {
            max_mb: max_size.div_ceil(1024 * 1024),
        }
    }

    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// The file part of an upload form.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    /// Content type declared by the client for this part.
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A parsed multipart upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<IncomingFile>,
    /// Raw `type` field.
    pub declared_type: Option<String>,
}

/// A form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub kind: UploadKind,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// File upload result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub url: String,
    pub file_name: String,
    pub size: usize,
    pub mime_type: String,
}

/// Upload gateway service.
pub struct UploadService {
    storage: Arc<dyn FileStorage>,
    max_size: usize,
    video_policy: VideoNamePolicy,
}

impl UploadService {
    /// Create a new upload service.
    pub fn new(storage: Arc<dyn FileStorage>, max_size: usize, video_policy: VideoNamePolicy) -> Self {
        Self {
            storage,
            max_size,
            video_policy,
        }
    }

    /// Upload ceiling in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Validate a form: file present, declared type known, MIME matching
    /// the type, size within the ceiling.
    pub fn validate(&self, form: UploadForm) -> Result<ValidatedUpload, UploadError> {
        let file = form.file.ok_or(UploadError::MissingFile)?;
        let (kind, mime_type) = check_type(&file, form.declared_type.as_deref())?;

        if file.data.len() > self.max_size {
            debug!(size = file.data.len(), max = self.max_size, "upload over ceiling");
            return Err(UploadError::too_large(self.max_size));
        }

        Ok(ValidatedUpload {
            kind,
            file_name: file.file_name,
            mime_type,
            data: file.data,
        })
    }

    /// Error for a form whose body outgrew the request limit while the
    /// file was streaming.
    ///
    /// Type and MIME failures still take precedence when the `type` field
    /// arrived before the file; otherwise only the size is known to be wrong.
    pub fn reject_oversize(&self, form: &UploadForm) -> UploadError {
        if let (Some(file), Some(declared)) = (&form.file, form.declared_type.as_deref()) {
            if let Err(e) = check_type(file, Some(declared)) {
                return e;
            }
        }
        debug!(max = self.max_size, "upload body over request limit");
        UploadError::too_large(self.max_size)
    }

    /// Validate and persist an upload.
    pub async fn upload(&self, form: UploadForm) -> Result<UploadResult, UploadError> {
        let upload = self.validate(form)?;

        let file_name = self.resolve_name(&upload).await?;
        let uri = format!("local://{}/{}", upload.kind.dir(), file_name);

        self.storage.write(&uri, &upload.data).await?;

        let url = self.storage.public_url(&uri);
        info!(
            kind = upload.kind.dir(),
            url = %url,
            size = upload.data.len(),
            "upload stored"
        );

        Ok(UploadResult {
            url,
            file_name,
            size: upload.data.len(),
            mime_type: upload.mime_type,
        })
    }

    /// Ensure both upload directories exist.
    pub async fn ensure_layout(&self) -> anyhow::Result<()> {
        for kind in [UploadKind::Video, UploadKind::Image] {
            self.storage.ensure_dir(kind.dir()).await?;
        }
        Ok(())
    }

    async fn resolve_name(&self, upload: &ValidatedUpload) -> anyhow::Result<String> {
        match upload.kind {
            UploadKind::Image => Ok(image_file_name(
                &upload.file_name,
                chrono::Utc::now().timestamp_millis(),
            )),
            UploadKind::Video => {
                let name = sanitize_filename(&upload.file_name);
                if self.video_policy == VideoNamePolicy::Preserve {
                    return Ok(name);
                }
                if !self.storage.exists(&video_uri(&name)).await? {
                    return Ok(name);
                }
                let (stem, ext) = split_extension(&name);
                for n in 1..=MAX_NAME_VERSIONS {
                    let candidate = match ext {
                        Some(ext) => format!("{stem}-{n}.{ext}"),
                        None => format!("{stem}-{n}"),
                    };
                    if !self.storage.exists(&video_uri(&candidate)).await? {
                        debug!(original = %name, stored = %candidate, "video name taken, versioned");
                        return Ok(candidate);
                    }
                }
                anyhow::bail!("no free versioned name for {name}")
            }
        }
    }
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("max_size", &self.max_size)
            .field("video_policy", &self.video_policy)
            .finish()
    }
}

/// Resolve the declared type and the effective MIME type of `file`, and
/// check that they agree. Only the part headers are looked at.
pub fn check_type(
    file: &IncomingFile,
    declared_type: Option<&str>,
) -> Result<(UploadKind, String), UploadError> {
    let kind: UploadKind = declared_type.ok_or(UploadError::InvalidType)?.parse()?;

    let mime_type = file
        .content_type
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| guess_mime_type(&file.file_name).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !kind.accepts(&mime_type) {
        return Err(match kind {
            UploadKind::Video => UploadError::NotAVideo,
            UploadKind::Image => UploadError::NotAnImage,
        });
    }
    Ok((kind, mime_type))
}

fn video_uri(name: &str) -> String {
    format!("local://{}/{}", UploadKind::Video.dir(), name)
}

/// Timestamped image name keeping the original extension.
fn image_file_name(original: &str, millis: i64) -> String {
    let ext = split_extension(original)
        .1
        .map(|e| {
            e.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(16)
                .collect::<String>()
        })
        .filter(|e| !e.is_empty());

    match ext {
        Some(ext) => format!("image_{millis}.{ext}"),
        None => format!("image_{millis}"),
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Sanitize a filename for safe storage.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    use std::path::Path;

    // Get just the filename part (no path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    // Replace unsafe characters
    let safe: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(200)
        .collect();

    if safe.chars().all(|c| c == '.') {
        "video".to_string()
    } else {
        safe
    }
}

/// Guess MIME type from filename extension.
fn guess_mime_type(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        _ => return None,
    };
    Some(mime)
}
