//! Upload gateway.
//!
//! Validates uploaded videos and images and stores them under the public root.

pub mod service;
pub mod storage;

pub use service::{
    DEFAULT_MAX_UPLOAD_SIZE, IncomingFile, UploadError, UploadForm, UploadKind, UploadResult,
    UploadService, ValidatedUpload, VideoNamePolicy, check_type,
};
pub use storage::{FileStorage, LocalFileStorage};
