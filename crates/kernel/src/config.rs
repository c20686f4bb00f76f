//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::file::{DEFAULT_MAX_UPLOAD_SIZE, VideoNamePolicy};
use crate::notifications::RefreshMode;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Public root holding the `videos/` and `images/` upload directories
    /// (default: ./public).
    pub public_dir: PathBuf,

    /// URL prefix under which the public root is served (default: /public).
    pub files_url: String,

    /// Upload ceiling in bytes (default: 50 MiB).
    pub max_upload_size: usize,

    /// What to do when a video upload reuses an existing filename.
    pub video_name_policy: VideoNamePolicy,

    /// Base URL of the content backend, including the `/api` prefix.
    pub api_url: String,

    /// Bearer token to start with, if any.
    pub api_token: Option<String>,

    /// Credentials used to log in at startup when no token is configured.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Backend request timeout (default: 30s).
    pub api_timeout: Duration,

    /// Notification refresh period (default: 30s).
    pub notification_poll_interval: Duration,

    /// How a refresh combines with the notifications already held.
    pub notification_refresh_mode: RefreshMode,

    /// Whether to synthesize user/post/video activity summaries.
    pub notification_activity: bool,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let files_url = env::var("FILES_URL").unwrap_or_else(|_| "/public".to_string());
        if !files_url.starts_with('/') {
            bail!("FILES_URL must start with '/'");
        }

        let max_upload_size: usize = match env::var("MAX_UPLOAD_SIZE") {
            Ok(v) => parse_upload_size(&v).context("invalid MAX_UPLOAD_SIZE")?,
            Err(_) => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let video_name_policy: VideoNamePolicy = env::var("VIDEO_NAME_POLICY")
            .unwrap_or_else(|_| "versioned".to_string())
            .parse()
            .context("VIDEO_NAME_POLICY must be 'versioned' or 'preserve'")?;

        let api_url = env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080/api".to_string());
        url::Url::parse(&api_url).context("API_URL must be an absolute URL")?;

        let api_token = env::var("API_TOKEN").ok().filter(|t| !t.is_empty());
        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let api_timeout_secs: u64 = env::var("API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("API_TIMEOUT_SECS must be a valid u64")?;

        let poll_secs: u64 = env::var("NOTIFICATION_POLL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("NOTIFICATION_POLL_SECS must be a valid u64")?;
        if poll_secs == 0 {
            bail!("NOTIFICATION_POLL_SECS must be greater than zero");
        }

        let notification_refresh_mode: RefreshMode = env::var("NOTIFICATION_REFRESH_MODE")
            .unwrap_or_else(|_| "merge".to_string())
            .parse()
            .context("NOTIFICATION_REFRESH_MODE must be 'merge' or 'replace'")?;

        let notification_activity = parse_bool(
            &env::var("NOTIFICATION_ACTIVITY").unwrap_or_else(|_| "false".to_string()),
        )
        .context("NOTIFICATION_ACTIVITY must be a boolean")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            public_dir,
            files_url,
            max_upload_size,
            video_name_policy,
            api_url,
            api_token,
            admin_username,
            admin_password,
            api_timeout: Duration::from_secs(api_timeout_secs),
            notification_poll_interval: Duration::from_secs(poll_secs),
            notification_refresh_mode,
            notification_activity,
            cors_allowed_origins,
        })
    }
}

/// Upload ceiling in bytes. Must be a positive whole number of MiB, the
/// unit the size error reports.
fn parse_upload_size(value: &str) -> Result<usize> {
    const MIB: usize = 1024 * 1024;
    let size: usize = value.trim().parse().context("not a byte count")?;
    if size == 0 || size % MIB != 0 {
        bail!("{size} is not a positive multiple of {MIB} bytes");
    }
    Ok(size)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("not a boolean: {other}"),
    }
}
