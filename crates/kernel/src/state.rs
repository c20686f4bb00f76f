//! Application state shared across all handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::file::{LocalFileStorage, UploadService};
use crate::notifications::{NotificationHandle, NotificationPoller, NotificationSource, PollerOptions};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Public root on disk.
    public_dir: PathBuf,

    /// URL prefix the public root is served under.
    files_url: String,

    /// Upload gateway.
    uploads: Arc<UploadService>,

    /// Content backend client.
    api: ApiClient,

    /// Running notification poller.
    notifications: NotificationHandle,

    /// Cancels background tasks on shutdown.
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state backed by the configured content backend.
    pub async fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::new(&config.api_url, config.api_timeout)
            .context("failed to create backend client")?;

        if let Some(token) = &config.api_token {
            api.set_token(token.clone());
        } else if let (Some(user), Some(password)) = (&config.admin_username, &config.admin_password) {
            match api.auth().login(user, password).await {
                Ok(_) => info!(user = %user, "authenticated with backend"),
                // The poller keeps running; loads fail until credentials are fixed.
                Err(e) => warn!(user = %user, error = %e, "backend login failed"),
            }
        } else {
            warn!("no backend credentials configured, requests are anonymous");
        }

        let source: Arc<dyn NotificationSource> = Arc::new(api.clone());
        Self::with_source(config, api, source).await
    }

    /// Create state with an explicit notification source.
    pub async fn with_source(
        config: &Config,
        api: ApiClient,
        source: Arc<dyn NotificationSource>,
    ) -> Result<Self> {
        let storage = Arc::new(LocalFileStorage::new(
            config.public_dir.clone(),
            config.files_url.clone(),
        ));
        let uploads = Arc::new(UploadService::new(
            storage.clone(),
            config.max_upload_size,
            config.video_name_policy,
        ));
        uploads
            .ensure_layout()
            .await
            .context("failed to prepare upload directories")?;
        info!(public_dir = %storage.base_path().display(), "upload directories ready");

        let shutdown = CancellationToken::new();
        let options = PollerOptions {
            interval: config.notification_poll_interval,
            refresh_mode: config.notification_refresh_mode,
            include_activity: config.notification_activity,
        };
        // The poller task ends on cancellation; its JoinHandle is not needed.
        let (notifications, _task) =
            NotificationPoller::spawn(source, options, shutdown.child_token());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                public_dir: config.public_dir.clone(),
                files_url: config.files_url.clone(),
                uploads,
                api,
                notifications,
                shutdown,
            }),
        })
    }

    /// Get the upload service.
    pub fn uploads(&self) -> &Arc<UploadService> {
        &self.inner.uploads
    }

    /// Get the backend client.
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get the notification poller handle.
    pub fn notifications(&self) -> &NotificationHandle {
        &self.inner.notifications
    }

    /// Public root on disk.
    pub fn public_dir(&self) -> &Path {
        &self.inner.public_dir
    }

    /// URL prefix for uploaded files.
    pub fn files_url(&self) -> &str {
        &self.inner.files_url
    }

    /// Stop background tasks.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Check that the upload directories exist or can be created.
    pub async fn upload_root_healthy(&self) -> bool {
        self.inner.uploads.ensure_layout().await.is_ok()
    }
}
