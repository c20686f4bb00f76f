//! Where notifications are loaded from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::model::{ActivityTotals, Notification, activity_notifications, comment_notification};
use crate::api::{ApiClient, Comment};

/// Backend data the aggregator turns into notifications.
#[async_trait]
pub trait NotificationSource: Send + Sync + 'static {
    /// Comments awaiting moderation.
    async fn pending_comments(&self) -> Result<Vec<Comment>>;

    /// Current user/post/video totals.
    async fn activity_totals(&self) -> Result<ActivityTotals>;
}

#[async_trait]
impl NotificationSource for ApiClient {
    async fn pending_comments(&self) -> Result<Vec<Comment>> {
        self.comments()
            .pending()
            .await
            .context("failed to fetch pending comments")
    }

    async fn activity_totals(&self) -> Result<ActivityTotals> {
        let users = self.users();
        let posts = self.posts();
        let videos = self.videos();
        let (users, posts, videos) = tokio::try_join!(
            users.list(1, 1, None),
            posts.list(1, 1, None),
            videos.list(1, 1, None),
        )
        .context("failed to fetch activity totals")?;

        Ok(ActivityTotals {
            users: users.pagination.total_items,
            posts: posts.pagination.total_items,
            videos: videos.pagination.total_items,
        })
    }
}

/// Build the current notification list, newest first.
///
/// Any failed fetch fails the whole load.
pub async fn load(source: &dyn NotificationSource, include_activity: bool) -> Result<Vec<Notification>> {
    let mut notifications: Vec<Notification> = if include_activity {
        let (comments, totals) =
            tokio::try_join!(source.pending_comments(), source.activity_totals())?;
        let mut list: Vec<Notification> = comments.iter().map(comment_notification).collect();
        list.extend(activity_notifications(totals, Utc::now()));
        list
    } else {
        source
            .pending_comments()
            .await?
            .iter()
            .map(comment_notification)
            .collect()
    };

    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    debug!(count = notifications.len(), "notifications loaded");
    Ok(notifications)
}
