//! Notification records and their construction from backend data.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::Comment;

/// Comment bodies longer than this are cut in the notification message.
const MESSAGE_PREVIEW_CHARS: usize = 50;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Comment,
    User,
    Post,
    Video,
    Category,
}

/// Where a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Built from backend data during a load; replaced by the next load.
    Backend,
    /// Added by the dashboard itself; survives merging loads.
    Local,
}

/// A single entry in the notification panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip)]
    pub origin: Origin,
}

/// Fields supplied when the dashboard adds its own notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub action_url: Option<String>,
}

/// Read-only view of the panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub loading: bool,
}

/// Backend totals summarized by activity notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityTotals {
    pub users: u64,
    pub posts: u64,
    pub videos: u64,
}

/// Notification for a comment awaiting moderation.
pub fn comment_notification(comment: &Comment) -> Notification {
    Notification {
        id: format!("comment-{}", comment.id),
        kind: NotificationKind::Comment,
        title: "Comentário pendente de aprovação".to_string(),
        message: format!("\"{}\" por {}", preview(&comment.body), comment.author),
        timestamp: parse_timestamp(&comment.created).unwrap_or_else(|| {
            debug!(comment_id = comment.id, created = %comment.created, "unparseable comment date");
            DateTime::<Utc>::UNIX_EPOCH
        }),
        read: false,
        action_url: Some("/comentarios".to_string()),
        origin: Origin::Backend,
    }
}

/// Summary entries for user/post/video totals, placed 30/60/90 minutes
/// before `now`.
pub fn activity_notifications(totals: ActivityTotals, now: DateTime<Utc>) -> Vec<Notification> {
    let entry = |id: &str, kind, title: &str, message: String, minutes, url: &str| Notification {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        message,
        timestamp: now - Duration::minutes(minutes),
        read: false,
        action_url: Some(url.to_string()),
        origin: Origin::Backend,
    };

    vec![
        entry(
            "activity-users",
            NotificationKind::User,
            "Usuários cadastrados",
            format!("{} usuários no sistema", totals.users),
            30,
            "/usuarios",
        ),
        entry(
            "activity-posts",
            NotificationKind::Post,
            "Posts publicados",
            format!("{} posts publicados", totals.posts),
            60,
            "/posts",
        ),
        entry(
            "activity-videos",
            NotificationKind::Video,
            "Vídeos disponíveis",
            format!("{} vídeos disponíveis", totals.videos),
            90,
            "/videos",
        ),
    ]
}

/// First 50 characters of `body`, with `...` appended when cut.
fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MESSAGE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse a backend timestamp: RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS`
/// (optionally with `T` and fractional seconds) taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
