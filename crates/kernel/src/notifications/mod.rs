//! Notification aggregator.
//!
//! Polls the backend for comments awaiting moderation, turns them into
//! panel notifications, and tracks which ones the operator has read.
//! Load failures are logged and leave the panel empty until the next
//! successful load.

mod model;
mod poller;
mod source;

pub use model::{
    ActivityTotals, NewNotification, Notification, NotificationKind, NotificationSnapshot, Origin,
    activity_notifications, comment_notification,
};
pub use poller::{
    DEFAULT_POLL_INTERVAL, NotificationHandle, NotificationPoller, PollerOptions, PollerStopped,
    RefreshMode,
};
pub use source::{NotificationSource, load};
