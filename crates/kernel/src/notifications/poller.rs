//! Notification poller.
//!
//! A single task owns the notification map. Handles talk to it through a
//! command queue, and periodic loads are applied by the same task, so a
//! refresh can never overwrite a mutation made while it was in flight.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{NewNotification, Notification, NotificationSnapshot, Origin};
use super::source::{NotificationSource, load};

/// Default refresh period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Command queue depth.
const COMMAND_BUFFER: usize = 64;

/// How a completed load combines with the notifications already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Keep read flags of ids that are still present, drop ids that are
    /// gone, add new ids unread. Locally added notifications are kept.
    Merge,
    /// Rebuild the whole collection from the load; everything is unread.
    Replace,
}

impl FromStr for RefreshMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(RefreshMode::Merge),
            "replace" => Ok(RefreshMode::Replace),
            other => anyhow::bail!("unknown refresh mode: {other}"),
        }
    }
}

/// Poller settings.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub interval: Duration,
    pub refresh_mode: RefreshMode,
    /// Add user/post/video activity summaries to each load.
    pub include_activity: bool,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            refresh_mode: RefreshMode::Merge,
            include_activity: false,
        }
    }
}

/// The poller task is no longer running.
#[derive(Debug, Clone, Copy, Error)]
#[error("notification poller has stopped")]
pub struct PollerStopped;

enum Command {
    MarkAsRead {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    MarkAllAsRead {
        reply: oneshot::Sender<()>,
    },
    Add {
        notification: NewNotification,
        reply: oneshot::Sender<Notification>,
    },
    Refresh {
        reply: oneshot::Sender<NotificationSnapshot>,
    },
}

/// Cheap, cloneable access to a running poller.
#[derive(Clone)]
pub struct NotificationHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<NotificationSnapshot>,
    cancel: CancellationToken,
}

impl NotificationHandle {
    /// Current state of the panel.
    pub fn snapshot(&self) -> NotificationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshots.clone()
    }

    /// Load now and return the snapshot once the result is applied.
    ///
    /// Joins the load already in flight, if any.
    pub async fn refresh(&self) -> Result<NotificationSnapshot, PollerStopped> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Refresh { reply }).await?;
        rx.await.map_err(|_| PollerStopped)
    }

    /// Mark one notification read. Returns `false` if the id is unknown.
    pub async fn mark_as_read(&self, id: impl Into<String>) -> Result<bool, PollerStopped> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::MarkAsRead {
            id: id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| PollerStopped)
    }

    /// Mark every notification read.
    pub async fn mark_all_as_read(&self) -> Result<(), PollerStopped> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::MarkAllAsRead { reply }).await?;
        rx.await.map_err(|_| PollerStopped)
    }

    /// Prepend a dashboard-generated notification.
    pub async fn add_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, PollerStopped> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Add {
            notification,
            reply,
        })
        .await?;
        rx.await.map_err(|_| PollerStopped)
    }

    /// Stop the poller and its timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, command: Command) -> Result<(), PollerStopped> {
        self.commands.send(command).await.map_err(|_| PollerStopped)
    }
}

impl std::fmt::Debug for NotificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHandle").finish()
    }
}

/// Owner of the notification map.
pub struct NotificationPoller {
    source: Arc<dyn NotificationSource>,
    options: PollerOptions,
    entries: IndexMap<String, Notification>,
    snapshots: watch::Sender<NotificationSnapshot>,
    waiters: Vec<oneshot::Sender<NotificationSnapshot>>,
    fetches: JoinSet<Result<Vec<Notification>>>,
}

impl NotificationPoller {
    /// Start polling `source`. Loads once immediately, then every
    /// `options.interval` until `cancel` fires or every handle is dropped.
    pub fn spawn(
        source: Arc<dyn NotificationSource>,
        options: PollerOptions,
        cancel: CancellationToken,
    ) -> (NotificationHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(NotificationSnapshot::default());

        let poller = Self {
            source,
            options,
            entries: IndexMap::new(),
            snapshots: snapshots_tx,
            waiters: Vec::new(),
            fetches: JoinSet::new(),
        };

        let task = tokio::spawn(poller.run(commands_rx, cancel.clone()));

        let handle = NotificationHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            cancel,
        };
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
        info!(
            interval_secs = self.options.interval.as_secs(),
            mode = ?self.options.refresh_mode,
            "notification poller started"
        );

        // interval() panics on a zero period
        let period = self.options.interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.start_load(),
                Some(joined) = self.fetches.join_next() => {
                    let result = joined.unwrap_or_else(|e| Err(anyhow::anyhow!("load task failed: {e}")));
                    self.apply_load(result);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        self.fetches.abort_all();
        info!("notification poller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::MarkAsRead { id, reply } => {
                let _ = reply.send(self.mark_as_read(&id));
            }
            Command::MarkAllAsRead { reply } => {
                self.mark_all_as_read();
                let _ = reply.send(());
            }
            Command::Add {
                notification,
                reply,
            } => {
                let _ = reply.send(self.add(notification));
            }
            Command::Refresh { reply } => {
                self.waiters.push(reply);
                self.start_load();
            }
        }
    }

    fn start_load(&mut self) {
        if !self.fetches.is_empty() {
            debug!("notification load still in flight, skipping");
            return;
        }

        let source = Arc::clone(&self.source);
        let include_activity = self.options.include_activity;
        self.fetches
            .spawn(async move { load(source.as_ref(), include_activity).await });
        self.publish(true);
    }

    fn apply_load(&mut self, result: Result<Vec<Notification>>) {
        match result {
            Ok(fresh) => {
                let previous = std::mem::take(&mut self.entries);
                self.entries = match self.options.refresh_mode {
                    RefreshMode::Replace => fresh.into_iter().map(|n| (n.id.clone(), n)).collect(),
                    RefreshMode::Merge => merge(previous, fresh),
                };
            }
            Err(e) => {
                warn!(error = %e, "failed to load notifications");
                self.entries.clear();
            }
        }

        let snapshot = self.snapshot(false);
        self.snapshots.send_replace(snapshot.clone());
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }

    fn mark_as_read(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.read = true;
        self.publish(self.loading());
        true
    }

    fn mark_all_as_read(&mut self) {
        for entry in self.entries.values_mut() {
            entry.read = true;
        }
        self.publish(self.loading());
    }

    fn add(&mut self, new: NewNotification) -> Notification {
        let now = Utc::now();
        let base = format!("local-{}", now.timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.entries.contains_key(&id) {
            id = format!("{base}-{n}");
            n += 1;
        }

        let notification = Notification {
            id: id.clone(),
            kind: new.kind,
            title: new.title,
            message: new.message,
            timestamp: now,
            read: false,
            action_url: new.action_url,
            origin: Origin::Local,
        };
        self.entries.shift_insert(0, id, notification.clone());
        self.publish(self.loading());
        notification
    }

    fn loading(&self) -> bool {
        !self.fetches.is_empty()
    }

    fn snapshot(&self, loading: bool) -> NotificationSnapshot {
        let notifications: Vec<Notification> = self.entries.values().cloned().collect();
        let unread_count = notifications.iter().filter(|n| !n.read).count();
        NotificationSnapshot {
            notifications,
            unread_count,
            loading,
        }
    }

    fn publish(&self, loading: bool) {
        self.snapshots.send_replace(self.snapshot(loading));
    }
}

/// Combine a fresh load with the current entries.
///
/// Backend ids present in both keep their read flag; backend ids absent
/// from `fresh` are dropped; local entries are carried over. The result is
/// ordered newest first.
fn merge(
    mut previous: IndexMap<String, Notification>,
    fresh: Vec<Notification>,
) -> IndexMap<String, Notification> {
    let mut merged: IndexMap<String, Notification> = IndexMap::with_capacity(fresh.len());
    for mut notification in fresh {
        if let Some(old) = previous.shift_remove(&notification.id) {
            notification.read = old.read;
        }
        merged.insert(notification.id.clone(), notification);
    }
    for (id, old) in previous {
        if old.origin == Origin::Local {
            merged.insert(id, old);
        }
    }
    merged.sort_by(|_, a, _, b| b.timestamp.cmp(&a.timestamp));
    merged
}
