//! Notification sink
//!
//! Notifications stack: a new message never replaces an earlier one, so a
//! background completion cannot clobber the result of a save. Each entry
//! expires after its duration unless dismissed first.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default time a notification stays visible
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Danger,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Danger => "danger",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub posted_at: Instant,
    pub duration: Duration,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.posted_at) >= self.duration
    }
}

/// Process-wide list of visible notifications
pub struct NotificationCenter {
    entries: Mutex<Vec<Notification>>,
    default_duration: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl NotificationCenter {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            default_duration,
        }
    }

    /// Post a message with the default duration
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) -> Uuid {
        self.notify_for(kind, message, self.default_duration)
    }

    pub fn notify_for(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> Uuid {
        let message = message.into();

        match kind {
            NotificationKind::Danger => error!("[notify] {}", message),
            NotificationKind::Warning => warn!("[notify] {}", message),
            _ => info!("[notify] {}", message),
        }

        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message,
            posted_at: Instant::now(),
            duration,
        };
        let id = notification.id;
        self.entries.lock().push(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Success, message)
    }

    pub fn danger(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Danger, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Warning, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Info, message)
    }

    /// Operator dismissal; returns false if it already expired or was dismissed
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }

    /// Visible notifications in post order
    pub fn visible(&self) -> Vec<Notification> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&self, now: Instant) -> Vec<Notification> {
        self.entries
            .lock()
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired entries, returning how many were removed
    pub fn prune_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|n| !n.is_expired(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Periodically prune expired entries while the center is alive
    pub fn spawn_sweeper(center: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(center);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(center) = weak.upgrade() else {
                    break;
                };
                let removed = center.prune_expired(Instant::now());
                if removed > 0 {
                    debug!("Auto-dismissed {} notification(s)", removed);
                }
            }
        })
    }
}
