//! Transient status messages (health, death, session status)

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Display color of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyColor {
    Blue,
    Red,
    Orange,
    Purple,
}

/// Fire-and-forget "show transient message" sink
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str, color: NotifyColor, duration: Duration);
}

/// Writes notifications to the log. Used by the authority process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, text: &str, color: NotifyColor, duration: Duration) {
        info!(
            color = ?color,
            duration_secs = duration.as_secs_f32(),
            "{}", text
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub text: String,
    pub color: NotifyColor,
    pub duration_secs: f32,
}

/// Keeps every notification in memory for a UI layer to drain
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.lock().iter().map(|n| n.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, text: &str, color: NotifyColor, duration: Duration) {
        self.entries.lock().push(Notification {
            text: text.to_string(),
            color,
            duration_secs: duration.as_secs_f32(),
        });
    }
}
