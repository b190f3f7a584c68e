//! Single-slot transient notifications.
//!
//! At most one notice is visible. Showing a new one replaces the old, and a
//! notice expires [`TOAST_DURATION`] after it was shown.

#[cfg(test)]
#[path = "notify_test.rs"]
mod notify_test;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::storage::lock;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: Level::Info, message: message.into() }
    }

    /// Error notice carrying the user-facing text for `error`.
    #[must_use]
    pub fn from_error(error: &ApiError) -> Self {
        Self::error(error.user_message())
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

#[derive(Debug)]
struct Slot {
    notification: Notification,
    shown_at: Instant,
}

/// Shared holder of the currently visible notification.
#[derive(Clone, Debug, Default)]
pub struct NotificationCenter {
    slot: Arc<Mutex<Option<Slot>>>,
}

impl NotificationCenter {
    pub fn show(&self, notification: Notification) {
        self.show_at(notification, Instant::now());
    }

    pub fn show_at(&self, notification: Notification, now: Instant) {
        tracing::debug!(level = notification.level.as_str(), message = %notification.message, "notification");
        *lock(&self.slot) = Some(Slot { notification, shown_at: now });
    }

    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.current_at(Instant::now())
    }

    /// Visible notification at `now`; an expired one is dropped.
    #[must_use]
    pub fn current_at(&self, now: Instant) -> Option<Notification> {
        let mut slot = lock(&self.slot);
        let expired = slot
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.shown_at) >= TOAST_DURATION);
        if expired {
            *slot = None;
        }
        slot.as_ref().map(|s| s.notification.clone())
    }

    pub fn dismiss(&self) {
        *lock(&self.slot) = None;
    }
}
