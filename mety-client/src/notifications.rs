//! User-facing notifications queued by the store.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Must be acknowledged by the user before anything else is shown.
    pub blocking: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            blocking: false,
            created_at: Utc::now(),
        }
    }

    /// A blocking error alert, used when a critical action fails.
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message).blocking()
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_is_blocking_error() {
        let alert = Notification::alert("Failed to save. Please try again.");
        assert_eq!(alert.level, NotificationLevel::Error);
        assert!(alert.blocking);
        assert!(!Notification::new(NotificationLevel::Info, "saved").blocking);
    }
}
