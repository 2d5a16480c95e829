use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationCategory::Info => "info",
            NotificationCategory::Success => "success",
            NotificationCategory::Warning => "warning",
            NotificationCategory::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub category: NotificationCategory,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn new(message: impl Into<String>, category: NotificationCategory) -> Self {
        Self {
            message: message.into(),
            category,
            created_at: Utc::now(),
            read: false,
        }
    }
}

/// On-disk layout of the notification file.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationDocument {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    pub last_saved: Option<DateTime<Utc>>,
}
