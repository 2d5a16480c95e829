use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingCapability {
    Available,
    Unavailable,
}

impl SchedulingCapability {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            SchedulingCapability::Available
        } else {
            SchedulingCapability::Unavailable
        }
    }
}

/// Point-in-time view of the background service. Reads are advisory; the
/// background task may mutate the stores while this is assembled.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub is_running: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub unread_notifications: usize,
    pub total_notifications: usize,
    pub cached_stocks: usize,
    pub scheduling: SchedulingCapability,
}

/// Outcome of one discovery cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CycleSummary {
    pub success: bool,
    pub message: String,
    pub new_stocks_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleSummary {
    pub fn completed(new_stocks_count: usize) -> Self {
        let message = if new_stocks_count == 0 {
            "No new stocks found".to_string()
        } else {
            format!("Successfully added {} new stocks", new_stocks_count)
        };
        Self {
            success: true,
            message,
            new_stocks_count,
            error: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            message: reason.into(),
            new_stocks_count: 0,
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Auto-update failed: {}", error),
            new_stocks_count: 0,
            error: Some(error.to_string()),
        }
    }
}
