use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::models::{Notification, NotificationCategory, NotificationDocument};
use crate::store::{read_json, write_json};

/// Append-only log of user-facing events, persisted as one JSON document.
///
/// The in-memory list is authoritative for the life of the process: a
/// failed write is logged and the next mutation rewrites the whole file.
pub struct NotificationStore {
    path: PathBuf,
    notifications: Vec<Notification>,
}

impl NotificationStore {
    /// Load the store from `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let notifications = match read_json::<NotificationDocument>(&path) {
            Ok(Some(doc)) => {
                debug!(
                    "Loaded {} notifications (last saved {:?})",
                    doc.notifications.len(),
                    doc.last_saved
                );
                doc.notifications
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not load notifications from {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self { path, notifications }
    }

    pub fn append(&mut self, message: impl Into<String>, category: NotificationCategory) {
        let notification = Notification::new(message, category);
        info!("Added {} notification: {}", category, notification.message);
        self.notifications.push(notification);

        if let Err(e) = self.save() {
            error!("Could not save notifications: {}", e);
        }
    }

    /// Unread records in insertion order.
    pub fn unread(&self) -> impl Iterator<Item = &Notification> + '_ {
        self.notifications.iter().filter(|n| !n.read)
    }

    pub fn unread_count(&self) -> usize {
        self.unread().count()
    }

    #[cfg(test)]
    pub fn all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Returns how many records flipped from unread to read.
    pub fn mark_all_read(&mut self) -> Result<usize, AppError> {
        let mut flipped = 0;
        for notification in self.notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            flipped += 1;
        }
        self.save()?;
        Ok(flipped)
    }

    /// Drop records older than `retention_days`. Returns how many were removed.
    /// A negative or unrepresentable window is rejected without touching the log.
    pub fn sweep(&mut self, retention_days: i64) -> Result<usize, AppError> {
        let cutoff = Duration::try_days(retention_days)
            .filter(|_| retention_days >= 0)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| AppError::Config(format!("invalid retention window: {} days", retention_days)))?;
        self.sweep_before(cutoff)
    }

    /// Records created exactly at `cutoff` are kept.
    pub fn sweep_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.created_at >= cutoff);
        let removed = before - self.notifications.len();

        self.save()?;
        if removed > 0 {
            info!("Removed {} notifications older than {}", removed, cutoff);
        }
        Ok(removed)
    }

    pub fn save(&self) -> Result<(), AppError> {
        let doc = NotificationDocument {
            notifications: self.notifications.clone(),
            last_saved: Some(Utc::now()),
        };
        write_json(&self.path, &doc)
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
