use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{CycleSummary, Notification, SchedulingCapability, ServiceStatus, StockRecord};
use crate::services::discovery_service::StockDiscovery;
use crate::services::job_scheduler_service::{check_for_new_stocks, JobContext, JobSchedulerService};
use crate::store::notifications::NotificationStore;
use crate::store::stock_cache::{LastUpdate, StockCache};

/// Entry point the HTTP layer talks to. Binds the notification store, the
/// stock discovery probe and the background scheduler together.
pub struct DiscoveryService {
    context: JobContext,
    scheduler: JobSchedulerService,
}

impl DiscoveryService {
    pub fn new(config: &AppConfig, provider: Arc<dyn MarketDataProvider>) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| AppError::storage(&config.data_dir, e))?;

        let discovery = StockDiscovery::new(
            provider,
            StockCache::load(config.stock_cache_path()),
            LastUpdate::new(config.last_update_path()),
            config.discovery.clone(),
        );

        let context = JobContext {
            discovery: Arc::new(discovery),
            notifications: Arc::new(Mutex::new(NotificationStore::load(
                config.notifications_path(),
            ))),
            retention_days: config.scheduler.retention_days,
        };

        let capability = SchedulingCapability::from_enabled(config.scheduler.enabled);
        let scheduler = JobSchedulerService::new(context.clone(), config.scheduler.clone(), capability);

        info!(
            "Discovery service ready (data dir: {}, scheduling: {:?}, cached stocks: {})",
            config.data_dir.display(),
            capability,
            context.discovery.cached_count()
        );

        Ok(Self { context, scheduler })
    }

    pub fn start(&self) -> bool {
        self.scheduler.start()
    }

    pub async fn stop(&self) -> bool {
        self.scheduler.stop().await
    }

    pub fn status(&self) -> ServiceStatus {
        let (unread, total) = {
            let store = self.context.notifications.lock();
            (store.unread_count(), store.len())
        };

        ServiceStatus {
            is_running: self.scheduler.is_running(),
            last_update: self.context.discovery.last_update(),
            unread_notifications: unread,
            total_notifications: total,
            cached_stocks: self.context.discovery.cached_count(),
            scheduling: self.scheduler.capability(),
        }
    }

    pub fn unread_notifications(&self) -> Vec<Notification> {
        self.context.notifications.lock().unread().cloned().collect()
    }

    pub fn mark_read(&self) -> Result<usize, AppError> {
        self.context.notifications.lock().mark_all_read()
    }

    /// Run one discovery cycle now, outside the schedule.
    pub async fn trigger_now(&self) -> CycleSummary {
        info!("Stock discovery triggered manually");
        check_for_new_stocks(&self.context, true).await
    }

    pub fn stocks(&self) -> Vec<StockRecord> {
        self.context.discovery.stocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mock::MockProvider;
    use crate::models::NotificationCategory;
    use std::time::Duration;

    fn config(dir: &tempfile::TempDir, scheduler_enabled: bool) -> AppConfig {
        let mut config = AppConfig::with_data_dir(dir.path().join("data"));
        config.discovery.probe_delay = Duration::ZERO;
        config.scheduler.enabled = scheduler_enabled;
        config
    }

    #[tokio::test]
    async fn test_construction_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let service = DiscoveryService::new(&config(&dir, true), Arc::new(MockProvider::new())).unwrap();

        assert!(dir.path().join("data").is_dir());
        let status = service.status();
        assert!(!status.is_running);
        assert!(status.last_update.is_none());
        assert_eq!(status.total_notifications, 0);
        assert_eq!(status.scheduling, SchedulingCapability::Available);
    }

    #[tokio::test]
    async fn test_construction_fails_when_data_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data"), "not a directory").unwrap();

        let result = DiscoveryService::new(&config(&dir, true), Arc::new(MockProvider::new()));
        assert!(matches!(result, Err(AppError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_trigger_now_reports_and_updates_status() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            MockProvider::new()
                .with_listing("INFY.NS", "Infosys Limited", "Technology", "IT Services"),
        );
        let service = DiscoveryService::new(&config(&dir, false), provider.clone()).unwrap();

        let summary = service.trigger_now().await;
        assert!(summary.success);
        assert_eq!(summary.new_stocks_count, 1);

        let unread = service.unread_notifications();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].category, NotificationCategory::Success);
        assert!(unread[0].message.starts_with("🎉 Discovered 1 new stocks!"));

        let status = service.status();
        assert!(status.last_update.is_some());
        assert_eq!(status.cached_stocks, 1);
        assert_eq!(service.stocks()[0].symbol, "INFY.NS");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mark_read_clears_unread() {
        let dir = tempfile::tempdir().unwrap();
        let service = DiscoveryService::new(&config(&dir, true), Arc::new(MockProvider::new())).unwrap();

        assert!(service.start());
        assert_eq!(service.status().unread_notifications, 1);

        assert_eq!(service.mark_read().unwrap(), 1);
        let status = service.status();
        assert_eq!(status.unread_notifications, 0);
        assert_eq!(status.total_notifications, 1);
        assert!(service.unread_notifications().is_empty());

        assert!(service.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_start_still_reports_running() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let service = DiscoveryService::new(&config(&dir, false), provider.clone()).unwrap();

        assert!(service.start());
        tokio::time::sleep(Duration::from_secs(60)).await;

        let status = service.status();
        assert!(status.is_running);
        assert_eq!(status.scheduling, SchedulingCapability::Unavailable);
        let categories: Vec<NotificationCategory> =
            service.unread_notifications().iter().map(|n| n.category).collect();
        assert_eq!(
            categories,
            vec![NotificationCategory::Info, NotificationCategory::Warning]
        );
        assert!(provider.calls().is_empty());

        service.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_notifications_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, true);

        {
            let service = DiscoveryService::new(&cfg, Arc::new(MockProvider::new())).unwrap();
            service.start();
            service.stop().await;
        }

        let service = DiscoveryService::new(&cfg, Arc::new(MockProvider::new())).unwrap();
        assert_eq!(service.status().total_notifications, 1);
    }
}
