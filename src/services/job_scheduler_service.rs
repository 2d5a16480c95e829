use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::errors::AppError;
use crate::models::{CycleSummary, NotificationCategory, SchedulingCapability};
use crate::services::discovery_service::StockDiscovery;
use crate::store::notifications::NotificationStore;

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub discovery: Arc<StockDiscovery>,
    pub notifications: Arc<Mutex<NotificationStore>>,
    pub retention_days: i64,
}

impl JobContext {
    pub fn notify(&self, message: impl Into<String>, category: NotificationCategory) {
        self.notifications.lock().append(message, category);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

/// A registered job plus its failure back-off. After a failed run, every
/// trigger inside the back-off window is skipped.
struct TrackedJob<F> {
    name: &'static str,
    context: JobContext,
    job_fn: F,
    backoff: Duration,
    backoff_until: Mutex<Option<Instant>>,
}

impl<F, Fut> TrackedJob<F>
where
    F: Fn(JobContext) -> Fut,
    Fut: Future<Output = Result<JobResult, AppError>>,
{
    fn new(name: &'static str, context: JobContext, job_fn: F, backoff: Duration) -> Self {
        Self {
            name,
            context,
            job_fn,
            backoff,
            backoff_until: Mutex::new(None),
        }
    }

    fn backing_off(&self) -> bool {
        matches!(*self.backoff_until.lock(), Some(until) if Instant::now() < until)
    }

    /// `None` when the run was skipped because of an earlier failure.
    async fn run(&self) -> Option<Result<JobResult, AppError>> {
        if self.backing_off() {
            debug!("⏸️ Skipping {} while backing off after a failure", self.name);
            return None;
        }

        let result = execute_job_with_tracking(self.name, (self.job_fn)(self.context.clone())).await;

        let until = match &result {
            Ok(_) => None,
            Err(_) => {
                warn!("Backing off {} for {:?}", self.name, self.backoff);
                Instant::now().checked_add(self.backoff)
            }
        };
        *self.backoff_until.lock() = until;

        Some(result)
    }
}

// Job tracking wrapper
async fn execute_job_with_tracking<Fut>(job_name: &str, job: Fut) -> Result<JobResult, AppError>
where
    Fut: Future<Output = Result<JobResult, AppError>>,
{
    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = match AssertUnwindSafe(job).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(AppError::Job(format!("{} panicked", job_name))),
    };

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match &result {
        Ok(job_result) => info!(
            "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
            job_name, job_result.items_processed, job_result.items_failed, duration_ms
        ),
        Err(e) => error!("❌ Job failed: {} - {} (duration: {}ms)", job_name, e, duration_ms),
    }

    result
}

struct RunningLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum LoopState {
    Stopped,
    Running(RunningLoop),
    // the old loop may still be alive until its join resolves
    Stopping,
}

/// Owns the background task that holds the [`JobScheduler`].
///
/// Stopped → Running → Stopping → Stopped; the state lock serializes
/// concurrent `start`/`stop` calls.
pub struct JobSchedulerService {
    context: JobContext,
    config: SchedulerConfig,
    capability: SchedulingCapability,
    state: Mutex<LoopState>,
}

impl JobSchedulerService {
    pub fn new(context: JobContext, config: SchedulerConfig, capability: SchedulingCapability) -> Self {
        Self {
            context,
            config,
            capability,
            state: Mutex::new(LoopState::Stopped),
        }
    }

    pub fn capability(&self) -> SchedulingCapability {
        self.capability
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), LoopState::Running(_))
    }

    /// Spawn the background loop. Returns false if it is already running or
    /// a previous loop is still shutting down. Must be called from within the
    /// tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            LoopState::Running(_) => return false,
            LoopState::Stopping => {
                warn!("Background service is still stopping, not starting");
                return false;
            }
            LoopState::Stopped => {}
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduled_tasks(
            self.context.clone(),
            self.config.clone(),
            self.capability,
            stop_rx,
        ));
        *state = LoopState::Running(RunningLoop { stop_tx, handle });
        drop(state);

        info!("🚀 Background stock service started successfully");
        self.context.notify("🚀 Background stock discovery service started", NotificationCategory::Info);
        true
    }

    /// Signal the loop and wait for it, at most `stop_timeout`. In-flight
    /// provider calls are not interrupted. Returns false if not running.
    pub async fn stop(&self) -> bool {
        let running = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LoopState::Stopping) {
                LoopState::Running(running) => Some(running),
                other => {
                    *state = other;
                    None
                }
            }
        };
        let Some(running) = running else {
            return false;
        };
        let _stopped = MarkStopped(&self.state);

        info!("Stopping background service...");
        let _ = running.stop_tx.send(true);

        if tokio::time::timeout(self.config.stop_timeout, running.handle).await.is_err() {
            debug!("Background loop did not exit within {:?}", self.config.stop_timeout);
        }

        info!("Background service stopped");
        true
    }
}

/// Puts the state back to `Stopped` when `stop` finishes or is cancelled.
struct MarkStopped<'a>(&'a Mutex<LoopState>);

impl Drop for MarkStopped<'_> {
    fn drop(&mut self) {
        *self.0.lock() = LoopState::Stopped;
    }
}

async fn run_scheduled_tasks(
    context: JobContext,
    config: SchedulerConfig,
    capability: SchedulingCapability,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut scheduler = match start_scheduler(&context, &config, capability).await {
        Ok(scheduler) => scheduler,
        Err(AppError::SchedulingUnavailable) => {
            warn!("{} - background scheduling disabled", AppError::SchedulingUnavailable);
            context.notify(
                "⚠️ Background scheduling disabled - scheduler unavailable",
                NotificationCategory::Warning,
            );
            return;
        }
        Err(e) => {
            error!("Failed to start job scheduler: {}", e);
            context.notify(
                format!("❌ Background scheduling failed to start: {}", e),
                NotificationCategory::Error,
            );
            return;
        }
    };

    let _ = stop_rx.wait_for(|stop| *stop).await;

    if let Err(e) = scheduler.shutdown().await {
        warn!("Job scheduler shutdown failed: {}", e);
    }
    debug!("Background loop exited");
}

async fn start_scheduler(
    context: &JobContext,
    config: &SchedulerConfig,
    capability: SchedulingCapability,
) -> Result<JobScheduler, AppError> {
    if capability == SchedulingCapability::Unavailable {
        return Err(AppError::SchedulingUnavailable);
    }

    info!("🚀 Starting job scheduler...");
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

    schedule_job(
        &scheduler,
        context,
        config,
        config.discovery_interval,
        "discover_new_stocks",
        discover_new_stocks,
    )
    .await?;

    schedule_job(
        &scheduler,
        context,
        config,
        config.cleanup_interval,
        "cleanup_notifications",
        cleanup_old_notifications,
    )
    .await?;

    scheduler
        .start()
        .await
        .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;

    Ok(scheduler)
}

/// Helper to schedule a repeating job with tracking
async fn schedule_job<F, Fut>(
    scheduler: &JobScheduler,
    context: &JobContext,
    config: &SchedulerConfig,
    period: Duration,
    job_name: &'static str,
    job_fn: F,
) -> Result<(), AppError>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
{
    let tracked = Arc::new(TrackedJob::new(job_name, context.clone(), job_fn, config.error_backoff));

    let job = Job::new_repeated_async(period, move |_uuid, _l| {
        let tracked = tracked.clone();
        Box::pin(async move {
            tracked.run().await;
        })
    })
    .map_err(|e| AppError::Scheduler(format!("Failed to create job {}: {}", job_name, e)))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| AppError::Scheduler(format!("Failed to add job {}: {}", job_name, e)))?;

    info!("📅 Scheduled: {} every {:?}", job_name, period);
    Ok(())
}

/// Run one discovery cycle and report the outcome as a notification.
/// `forced` bypasses the minimum refresh interval.
pub async fn check_for_new_stocks(ctx: &JobContext, forced: bool) -> CycleSummary {
    info!("Checking for new stocks...");

    let result = if forced {
        ctx.discovery.run_cycle().await
    } else {
        ctx.discovery.run_if_due().await
    };

    match result {
        Ok(summary) if summary.success && summary.new_stocks_count > 0 => {
            ctx.notify(
                format!(
                    "🎉 Discovered {} new stocks! {}",
                    summary.new_stocks_count, summary.message
                ),
                NotificationCategory::Success,
            );
            summary
        }
        Ok(summary) if summary.success => {
            info!("No new stocks found ({})", summary.message);
            summary
        }
        Ok(summary) => {
            ctx.notify(
                format!("⚠️ Stock discovery failed: {}", summary.message),
                NotificationCategory::Warning,
            );
            summary
        }
        Err(e) => {
            ctx.notify(format!("❌ Error in stock discovery: {}", e), NotificationCategory::Error);
            CycleSummary::failed(e)
        }
    }
}

pub async fn discover_new_stocks(ctx: JobContext) -> Result<JobResult, AppError> {
    let summary = check_for_new_stocks(&ctx, false).await;
    Ok(JobResult {
        items_processed: summary.new_stocks_count as i32,
        items_failed: if summary.success { 0 } else { 1 },
    })
}

pub async fn cleanup_old_notifications(ctx: JobContext) -> Result<JobResult, AppError> {
    let removed = ctx.notifications.lock().sweep(ctx.retention_days)?;
    Ok(JobResult {
        items_processed: removed as i32,
        items_failed: 0,
    })
}
