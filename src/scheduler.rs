use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::tracker::{CycleSummary, Tracker};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub interval_minutes: u64,
    pub completed_runs: u64,
    pub failed_runs: u64,
    /// Ticks dropped because the previous cycle was still running.
    pub skipped_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_summary: Option<CycleSummary>,
    pub last_error: Option<String>,
    pub average_run_time_ms: f64,
    pub uptime_seconds: u64,
}

/// Runs a full price check cycle at a fixed interval.
pub struct CycleScheduler {
    scheduler: JobScheduler,
    tracker: Tracker,
    config: SchedulerConfig,
    stats: Arc<RwLock<SchedulerStats>>,
    cycle_guard: Arc<Mutex<()>>,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl CycleScheduler {
    pub async fn new(tracker: Tracker, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        let stats = SchedulerStats {
            interval_minutes: config.check_interval_minutes,
            ..SchedulerStats::default()
        };

        Ok(Self {
            scheduler,
            tracker,
            config,
            stats: Arc::new(RwLock::new(stats)),
            cycle_guard: Arc::new(Mutex::new(())),
            job_id: None,
            start_time: Utc::now(),
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.check_interval_minutes * 60)
    }

    pub async fn start(&mut self) -> Result<()> {
        let tracker = self.tracker.clone();
        let stats = Arc::clone(&self.stats);
        let guard = Arc::clone(&self.cycle_guard);

        let job = Job::new_repeated_async(self.interval(), move |_uuid, _l| {
            let tracker = tracker.clone();
            let stats = Arc::clone(&stats);
            let guard = Arc::clone(&guard);

            Box::pin(async move {
                Self::execute_cycle(tracker, guard, stats).await;
            })
        })?;

        self.job_id = Some(self.scheduler.add(job).await?);
        self.scheduler.start().await?;
        tracing::info!(
            interval_minutes = self.config.check_interval_minutes,
            "Cycle scheduler started"
        );

        if self.config.run_on_start {
            let tracker = self.tracker.clone();
            let stats = Arc::clone(&self.stats);
            let guard = Arc::clone(&self.cycle_guard);
            tokio::spawn(async move {
                Self::execute_cycle(tracker, guard, stats).await;
            });
        }

        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }
        self.scheduler.shutdown().await?;
        tracing::info!("Cycle scheduler shutdown");
        Ok(())
    }

    /// Runs a cycle immediately. Returns `None` when one is already in progress.
    pub async fn run_now(&self) -> Option<CycleSummary> {
        Self::execute_cycle(
            self.tracker.clone(),
            Arc::clone(&self.cycle_guard),
            Arc::clone(&self.stats),
        )
        .await
    }

    pub async fn is_cycle_running(&self) -> bool {
        self.cycle_guard.try_lock().is_err()
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let mut stats = self.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }

    async fn execute_cycle(
        tracker: Tracker,
        guard: Arc<Mutex<()>>,
        stats: Arc<RwLock<SchedulerStats>>,
    ) -> Option<CycleSummary> {
        let Ok(_running) = guard.try_lock() else {
            tracing::warn!("Previous price check cycle still running, skipping this one");
            stats.write().await.skipped_runs += 1;
            return None;
        };

        let start_time = tokio::time::Instant::now();
        let result = tracker.run_cycle().await;
        let elapsed_ms = start_time.elapsed().as_millis() as f64;

        let mut stats = stats.write().await;
        stats.last_run = Some(Utc::now());
        match result {
            Ok(summary) => {
                let runs = stats.completed_runs as f64;
                stats.average_run_time_ms = (stats.average_run_time_ms * runs + elapsed_ms) / (runs + 1.0);
                stats.completed_runs += 1;
                stats.last_summary = Some(summary.clone());
                stats.last_error = None;
                Some(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "Price check cycle failed");
                stats.failed_runs += 1;
                stats.last_error = Some(e.to_string());
                None
            }
        }
    }
}
