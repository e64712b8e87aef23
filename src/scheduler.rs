use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::cycle::run_cycle;

/// Runs bot cycles on the configured cron expression or interval.
///
/// At most one cycle runs at a time; a tick that fires while the previous
/// cycle is still working is skipped.
pub struct Scheduler {
    config: Arc<Config>,
    guard: Arc<Mutex<()>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Runs until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(event = "scheduler_started", "Starting background scheduler");

        if let Some(cron_expr) = &self.config.scheduler.cron_expression {
            self.run_with_cron(cron_expr, shutdown).await
        } else {
            self.run_with_interval(shutdown).await
        }
    }

    async fn run_with_cron<F>(&self, cron_expr: &str, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut sched = JobScheduler::new().await?;

        let config = Arc::clone(&self.config);
        let guard = Arc::clone(&self.guard);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let config = Arc::clone(&config);
            let guard = Arc::clone(&guard);
            Box::pin(async move {
                guarded_cycle(&config, &guard).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        shutdown.await;

        sched.shutdown().await?;
        self.wait_for_cycle().await;
        Ok(())
    }

    async fn run_with_interval<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let interval_mins = self.config.scheduler.check_interval_minutes;

        info!("Scheduler running every {} minutes", interval_mins);

        let mut check_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        check_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = check_interval.tick() => {
                    guarded_cycle(&self.config, &self.guard).await;
                }
            }
        }

        Ok(())
    }

    /// Lets an in-flight cron cycle finish before returning.
    async fn wait_for_cycle(&self) {
        let _done = self.guard.lock().await;
    }
}

async fn guarded_cycle(config: &Config, guard: &Mutex<()>) {
    let Ok(_running) = guard.try_lock() else {
        warn!(
            event = "cycle_skipped",
            "Previous cycle still running, skipping this tick"
        );
        return;
    };

    info!("Running scheduled cycle...");
    if let Err(e) = run_cycle(config).await {
        error!(event = "cycle_failed", error = %format!("{e:#}"), "Scheduled cycle failed");
    }
}
