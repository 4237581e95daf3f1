//! Background refresh scheduling
//!
//! Full refreshes run every Sunday at 00:00 UTC and fast-moving refreshes
//! every day at 02:00 UTC.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::refresh::{RefreshReport, RefreshScope, Refresher};

const FULL_RUN_HOUR: u32 = 0;
const FAST_RUN_HOUR: u32 = 2;

/// Next Sunday 00:00 UTC strictly after `now`
pub fn next_full_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_until_sunday = 7 - u64::from(now.weekday().num_days_from_sunday());
    let candidate = at_hour(now, FULL_RUN_HOUR);
    if now.weekday().num_days_from_sunday() == 0 && candidate > now {
        return candidate;
    }
    candidate + Days::new(days_until_sunday)
}

/// Next 02:00 UTC strictly after `now`
pub fn next_fast_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = at_hour(now, FAST_RUN_HOUR);
    if candidate > now {
        candidate
    } else {
        candidate + Days::new(1)
    }
}

fn at_hour(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&now.date_naive().and_time(time))
}

fn until(target: DateTime<Utc>) -> Duration {
    (target - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

/// Owns the background refresh task
pub struct Scheduler {
    refresher: Arc<Refresher>,
    task: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new(refresher: Arc<Refresher>) -> Self {
        Self {
            refresher,
            task: Mutex::new(None),
        }
    }

    pub fn refresher(&self) -> &Arc<Refresher> {
        &self.refresher
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|(_, handle)| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Spawn the background task; calling it again while running is a no-op
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            warn!("Scheduler state poisoned, not starting");
            return;
        };
        if task.as_ref().is_some_and(|(_, handle)| !handle.is_finished()) {
            debug!("Scheduler already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.refresher.clone(), shutdown_rx));
        *task = Some((shutdown_tx, handle));

        let now = Utc::now();
        info!(
            "Scheduler started: next full refresh at {}, next fast refresh at {}",
            next_full_run(now),
            next_fast_run(now)
        );
    }

    /// Signal shutdown and wait up to one fetch timeout before aborting
    pub async fn stop(&self) {
        let Some((shutdown_tx, mut handle)) = self.task.lock().ok().and_then(|mut task| task.take())
        else {
            return;
        };

        let _ = shutdown_tx.send(true);
        match tokio::time::timeout(Duration::from_millis(FETCH_TIMEOUT_MS), &mut handle).await {
            Ok(_) => info!("Scheduler stopped"),
            Err(_) => {
                warn!("Scheduler did not stop in time, aborting");
                handle.abort();
            }
        }
    }

    /// Run a refresh now, outside the schedule
    pub async fn trigger(&self, scope: RefreshScope) -> RefreshReport {
        info!("Manual {} refresh triggered", scope.as_str());
        self.refresher.run(scope).await
    }
}

async fn run_loop(refresher: Arc<Refresher>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let now = Utc::now();
        let full_at = next_full_run(now);
        let fast_at = next_fast_run(now);
        // Both fire on Sunday at different hours; take whichever comes first
        let (scope, at) = if full_at <= fast_at {
            (RefreshScope::Full, full_at)
        } else {
            (RefreshScope::FastMoving, fast_at)
        };
        debug!("Next scheduled {} refresh at {}", scope.as_str(), at);

        tokio::select! {
            _ = tokio::time::sleep(until(at)) => {
                let report = refresher.run(scope).await;
                info!(
                    "Scheduled {} refresh done: {} updated, {} failed",
                    scope.as_str(),
                    report.updated.len(),
                    report.failed.len()
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Scheduler loop shutting down");
                    return;
                }
            }
        }
    }
}
