use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{GameApi, ScanSummary};

/// The accrual scan runs once per real-time minute.
pub const DEFAULT_ACCRUAL_INTERVAL: Duration = Duration::from_secs(60);

/// Eligibility margin: an account must be at least this much older than the
/// tick before it is scanned again.
pub const DEFAULT_ACCRUAL_MARGIN_SECONDS: i64 = 1;

/// Periodic passive-income scheduler. Ticks are single-flight: if a scan is
/// still running when the next tick fires, the tick is skipped and logged,
/// so at most one scan is ever in flight.
pub struct IncomeClock {
    api: Arc<Mutex<GameApi>>,
    scan_flight: Arc<Mutex<()>>,
    interval: Duration,
    margin_seconds: i64,
}

impl IncomeClock {
    pub fn new(api: Arc<Mutex<GameApi>>) -> Self {
        Self::with_schedule(api, DEFAULT_ACCRUAL_INTERVAL, DEFAULT_ACCRUAL_MARGIN_SECONDS)
    }

    pub fn with_schedule(
        api: Arc<Mutex<GameApi>>,
        interval: Duration,
        margin_seconds: i64,
    ) -> Self {
        Self {
            api,
            scan_flight: Arc::new(Mutex::new(())),
            interval,
            margin_seconds,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_tick().await;
            }
        })
    }

    /// One tick of the clock. Returns `None` when the single-flight guard
    /// rejects the tick because the previous scan is still running.
    pub async fn run_tick(&self) -> Option<ScanSummary> {
        let Ok(_flight) = self.scan_flight.try_lock() else {
            log::warn!("[income-clock] tick skipped: previous scan still running");
            return None;
        };

        let started = Utc::now();
        log::info!("[income-clock] scan start: {started}");

        let summary = {
            let mut api = self.api.lock().await;
            api.run_accrual_scan(started, self.margin_seconds)
        };

        log::info!(
            "[income-clock] scan done: scanned={} credited={} contested={} failed={} total_added={:.2}",
            summary.scanned,
            summary.credited,
            summary.contested,
            summary.failed,
            summary.total_added
        );

        Some(summary)
    }
}
