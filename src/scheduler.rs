//! Periodic refresh trigger
//!
//! Calls [`NewsService::refresh_all`] on a fixed interval until shutdown. The
//! first tick fires immediately, which doubles as the startup refresh. A
//! cycle that overruns the interval delays the next one rather than
//! stacking up.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::service::NewsService;

pub struct RefreshScheduler {
    service: NewsService,
    every: Duration,
}

impl RefreshScheduler {
    pub fn new(service: NewsService, every: Duration) -> Self {
        Self {
            service,
            every: every.max(Duration::from_millis(1)),
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs until `shutdown` fires; a cycle in progress is allowed to finish
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = %humantime::format_duration(self.every), "Refresh scheduler started");

        let mut cycles: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    cycles += 1;
                    let summary = self.service.refresh_all().await;
                    info!(
                        cycle = cycles,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Scheduled refresh finished"
                    );
                }
                _ = shutdown.recv() => {
                    info!(cycles = cycles, "Refresh scheduler stopped");
                    break;
                }
            }
        }
    }
}
