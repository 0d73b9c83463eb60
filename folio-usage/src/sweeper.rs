use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::UsageResult;
use crate::settings::UsageSettings;
use crate::store::UsageWindowStore;
use crate::window::retention_cutoff;

/// Periodic purge of usage windows past the retention cutoff.
///
/// Only expired windows are touched, so a sweep never waits on a live
/// quota check.
pub struct RetentionSweeper {
    store: Arc<dyn UsageWindowStore>,
    retention_months: u32,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn UsageWindowStore>, settings: &UsageSettings) -> Self {
        Self {
            store,
            retention_months: settings.retention_months(),
            interval: settings.sweep_interval(),
        }
    }

    /// Run one sweep relative to `now`. Returns the number of records removed.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> UsageResult<usize> {
        let cutoff = retention_cutoff(now, self.retention_months);
        self.store.delete_older_than(cutoff).await
    }

    /// Sweep forever on the configured interval.
    pub async fn start(self) {
        let mut ticker = interval(self.interval);

        info!(
            "Starting usage retention sweeper: interval {:?}, keeping {} month(s)",
            self.interval, self.retention_months
        );

        loop {
            ticker.tick().await;

            match self.sweep_once(Utc::now()).await {
                Ok(removed) if removed > 0 => {
                    info!("Removed {} outdated tenant usage window(s)", removed);
                }
                Ok(_) => debug!("No outdated tenant usage windows found"),
                Err(e) => warn!("Error during usage retention sweep: {}", e),
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.start())
    }
}
