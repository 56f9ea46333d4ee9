use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::fetcher::fetch_all_columns;
use crate::state::ReportStore;

/// The platform whose table the periodic Graph pull feeds.
const REFRESH_PLATFORM: &str = "facebook";

/// Background task that re-pulls Graph API insights for the Facebook table
/// on a fixed interval. Manual edits made between refreshes are overwritten
/// by the next pull, matching the bulk-overwrite semantics of an explicit
/// fetch.
pub struct InsightsRefresher {
    cfg: Config,
    store: Arc<ReportStore>,
    health: Arc<HealthState>,
}

impl InsightsRefresher {
    pub fn new(cfg: Config, store: Arc<ReportStore>, health: Arc<HealthState>) -> Self {
        Self { cfg, store, health }
    }

    pub async fn run(self) {
        if self.cfg.fetch_interval_secs == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.fetch_interval_secs));
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            let (applied, failed) =
                refresh_table(&self.cfg, &self.store, &self.health, REFRESH_PLATFORM).await;
            info!(
                platform = REFRESH_PLATFORM,
                applied, failed, "insights refresh cycle complete"
            );
        }
    }
}

/// Pull every column of one table and apply the successful fetches.
/// Returns `(columns_applied, columns_failed)`.
pub async fn refresh_table(
    cfg: &Config,
    store: &Arc<ReportStore>,
    health: &Arc<HealthState>,
    platform: &str,
) -> (usize, usize) {
    let columns = store.snapshot(platform).columns;
    let outcomes = fetch_all_columns(cfg, &columns).await;

    let mut applied = 0usize;
    let mut failed = 0usize;
    for outcome in outcomes {
        if outcome.ok {
            let result = store.with_table(platform, |t| {
                t.apply_fetched(&outcome.column, &outcome.counters)
            });
            match result {
                Ok(()) => {
                    applied += 1;
                    health.inc_fetch_ok();
                }
                Err(e) => {
                    warn!(column = %outcome.column, "could not apply fetched counters: {e}");
                    failed += 1;
                    health.inc_fetch_error();
                }
            }
        } else {
            failed += 1;
            health.inc_fetch_error();
        }
    }
    health.set_last_fetch_at_ns(now_ns());
    (applied, failed)
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
