mod api;
mod config;
mod engine;
mod error;
mod export;
mod fetcher;
mod refresh;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::refresh::InsightsRefresher;
use crate::state::ReportStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- In-memory report tables ---
    let store = ReportStore::new(cfg.report_weeks);
    store.seed(&cfg.platforms);
    info!(
        "Seeded {} report tables ({} weeks each): {}",
        store.table_count(),
        cfg.report_weeks,
        cfg.platforms.join(", "),
    );

    let health = Arc::new(HealthState::new());

    // --- Graph API surface ---
    if cfg.graph_credentials_configured() {
        info!(
            account_id = %cfg.fb_account_id,
            "Graph API credentials configured; fetch endpoints enabled"
        );
        if cfg.fetch_interval_secs > 0 {
            let refresher =
                InsightsRefresher::new(cfg.clone(), Arc::clone(&store), Arc::clone(&health));
            info!(
                interval_secs = cfg.fetch_interval_secs,
                "starting background insights refresher"
            );
            tokio::spawn(async move { refresher.run().await });
        }
    } else {
        warn!("FB_ACCESS_TOKEN / FB_ACCOUNT_ID not set — tables accept manual edits only");
    }

    // --- HTTP API server ---
    let api_state = ApiState {
        store,
        cfg: cfg.clone(),
        health,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
