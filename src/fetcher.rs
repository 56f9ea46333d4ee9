use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{Config, FETCH_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::{PeriodCounters, ReportColumn};

/// Result of pulling one reporting column from the Graph API. A failed pull
/// leaves the stored cells alone; `counters` is all-zero in that case.
#[derive(Debug)]
pub struct FetchOutcome {
    pub column: String,
    pub ok: bool,
    pub counters: PeriodCounters,
}

pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?)
}

/// Pull insights for every column of a table, one GET per column.
/// Failures are logged and reported per column, never propagated — the
/// caller decides what to do with the zeros.
pub async fn fetch_all_columns(cfg: &Config, columns: &[ReportColumn]) -> Vec<FetchOutcome> {
    let client = match build_client() {
        Ok(c) => c,
        Err(e) => {
            warn!("failed to build HTTP client: {e}");
            return columns
                .iter()
                .map(|c| FetchOutcome {
                    column: c.name.clone(),
                    ok: false,
                    counters: PeriodCounters::new(),
                })
                .collect();
        }
    };

    let mut outcomes = Vec::with_capacity(columns.len());
    for column in columns {
        match fetch_column_insights(&client, cfg, column).await {
            Ok(counters) => {
                debug!(
                    column = %column.name,
                    spend = counters.get("spend"),
                    clicks = counters.get("clicks"),
                    "insights fetched"
                );
                outcomes.push(FetchOutcome {
                    column: column.name.clone(),
                    ok: true,
                    counters,
                });
            }
            Err(e) => {
                warn!(column = %column.name, "Graph API fetch failed: {e}");
                outcomes.push(FetchOutcome {
                    column: column.name.clone(),
                    ok: false,
                    counters: PeriodCounters::new(),
                });
            }
        }
    }
    outcomes
}

/// One account-level insights request for a date range, daily rows summed
/// into the raw-key vocabulary. An empty `data` array yields zeros.
pub async fn fetch_column_insights(
    client: &reqwest::Client,
    cfg: &Config,
    column: &ReportColumn,
) -> Result<PeriodCounters> {
    if !cfg.graph_credentials_configured() {
        return Err(AppError::CredentialsMissing);
    }

    let url = format!(
        "{}/act_{}/insights",
        cfg.graph_api_url, cfg.fb_account_id
    );
    let time_range = serde_json::json!({
        "since": column.start_date.format("%Y-%m-%d").to_string(),
        "until": column.end_date.format("%Y-%m-%d").to_string(),
    })
    .to_string();

    let resp: serde_json::Value = client
        .get(&url)
        .query(&[
            ("access_token", cfg.fb_access_token.as_str()),
            ("fields", "spend,impressions,clicks,actions,action_values"),
            ("time_range", time_range.as_str()),
            ("level", "account"),
            ("time_increment", "1"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let rows = resp
        .get("data")
        .and_then(|d| d.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(parse_insights_rows(&rows, &cfg.purchase_action_types))
}

/// Sum daily insight rows into one counters snapshot. The Graph API returns
/// most numbers as strings; anything non-numeric reads as 0.
pub fn parse_insights_rows(
    rows: &[serde_json::Value],
    purchase_action_types: &[String],
) -> PeriodCounters {
    let mut counters = PeriodCounters::new();
    for key in [
        "spend",
        "impressions",
        "clicks",
        "add_to_cart",
        "checkout",
        "purchase",
        "purchase_revenue",
    ] {
        counters.set(key, 0.0);
    }

    for day in rows {
        counters.add("spend", field_as_f64(day, "spend"));
        counters.add("impressions", field_as_f64(day, "impressions"));
        counters.add("clicks", field_as_f64(day, "clicks"));

        for action in day.get("actions").and_then(|a| a.as_array()).into_iter().flatten() {
            let Some(action_type) = action.get("action_type").and_then(|t| t.as_str()) else {
                continue;
            };
            let value = field_as_f64(action, "value");
            if action_type == "add_to_cart" {
                counters.add("add_to_cart", value);
            } else if action_type == "initiate_checkout" {
                counters.add("checkout", value);
            } else if purchase_action_types.iter().any(|t| t == action_type) {
                counters.add("purchase", value);
            }
        }

        for action_value in day
            .get("action_values")
            .and_then(|a| a.as_array())
            .into_iter()
            .flatten()
        {
            let Some(action_type) = action_value.get("action_type").and_then(|t| t.as_str())
            else {
                continue;
            };
            if purchase_action_types.iter().any(|t| t == action_type) {
                counters.add("purchase_revenue", field_as_f64(action_value, "value"));
            }
        }
    }

    counters
}

/// Read a field as f64, accepting both JSON numbers and numeric strings.
fn field_as_f64(v: &serde_json::Value, field: &str) -> f64 {
    v.get(field)
        .and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0.0)
}
