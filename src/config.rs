use crate::error::{AppError, Result};

pub const GRAPH_API_URL: &str = "https://graph.facebook.com/v18.0";

/// Platforms seeded at startup. "summary" is a cross-channel table the user
/// fills in by hand; the store treats it like any other platform.
pub const DEFAULT_PLATFORMS: &str = "Facebook,Google,LinkedIn,TikTok,Microsoft,Summary";

/// Action types counted as a purchase when aggregating Graph API insights.
/// Overridable via PURCHASE_ACTION_TYPES — ad accounts disagree on whether
/// registrations count as conversions.
pub const DEFAULT_PURCHASE_ACTION_TYPES: &str = "purchase,complete_registration";

/// Number of trailing whole weeks a fresh report table is seeded with.
pub const DEFAULT_REPORT_WEEKS: usize = 4;

/// Per-request timeout for Graph API calls (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub graph_api_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Graph API access token (FB_ACCESS_TOKEN). Fetch surface is disabled when empty.
    pub fb_access_token: String,
    /// Ad account ID, digits only, no "act_" prefix (FB_ACCOUNT_ID).
    pub fb_account_id: String,
    /// Platform tables seeded at startup (PLATFORMS, comma-separated).
    pub platforms: Vec<String>,
    /// Weeks per fresh table (REPORT_WEEKS).
    pub report_weeks: usize,
    /// Background refresh interval in seconds; 0 disables (FETCH_INTERVAL_SECS).
    pub fetch_interval_secs: u64,
    /// Action types summed into the purchase counters (PURCHASE_ACTION_TYPES).
    pub purchase_action_types: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            graph_api_url: std::env::var("GRAPH_API_URL")
                .unwrap_or_else(|_| GRAPH_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            fb_access_token: std::env::var("FB_ACCESS_TOKEN").unwrap_or_default(),
            fb_account_id: std::env::var("FB_ACCOUNT_ID").unwrap_or_default(),
            platforms: split_list(
                &std::env::var("PLATFORMS").unwrap_or_else(|_| DEFAULT_PLATFORMS.to_string()),
            ),
            report_weeks: std::env::var("REPORT_WEEKS")
                .unwrap_or_else(|_| DEFAULT_REPORT_WEEKS.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_REPORT_WEEKS)
                .max(1),
            fetch_interval_secs: std::env::var("FETCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u64>()
                .unwrap_or(0),
            purchase_action_types: split_list(
                &std::env::var("PURCHASE_ACTION_TYPES")
                    .unwrap_or_else(|_| DEFAULT_PURCHASE_ACTION_TYPES.to_string()),
            ),
        })
    }

    /// Both credentials present — the Graph fetch surface is usable.
    pub fn graph_credentials_configured(&self) -> bool {
        !self.fb_access_token.is_empty() && !self.fb_account_id.is_empty()
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        let parts = split_list(" Facebook, Google ,,TikTok ");
        assert_eq!(parts, vec!["Facebook", "Google", "TikTok"]);
    }
}
