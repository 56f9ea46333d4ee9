use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct TableListEntry {
    pub id: String,
    pub platform: String,
    pub columns: usize,
    pub metrics: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct ColumnResponse {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct CellResponse {
    pub column: String,
    pub value: f64,
    pub formatted: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct MetricRowResponse {
    pub key: String,
    pub name: String,
    pub kind: String,
    pub format: String,
    pub cells: Vec<CellResponse>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct TableResponse {
    pub platform: String,
    pub summary: String,
    pub columns: Vec<ColumnResponse>,
    pub metrics: Vec<MetricRowResponse>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub tables: Option<usize>,
    pub last_fetch_at_ns: Option<u64>,
    pub fetch_ok_total: Option<u64>,
    pub fetch_error_total: Option<u64>,
    pub graph_credentials_configured: Option<bool>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub tables: Vec<TableListEntry>,
    pub selected: usize,
    pub table: Option<TableResponse>,
    pub health: HealthResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            tables: Vec::new(),
            selected: 0,
            table: None,
            health: HealthResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn selected_platform(&self) -> Option<&str> {
        self.tables.get(self.selected).map(|t| t.id.as_str())
    }

    pub fn select_next(&mut self) {
        if !self.tables.is_empty() {
            self.selected = (self.selected + 1).min(self.tables.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let tables_url = format!("{}/tables", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (tables_res, health_res) = tokio::join!(
            client.get(&tables_url).send(),
            client.get(&health_url).send(),
        );

        let tables_resp = match tables_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        match tables_resp.json::<Vec<TableListEntry>>().await {
            Ok(tables) => {
                self.selected = self.selected.min(tables.len().saturating_sub(1));
                self.tables = tables;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }

        if let Some(platform) = self.selected_platform().map(str::to_string) {
            self.fetch_table(client, &platform).await;
        }
    }

    /// Fetch the rendered table for one platform and store it for display.
    pub async fn fetch_table(&mut self, client: &reqwest::Client, platform: &str) {
        let url = format!("{}/tables/{}", self.base_url, platform);
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(table) = resp.json::<TableResponse>().await {
                    self.table = Some(table);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Convert nanosecond epoch timestamp to HH:MM:SS string.
pub fn format_time_ns(ns: u64) -> String {
    if ns == 0 {
        return "never".to_string();
    }
    let secs = ns / 1_000_000_000;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn main() {
    // TUI entry point lives in src/bin/tui.rs
}
