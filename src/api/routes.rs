use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::engine::{compute, format_value};
use crate::error::AppError;
use crate::export::{render_table, to_csv};
use crate::refresh::refresh_table;
use crate::state::{ReportStore, ReportTable};
use crate::types::{
    metric_key_from_name, DataSource, FormatKind, MetricDef, MetricKey, MetricKind, ReportColumn,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ReportStore>,
    pub cfg: Config,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/:platform", get(get_table))
        .route("/tables/:platform/cells", put(put_cell))
        .route("/tables/:platform/metrics", post(post_metric))
        .route("/tables/:platform/columns", post(post_column))
        .route("/tables/:platform/summary", put(put_summary))
        .route("/tables/:platform/reset", post(reset_table))
        .route("/tables/:platform/fetch", post(fetch_table))
        .route("/tables/:platform/export.csv", get(export_csv))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CellEdit {
    pub metric: String,
    pub column: String,
    pub value: f64,
}

#[derive(Deserialize)]
pub struct NewMetric {
    pub name: String,
    pub format: FormatKind,
}

#[derive(Deserialize)]
pub struct NewColumn {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct SummaryUpdate {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TableListEntry {
    pub id: String,
    pub platform: String,
    pub columns: usize,
    pub metrics: usize,
}

#[derive(Serialize)]
pub struct CellResponse {
    pub column: String,
    pub value: f64,
    pub formatted: String,
    /// Provenance tag; None for calculated rows (nothing is stored for them).
    pub source: Option<DataSource>,
}

#[derive(Serialize)]
pub struct MetricRowResponse {
    pub key: String,
    pub name: String,
    pub kind: MetricKind,
    pub format: FormatKind,
    pub cells: Vec<CellResponse>,
}

#[derive(Serialize)]
pub struct TableResponse {
    pub platform: String,
    pub summary: String,
    pub columns: Vec<ReportColumn>,
    pub metrics: Vec<MetricRowResponse>,
}

#[derive(Serialize)]
pub struct FetchResponse {
    pub platform: String,
    pub applied: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub tables: usize,
    pub last_fetch_at_ns: u64,
    pub fetch_ok_total: u64,
    pub fetch_error_total: u64,
    pub graph_credentials_configured: bool,
}

fn table_response(table: &ReportTable) -> TableResponse {
    let counters: Vec<_> = table
        .columns
        .iter()
        .map(|c| table.counters_for(&c.name))
        .collect();

    let metrics = table
        .catalog
        .iter()
        .map(|def| {
            let key = MetricKey::parse(&def.key);
            let cells = table
                .columns
                .iter()
                .zip(&counters)
                .map(|(column, column_counters)| {
                    let (value, source) = match def.kind {
                        MetricKind::Raw => (
                            table.cell_value(&def.key, &column.name),
                            Some(table.cell_source(&def.key, &column.name)),
                        ),
                        MetricKind::Calculated => (compute(&key, column_counters), None),
                    };
                    CellResponse {
                        column: column.name.clone(),
                        value,
                        formatted: format_value(Some(value), def.format),
                        source,
                    }
                })
                .collect();
            MetricRowResponse {
                key: def.key.clone(),
                name: def.name.clone(),
                kind: def.kind,
                format: def.format,
                cells,
            }
        })
        .collect();

    TableResponse {
        platform: table.platform.clone(),
        summary: table.summary.clone(),
        columns: table.columns.clone(),
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_tables(State(state): State<ApiState>) -> Json<Vec<TableListEntry>> {
    let entries = state
        .store
        .platform_ids()
        .into_iter()
        .map(|id| {
            let table = state.store.snapshot(&id);
            TableListEntry {
                id,
                platform: table.platform.clone(),
                columns: table.columns.len(),
                metrics: table.catalog.len(),
            }
        })
        .collect();
    Json(entries)
}

async fn get_table(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
) -> Json<TableResponse> {
    let table = state.store.snapshot(&platform);
    Json(table_response(&table))
}

async fn put_cell(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
    Json(edit): Json<CellEdit>,
) -> Result<Json<TableResponse>, AppError> {
    state
        .store
        .with_table(&platform, |t| t.set_cell(&edit.metric, &edit.column, edit.value))?;
    Ok(Json(table_response(&state.store.snapshot(&platform))))
}

async fn post_metric(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
    Json(body): Json<NewMetric>,
) -> Result<Json<TableResponse>, AppError> {
    let key = metric_key_from_name(&body.name);
    if key.is_empty() {
        return Err(AppError::InvalidMetric("metric name is empty".to_string()));
    }
    let def = MetricDef::raw(&key, body.name.trim(), body.format);
    state.store.with_table(&platform, |t| t.add_raw_metric(def))?;
    Ok(Json(table_response(&state.store.snapshot(&platform))))
}

async fn post_column(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
    Json(body): Json<NewColumn>,
) -> Result<Json<TableResponse>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::Config("column name is empty".to_string()));
    }
    if body.end_date < body.start_date {
        return Err(AppError::Config(
            "column end_date precedes start_date".to_string(),
        ));
    }
    let column = ReportColumn::new(body.name.trim(), body.start_date, body.end_date);
    state.store.with_table(&platform, |t| t.add_column(column))?;
    Ok(Json(table_response(&state.store.snapshot(&platform))))
}

async fn put_summary(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
    Json(body): Json<SummaryUpdate>,
) -> Json<TableResponse> {
    state.store.with_table(&platform, |t| {
        t.summary = body.text.clone();
    });
    Json(table_response(&state.store.snapshot(&platform)))
}

async fn reset_table(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
) -> Json<TableResponse> {
    state.store.reset(&platform);
    Json(table_response(&state.store.snapshot(&platform)))
}

/// Synchronous Graph pull across every column of the table. Columns that
/// fail to fetch keep their stored values.
async fn fetch_table(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
) -> Result<Json<FetchResponse>, AppError> {
    if !state.cfg.graph_credentials_configured() {
        return Err(AppError::CredentialsMissing);
    }
    let (applied, failed) =
        refresh_table(&state.cfg, &state.store, &state.health, &platform).await;
    Ok(Json(FetchResponse {
        platform: ReportStore::table_id(&platform),
        applied,
        failed,
    }))
}

async fn export_csv(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
) -> Result<([(header::HeaderName, &'static str); 1], String), AppError> {
    let table = state.store.snapshot(&platform);
    let csv_text = to_csv(&render_table(&table))?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv_text))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        tables: state.store.table_count(),
        last_fetch_at_ns: state.health.last_fetch_at_ns(),
        fetch_ok_total: state.health.fetch_ok_total(),
        fetch_error_total: state.health.fetch_error_total(),
        graph_credentials_configured: state.cfg.graph_credentials_configured(),
    })
}
