use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::types::{
    default_catalog, default_columns, CalculatedMetric, DataSource, MetricDef, MetricKind,
    PeriodCounters, ReportColumn,
};

// ---------------------------------------------------------------------------
// ReportTable
// ---------------------------------------------------------------------------

/// One platform's report: an ordered metric catalog, an append-only column
/// sequence, and a raw-counter grid with per-cell provenance.
///
/// Invariant: every raw catalog key holds exactly one counter per column
/// (0.0 by default). Calculated metrics never have stored counters.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub platform: String,
    pub columns: Vec<ReportColumn>,
    pub catalog: Vec<MetricDef>,
    /// raw metric key → column name → value
    data: HashMap<String, HashMap<String, f64>>,
    /// raw metric key → column name → provenance
    sources: HashMap<String, HashMap<String, DataSource>>,
    pub summary: String,
}

impl ReportTable {
    pub fn new(platform: &str, weeks: usize, today: NaiveDate) -> Self {
        let columns = default_columns(weeks, today);
        let catalog = default_catalog();

        let mut table = Self {
            platform: platform.to_string(),
            columns: Vec::new(),
            catalog,
            data: HashMap::new(),
            sources: HashMap::new(),
            summary: format!(
                "{platform} performance summary will appear here. This section can be \
                 customized with insights, recommendations, and key takeaways."
            ),
        };
        for key in table.raw_keys() {
            table.data.insert(key.clone(), HashMap::new());
            table.sources.insert(key, HashMap::new());
        }
        for column in columns {
            // Zero-fills every raw metric, keeping the grid invariant.
            table.push_column(column);
        }
        table
    }

    pub fn raw_keys(&self) -> Vec<String> {
        self.catalog
            .iter()
            .filter(|m| m.kind == MetricKind::Raw)
            .map(|m| m.key.clone())
            .collect()
    }

    pub fn metric_def(&self, key: &str) -> Option<&MetricDef> {
        self.catalog.iter().find(|m| m.key == key)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn push_column(&mut self, column: ReportColumn) {
        for key in self.raw_keys() {
            self.data
                .entry(key.clone())
                .or_default()
                .insert(column.name.clone(), 0.0);
            self.sources
                .entry(key)
                .or_default()
                .insert(column.name.clone(), DataSource::Manual);
        }
        self.columns.push(column);
    }

    /// Append a reporting column, zero-filling every raw metric.
    pub fn add_column(&mut self, column: ReportColumn) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(AppError::Config(format!(
                "column already exists: {}",
                column.name
            )));
        }
        self.push_column(column);
        Ok(())
    }

    /// Register a user-defined raw metric, zero-filled across all columns.
    /// Calculated formulas are fixed; only raw metrics can be added.
    pub fn add_raw_metric(&mut self, def: MetricDef) -> Result<()> {
        if def.kind != MetricKind::Raw {
            return Err(AppError::InvalidMetric(
                "only raw metrics can be added".to_string(),
            ));
        }
        if CalculatedMetric::from_key(&def.key).is_some() || self.metric_def(&def.key).is_some() {
            return Err(AppError::InvalidMetric(format!(
                "metric key already exists: {}",
                def.key
            )));
        }
        let column_names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        self.data.insert(
            def.key.clone(),
            column_names.iter().map(|c| (c.clone(), 0.0)).collect(),
        );
        self.sources.insert(
            def.key.clone(),
            column_names
                .into_iter()
                .map(|c| (c, DataSource::Manual))
                .collect(),
        );
        self.catalog.push(def);
        Ok(())
    }

    /// Manual edit of one raw cell. Overwriting an API-sourced value retags
    /// it manual.
    pub fn set_cell(&mut self, metric_key: &str, column: &str, value: f64) -> Result<()> {
        let def = self
            .metric_def(metric_key)
            .ok_or_else(|| AppError::InvalidMetric(format!("unknown metric: {metric_key}")))?;
        if def.kind == MetricKind::Calculated {
            return Err(AppError::InvalidMetric(format!(
                "calculated metrics are derived on read: {metric_key}"
            )));
        }
        if !self.has_column(column) {
            return Err(AppError::ColumnNotFound(column.to_string()));
        }
        let value = if value.is_finite() { value } else { 0.0 };
        self.data
            .entry(metric_key.to_string())
            .or_default()
            .insert(column.to_string(), value);
        self.sources
            .entry(metric_key.to_string())
            .or_default()
            .insert(column.to_string(), DataSource::Manual);
        Ok(())
    }

    /// Bulk overwrite of one column from fetched counters. Only keys already
    /// in the catalog are written; cells are retagged as API-sourced.
    pub fn apply_fetched(&mut self, column: &str, counters: &PeriodCounters) -> Result<()> {
        if !self.has_column(column) {
            return Err(AppError::ColumnNotFound(column.to_string()));
        }
        for key in self.raw_keys() {
            let Some(value) = counters.0.get(&key) else { continue };
            let value = if value.is_finite() { *value } else { 0.0 };
            self.data
                .entry(key.clone())
                .or_default()
                .insert(column.to_string(), value);
            self.sources
                .entry(key)
                .or_default()
                .insert(column.to_string(), DataSource::Api);
        }
        Ok(())
    }

    /// Counters snapshot for one column, fed to the metrics engine.
    pub fn counters_for(&self, column: &str) -> PeriodCounters {
        let mut counters = PeriodCounters::new();
        for (key, per_column) in &self.data {
            if let Some(v) = per_column.get(column) {
                counters.set(key, *v);
            }
        }
        counters
    }

    pub fn cell_value(&self, metric_key: &str, column: &str) -> f64 {
        self.data
            .get(metric_key)
            .and_then(|per_column| per_column.get(column))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn cell_source(&self, metric_key: &str, column: &str) -> DataSource {
        self.sources
            .get(metric_key)
            .and_then(|per_column| per_column.get(column))
            .copied()
            .unwrap_or(DataSource::Manual)
    }
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// In-memory table registry, one `ReportTable` per platform, keyed by the
/// lowercased platform name. Tables are created on first access and replaced
/// wholesale on reset. Shared between the API handlers and the background
/// refresher.
pub struct ReportStore {
    tables: DashMap<String, ReportTable>,
    report_weeks: usize,
}

impl ReportStore {
    pub fn new(report_weeks: usize) -> Arc<Self> {
        Arc::new(Self {
            tables: DashMap::new(),
            report_weeks,
        })
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    pub fn table_id(platform: &str) -> String {
        platform.trim().to_lowercase()
    }

    /// Seed tables for the configured platforms at startup.
    pub fn seed(&self, platforms: &[String]) {
        for platform in platforms {
            self.tables
                .entry(Self::table_id(platform))
                .or_insert_with(|| ReportTable::new(platform, self.report_weeks, Self::today()));
        }
    }

    /// Run `f` against the table for `platform`, creating it on first access.
    pub fn with_table<R>(&self, platform: &str, f: impl FnOnce(&mut ReportTable) -> R) -> R {
        let mut entry = self
            .tables
            .entry(Self::table_id(platform))
            .or_insert_with(|| ReportTable::new(platform, self.report_weeks, Self::today()));
        f(entry.value_mut())
    }

    /// Clone of the current table for rendering/export, creating it on
    /// first access.
    pub fn snapshot(&self, platform: &str) -> ReportTable {
        self.with_table(platform, |t| t.clone())
    }

    /// Wholesale replacement with a fresh default table.
    pub fn reset(&self, platform: &str) {
        let display_name = self
            .tables
            .get(&Self::table_id(platform))
            .map(|t| t.platform.clone())
            .unwrap_or_else(|| platform.to_string());
        self.tables.insert(
            Self::table_id(platform),
            ReportTable::new(&display_name, self.report_weeks, Self::today()),
        );
    }

    pub fn platform_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FormatKind, MetricDef};

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 28).unwrap()
    }

    #[test]
    fn fresh_table_zero_fills_every_raw_cell() {
        let table = ReportTable::new("Facebook", 4, test_date());
        assert_eq!(table.columns.len(), 4);
        for key in table.raw_keys() {
            for column in &table.columns {
                assert_eq!(table.cell_value(&key, &column.name), 0.0);
                assert_eq!(table.cell_source(&key, &column.name), DataSource::Manual);
            }
        }
        // Calculated metrics never have stored counters.
        assert_eq!(table.counters_for("Week 1").0.get("ctr"), None);
    }

    #[test]
    fn set_cell_rejects_calculated_metrics() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        let err = table.set_cell("ctr", "Week 1", 5.0).unwrap_err();
        assert!(matches!(err, AppError::InvalidMetric(_)));
    }

    #[test]
    fn set_cell_rejects_unknown_column() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        let err = table.set_cell("spend", "Week 9", 5.0).unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound(_)));
    }

    #[test]
    fn add_metric_zero_fills_all_columns() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        table
            .add_raw_metric(MetricDef::raw("video_views", "Video Views", FormatKind::Number))
            .unwrap();
        for column in &table.columns {
            assert_eq!(table.cell_value("video_views", &column.name), 0.0);
        }
        assert_eq!(table.catalog.len(), 17);
    }

    #[test]
    fn add_metric_rejects_calculated_and_duplicate_keys() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        let dup = MetricDef::raw("spend", "Spend Again", FormatKind::Currency);
        assert!(table.add_raw_metric(dup).is_err());
        // A raw metric whose key collides with a fixed formula is rejected too.
        let shadow = MetricDef::raw("roas", "Roas", FormatKind::Ratio);
        assert!(table.add_raw_metric(shadow).is_err());
    }

    #[test]
    fn add_column_extends_every_raw_metric() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        table.set_cell("spend", "Week 4", 100.0).unwrap();
        let col = ReportColumn::new(
            "Black Friday",
            NaiveDate::from_ymd_opt(2024, 11, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
        );
        table.add_column(col).unwrap();
        assert_eq!(table.columns.len(), 5);
        for key in table.raw_keys() {
            assert_eq!(table.cell_value(&key, "Black Friday"), 0.0);
        }
        // Existing cells untouched.
        assert_eq!(table.cell_value("spend", "Week 4"), 100.0);
    }

    #[test]
    fn apply_fetched_marks_api_and_manual_edit_retags() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        let counters = PeriodCounters::from([("spend", 500.0), ("clicks", 250.0)]);
        table.apply_fetched("Week 1", &counters).unwrap();

        assert_eq!(table.cell_value("spend", "Week 1"), 500.0);
        assert_eq!(table.cell_source("spend", "Week 1"), DataSource::Api);
        // Keys the fetch did not supply keep their value and provenance.
        assert_eq!(table.cell_value("purchase", "Week 1"), 0.0);
        assert_eq!(table.cell_source("purchase", "Week 1"), DataSource::Manual);

        table.set_cell("spend", "Week 1", 510.0).unwrap();
        assert_eq!(table.cell_source("spend", "Week 1"), DataSource::Manual);
    }

    #[test]
    fn apply_fetched_ignores_keys_outside_catalog() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        let counters = PeriodCounters::from([("mystery_counter", 42.0)]);
        table.apply_fetched("Week 1", &counters).unwrap();
        assert_eq!(table.counters_for("Week 1").0.get("mystery_counter"), None);
    }

    #[test]
    fn counters_snapshot_feeds_engine() {
        let mut table = ReportTable::new("Facebook", 4, test_date());
        table.set_cell("clicks", "Week 2", 50.0).unwrap();
        table.set_cell("impressions", "Week 2", 1000.0).unwrap();
        let counters = table.counters_for("Week 2");
        let ctr = crate::engine::compute(&crate::types::MetricKey::parse("ctr"), &counters);
        assert!((ctr - 5.0).abs() < 1e-9);
    }

    #[test]
    fn store_creates_on_first_access_and_resets_wholesale() {
        let store = ReportStore::new(4);
        assert_eq!(store.table_count(), 0);

        store.with_table("TikTok", |t| {
            t.set_cell("spend", "Week 1", 777.0).unwrap();
        });
        assert_eq!(store.table_count(), 1);
        assert_eq!(store.snapshot("TikTok").cell_value("spend", "Week 1"), 777.0);

        store.reset("TikTok");
        let fresh = store.snapshot("tiktok");
        assert_eq!(fresh.cell_value("spend", "Week 1"), 0.0);
        assert_eq!(fresh.platform, "TikTok");
    }

    #[test]
    fn store_keys_are_case_insensitive() {
        let store = ReportStore::new(4);
        store.seed(&["Facebook".to_string()]);
        store.with_table("FACEBOOK", |t| {
            t.set_cell("spend", "Week 1", 9.0).unwrap();
        });
        assert_eq!(store.table_count(), 1);
        assert_eq!(store.snapshot("facebook").cell_value("spend", "Week 1"), 9.0);
    }
}
