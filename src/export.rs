use serde::Serialize;

use crate::engine::{compute, format_value};
use crate::error::{AppError, Result};
use crate::state::ReportTable;
use crate::types::{MetricKey, MetricKind};

/// Flat row-oriented view of a report table: one header row, one row per
/// catalog metric, every cell already formatted for display.
#[derive(Debug, Clone, Serialize)]
pub struct ExportTable {
    pub header: Vec<String>,
    pub rows: Vec<ExportRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub metric: String,
    pub values: Vec<String>,
}

/// Flatten a table into formatted rows. Raw rows read stored counters;
/// calculated rows are derived on read, never stored.
pub fn render_table(table: &ReportTable) -> ExportTable {
    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("Metric".to_string());
    for column in &table.columns {
        header.push(format!("{} ({})", column.name, column.display_name));
    }

    let counters: Vec<_> = table
        .columns
        .iter()
        .map(|c| table.counters_for(&c.name))
        .collect();

    let rows = table
        .catalog
        .iter()
        .map(|def| {
            let key = MetricKey::parse(&def.key);
            let values = table
                .columns
                .iter()
                .zip(&counters)
                .map(|(column, column_counters)| {
                    let value = match def.kind {
                        MetricKind::Raw => table.cell_value(&def.key, &column.name),
                        MetricKind::Calculated => compute(&key, column_counters),
                    };
                    format_value(Some(value), def.format)
                })
                .collect();
            ExportRow {
                metric: def.name.clone(),
                values,
            }
        })
        .collect();

    ExportTable { header, rows }
}

/// Serialize the flattened table as CSV text (header row + metric rows).
pub fn to_csv(export: &ExportTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&export.header)?;
    for row in &export.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.metric.as_str());
        record.extend(row.values.iter().map(|v| v.as_str()));
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReportTable;
    use chrono::NaiveDate;

    fn test_table() -> ReportTable {
        let mut table = ReportTable::new(
            "Facebook",
            2,
            NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
        );
        table.set_cell("spend", "Week 2", 100.0).unwrap();
        table.set_cell("clicks", "Week 2", 50.0).unwrap();
        table.set_cell("impressions", "Week 2", 1000.0).unwrap();
        table.set_cell("purchase_revenue", "Week 2", 250.0).unwrap();
        table
    }

    #[test]
    fn header_carries_column_display_names() {
        let export = render_table(&test_table());
        assert_eq!(export.header[0], "Metric");
        assert_eq!(export.header[1], "Week 1 (03/15 - 03/21)");
        assert_eq!(export.header[2], "Week 2 (03/22 - 03/28)");
    }

    #[test]
    fn one_row_per_catalog_metric_in_order() {
        let table = test_table();
        let export = render_table(&table);
        assert_eq!(export.rows.len(), table.catalog.len());
        assert_eq!(export.rows[0].metric, "Spend");
        assert_eq!(export.rows[0].values, vec!["$0.00", "$100.00"]);
    }

    #[test]
    fn calculated_rows_derive_from_raw_cells() {
        let export = render_table(&test_table());
        let ctr = export.rows.iter().find(|r| r.metric == "CTR").unwrap();
        assert_eq!(ctr.values, vec!["0.00%", "5.00%"]);
        let roas = export.rows.iter().find(|r| r.metric == "ROAS").unwrap();
        assert_eq!(roas.values, vec!["0.00x", "2.50x"]);
    }

    #[test]
    fn csv_output_is_header_plus_metric_rows() {
        let export = render_table(&test_table());
        let csv_text = to_csv(&export).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 1 + export.rows.len());
        assert!(lines[0].starts_with("Metric,"));
        assert!(lines[1].starts_with("Spend,"));
        // Formatted values contain commas, so cells get quoted.
        let impressions_line = lines
            .iter()
            .find(|l| l.starts_with("Impressions"))
            .unwrap();
        assert!(impressions_line.contains("\"1,000\""));
    }
}
