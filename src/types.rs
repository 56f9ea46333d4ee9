use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Metric catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Currency,
    Percentage,
    Ratio,
    Number,
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FormatKind::Currency => "currency",
            FormatKind::Percentage => "percentage",
            FormatKind::Ratio => "ratio",
            FormatKind::Number => "number",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Raw,
    Calculated,
}

/// The fixed set of derived metrics. Formulas live in the engine; users can
/// add raw metrics at runtime but never new calculated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatedMetric {
    Ctr,
    Cpm,
    Cpc,
    AtcRate,
    CheckoutRate,
    PurchaseRate,
    ClickToPurchase,
    Roas,
    CostPerPurchase,
}

impl CalculatedMetric {
    pub const ALL: [CalculatedMetric; 9] = [
        CalculatedMetric::Ctr,
        CalculatedMetric::Cpm,
        CalculatedMetric::Cpc,
        CalculatedMetric::AtcRate,
        CalculatedMetric::CheckoutRate,
        CalculatedMetric::PurchaseRate,
        CalculatedMetric::ClickToPurchase,
        CalculatedMetric::Roas,
        CalculatedMetric::CostPerPurchase,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CalculatedMetric::Ctr => "ctr",
            CalculatedMetric::Cpm => "cpm",
            CalculatedMetric::Cpc => "cpc",
            CalculatedMetric::AtcRate => "atc_rate",
            CalculatedMetric::CheckoutRate => "checkout_rate",
            CalculatedMetric::PurchaseRate => "purchase_rate",
            CalculatedMetric::ClickToPurchase => "click_to_purchase",
            CalculatedMetric::Roas => "roas",
            CalculatedMetric::CostPerPurchase => "cost_per_purchase",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

impl std::fmt::Display for CalculatedMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A metric key resolved against the closed calculated set. Anything that is
/// not one of the nine fixed formulas is a raw counter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKey {
    Raw(String),
    Calculated(CalculatedMetric),
}

impl MetricKey {
    pub fn parse(key: &str) -> Self {
        match CalculatedMetric::from_key(key) {
            Some(c) => MetricKey::Calculated(c),
            None => MetricKey::Raw(key.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MetricKey::Raw(k) => k,
            MetricKey::Calculated(c) => c.key(),
        }
    }
}

/// One catalog entry. Immutable once defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDef {
    pub key: String,
    pub name: String,
    pub kind: MetricKind,
    pub format: FormatKind,
}

impl MetricDef {
    pub fn raw(key: &str, name: &str, format: FormatKind) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            kind: MetricKind::Raw,
            format,
        }
    }

    fn calculated(metric: CalculatedMetric, name: &str, format: FormatKind) -> Self {
        Self {
            key: metric.key().to_string(),
            name: name.to_string(),
            kind: MetricKind::Calculated,
            format,
        }
    }
}

/// The default 16-entry catalog: seven raw counters followed by the nine
/// derived metrics, in display order.
pub fn default_catalog() -> Vec<MetricDef> {
    vec![
        MetricDef::raw("spend", "Spend", FormatKind::Currency),
        MetricDef::raw("impressions", "Impressions", FormatKind::Number),
        MetricDef::raw("clicks", "Clicks", FormatKind::Number),
        MetricDef::raw("add_to_cart", "Add to Cart", FormatKind::Number),
        MetricDef::raw("checkout", "Checkout", FormatKind::Number),
        MetricDef::raw("purchase", "Purchases", FormatKind::Number),
        MetricDef::raw("purchase_revenue", "Purchase Revenue", FormatKind::Currency),
        MetricDef::calculated(CalculatedMetric::Ctr, "CTR", FormatKind::Percentage),
        MetricDef::calculated(CalculatedMetric::Cpm, "CPM", FormatKind::Currency),
        MetricDef::calculated(CalculatedMetric::Cpc, "CPC", FormatKind::Currency),
        MetricDef::calculated(CalculatedMetric::AtcRate, "Add to Cart Rate", FormatKind::Percentage),
        MetricDef::calculated(CalculatedMetric::CheckoutRate, "Checkout Rate", FormatKind::Percentage),
        MetricDef::calculated(CalculatedMetric::PurchaseRate, "Purchase Rate", FormatKind::Percentage),
        MetricDef::calculated(
            CalculatedMetric::ClickToPurchase,
            "Click to Purchase Rate",
            FormatKind::Percentage,
        ),
        MetricDef::calculated(CalculatedMetric::Roas, "ROAS", FormatKind::Ratio),
        MetricDef::calculated(CalculatedMetric::CostPerPurchase, "Cost per Purchase", FormatKind::Currency),
    ]
}

/// Derive a catalog key from a display name: "Video Views" → "video_views".
pub fn metric_key_from_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

// ---------------------------------------------------------------------------
// Period counters
// ---------------------------------------------------------------------------

/// Snapshot of raw counters for one reporting column: raw metric key → value.
/// Missing keys read as 0 — the engine never distinguishes "absent" from zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodCounters(pub std::collections::HashMap<String, f64>);

impl PeriodCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn add(&mut self, key: &str, delta: f64) {
        *self.0.entry(key.to_string()).or_insert(0.0) += delta;
    }
}

impl<const N: usize> From<[(&str, f64); N]> for PeriodCounters {
    fn from(pairs: [(&str, f64); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// Reporting columns
// ---------------------------------------------------------------------------

/// Whether a raw cell was typed in by hand or bulk-loaded from the Graph API.
/// Manual edits always win: overwriting an API cell retags it manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Manual,
    Api,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Manual => write!(f, "manual"),
            DataSource::Api => write!(f, "api"),
        }
    }
}

/// One time bucket the grid is indexed by. Append-only within a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportColumn {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// "MM/DD - MM/DD", shown under the column name.
    pub display_name: String,
}

impl ReportColumn {
    pub fn new(name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            start_date,
            end_date,
            display_name: format!(
                "{} - {}",
                start_date.format("%m/%d"),
                end_date.format("%m/%d")
            ),
        }
    }
}

/// The trailing `weeks` whole weeks ending at `today`, oldest first,
/// named "Week 1".."Week N".
pub fn default_columns(weeks: usize, today: NaiveDate) -> Vec<ReportColumn> {
    (0..weeks)
        .map(|i| {
            let offset = (weeks - 1 - i) as i64;
            let week_end = today - chrono::Duration::days(offset * 7);
            let week_start = week_end - chrono::Duration::days(6);
            ReportColumn::new(&format!("Week {}", i + 1), week_start, week_end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_key_resolves_calculated_set() {
        assert_eq!(
            MetricKey::parse("roas"),
            MetricKey::Calculated(CalculatedMetric::Roas)
        );
        assert_eq!(
            MetricKey::parse("cost_per_purchase"),
            MetricKey::Calculated(CalculatedMetric::CostPerPurchase)
        );
        assert_eq!(
            MetricKey::parse("spend"),
            MetricKey::Raw("spend".to_string())
        );
        assert_eq!(
            MetricKey::parse("video_views"),
            MetricKey::Raw("video_views".to_string())
        );
    }

    #[test]
    fn calculated_keys_round_trip() {
        for m in CalculatedMetric::ALL {
            assert_eq!(CalculatedMetric::from_key(m.key()), Some(m));
        }
        assert_eq!(CalculatedMetric::from_key("spend"), None);
    }

    #[test]
    fn default_catalog_shape() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 16);
        let raw = catalog.iter().filter(|m| m.kind == MetricKind::Raw).count();
        assert_eq!(raw, 7);
        // Every calculated entry resolves against the closed formula set.
        for def in catalog.iter().filter(|m| m.kind == MetricKind::Calculated) {
            assert!(CalculatedMetric::from_key(&def.key).is_some(), "{}", def.key);
        }
    }

    #[test]
    fn metric_key_from_name_normalizes() {
        assert_eq!(metric_key_from_name("Video Views"), "video_views");
        assert_eq!(metric_key_from_name(" Cost-per-Lead "), "cost_per_lead");
    }

    #[test]
    fn default_columns_are_contiguous_weeks() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();
        let cols = default_columns(4, today);
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[0].name, "Week 1");
        assert_eq!(cols[3].name, "Week 4");
        assert_eq!(cols[3].end_date, today);
        for c in &cols {
            assert_eq!((c.end_date - c.start_date).num_days(), 6);
        }
        // Week 3 ends exactly a week before Week 4.
        assert_eq!((cols[3].end_date - cols[2].end_date).num_days(), 7);
        assert_eq!(cols[3].display_name, "03/22 - 03/28");
    }
}
