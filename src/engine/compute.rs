use crate::types::{CalculatedMetric, MetricKey, PeriodCounters};

/// Derive the value of any metric key from a counters snapshot.
///
/// Raw keys read straight from the counters (0 if absent, unknown keys
/// included). Calculated keys apply the fixed formula table with
/// divide-by-zero guards. Never fails: non-finite inputs degrade to 0.
pub fn compute(key: &MetricKey, counters: &PeriodCounters) -> f64 {
    let value = match key {
        MetricKey::Raw(k) => counters.get(k),
        MetricKey::Calculated(c) => compute_calculated(*c, counters),
    };
    if value.is_finite() { value } else { 0.0 }
}

fn compute_calculated(metric: CalculatedMetric, counters: &PeriodCounters) -> f64 {
    let spend = counters.get("spend");
    let impressions = counters.get("impressions");
    let clicks = counters.get("clicks");
    let add_to_cart = counters.get("add_to_cart");
    let checkout = counters.get("checkout");
    let purchase = counters.get("purchase");
    let purchase_revenue = counters.get("purchase_revenue");

    match metric {
        CalculatedMetric::Ctr => guarded(clicks / impressions * 100.0, impressions),
        CalculatedMetric::Cpm => guarded(spend / impressions * 1000.0, impressions),
        CalculatedMetric::Cpc => guarded(spend / clicks, clicks),
        CalculatedMetric::AtcRate => guarded(add_to_cart / clicks * 100.0, clicks),
        CalculatedMetric::CheckoutRate => guarded(checkout / add_to_cart * 100.0, add_to_cart),
        CalculatedMetric::PurchaseRate => guarded(purchase / checkout * 100.0, checkout),
        CalculatedMetric::ClickToPurchase => guarded(purchase / clicks * 100.0, clicks),
        CalculatedMetric::Roas => guarded(purchase_revenue / spend, spend),
        CalculatedMetric::CostPerPurchase => guarded(spend / purchase, purchase),
    }
}

/// A formula is only meaningful when its denominator is positive.
#[inline]
fn guarded(value: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeriodCounters;

    fn key(k: &str) -> MetricKey {
        MetricKey::parse(k)
    }

    #[test]
    fn roas_guards_zero_spend() {
        let counters = PeriodCounters::from([("spend", 0.0), ("purchase_revenue", 500.0)]);
        assert_eq!(compute(&key("roas"), &counters), 0.0);
    }

    #[test]
    fn roas_divides_revenue_by_spend() {
        let counters = PeriodCounters::from([("spend", 100.0), ("purchase_revenue", 250.0)]);
        assert!((compute(&key("roas"), &counters) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn ctr_is_clicks_over_impressions_pct() {
        let counters = PeriodCounters::from([("clicks", 50.0), ("impressions", 1000.0)]);
        assert!((compute(&key("ctr"), &counters) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cpm_scales_per_thousand() {
        let counters = PeriodCounters::from([("spend", 20.0), ("impressions", 10_000.0)]);
        assert!((compute(&key("cpm"), &counters) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn funnel_rates() {
        let counters = PeriodCounters::from([
            ("clicks", 200.0),
            ("add_to_cart", 50.0),
            ("checkout", 25.0),
            ("purchase", 10.0),
        ]);
        assert!((compute(&key("atc_rate"), &counters) - 25.0).abs() < 1e-9);
        assert!((compute(&key("checkout_rate"), &counters) - 50.0).abs() < 1e-9);
        assert!((compute(&key("purchase_rate"), &counters) - 40.0).abs() < 1e-9);
        assert!((compute(&key("click_to_purchase"), &counters) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cost_per_purchase_guards_zero_purchases() {
        let counters = PeriodCounters::from([("spend", 300.0), ("purchase", 0.0)]);
        assert_eq!(compute(&key("cost_per_purchase"), &counters), 0.0);
        let counters = PeriodCounters::from([("spend", 300.0), ("purchase", 3.0)]);
        assert!((compute(&key("cost_per_purchase"), &counters) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn calculated_keys_never_fail_on_empty_counters() {
        let empty = PeriodCounters::new();
        for m in CalculatedMetric::ALL {
            let v = compute(&MetricKey::Calculated(m), &empty);
            assert!(v.is_finite());
            assert_eq!(v, 0.0, "{}", m.key());
        }
    }

    #[test]
    fn raw_key_reads_counter_directly() {
        let counters = PeriodCounters::from([("spend", 123.45)]);
        assert_eq!(compute(&key("spend"), &counters), 123.45);
    }

    #[test]
    fn unknown_raw_key_reads_zero() {
        let counters = PeriodCounters::from([("spend", 123.45)]);
        assert_eq!(compute(&key("video_views"), &counters), 0.0);
    }

    #[test]
    fn non_finite_inputs_degrade_to_zero() {
        let counters = PeriodCounters::from([("spend", f64::NAN)]);
        assert_eq!(compute(&key("spend"), &counters), 0.0);
        let counters = PeriodCounters::from([("spend", f64::INFINITY), ("purchase", 2.0)]);
        assert_eq!(compute(&key("cost_per_purchase"), &counters), 0.0);
    }

    #[test]
    fn compute_is_pure() {
        let counters = PeriodCounters::from([("clicks", 50.0), ("impressions", 1000.0)]);
        let first = compute(&key("ctr"), &counters);
        for _ in 0..10 {
            assert_eq!(compute(&key("ctr"), &counters), first);
        }
    }
}
