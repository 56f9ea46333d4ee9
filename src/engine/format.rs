use crate::types::FormatKind;

/// Render a metric value as a display string. `None` and non-numeric values
/// collapse to the "N/A" sentinel, mirroring the compute-side degrade policy.
pub fn format_value(value: Option<f64>, kind: FormatKind) -> String {
    let v = match value {
        Some(v) if v.is_finite() => v,
        _ => return "N/A".to_string(),
    };

    match kind {
        FormatKind::Currency => format!("${}", thousands_fixed2(v)),
        FormatKind::Percentage => format!("{v:.2}%"),
        FormatKind::Ratio => format!("{v:.2}x"),
        FormatKind::Number => thousands_int(v),
    }
}

/// Fixed 2-decimal rendering with comma grouping: 1234.5 → "1,234.50".
fn thousands_fixed2(v: f64) -> String {
    let s = format!("{:.2}", v.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{}.{frac_part}", group_digits(int_part))
}

/// Integer truncation with comma grouping: 1234.9 → "1,234".
fn thousands_int(v: f64) -> String {
    let truncated = v.trunc() as i64;
    let digits = truncated.unsigned_abs().to_string();
    let sign = if truncated < 0 { "-" } else { "" };
    format!("{sign}{}", group_digits(&digits))
}

/// Insert a comma every three digits from the right. Input is digits only.
fn group_digits(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_is_dollar_prefixed_grouped_two_decimals() {
        assert_eq!(format_value(Some(1234.5), FormatKind::Currency), "$1,234.50");
        assert_eq!(format_value(Some(0.0), FormatKind::Currency), "$0.00");
        assert_eq!(
            format_value(Some(1_234_567.891), FormatKind::Currency),
            "$1,234,567.89"
        );
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(format_value(Some(12.345), FormatKind::Percentage), "12.35%");
        assert_eq!(format_value(Some(5.0), FormatKind::Percentage), "5.00%");
    }

    #[test]
    fn ratio_has_x_suffix() {
        assert_eq!(format_value(Some(3.14159), FormatKind::Ratio), "3.14x");
        assert_eq!(format_value(Some(2.5), FormatKind::Ratio), "2.50x");
    }

    #[test]
    fn number_truncates_and_groups() {
        assert_eq!(format_value(Some(1234.9), FormatKind::Number), "1,234");
        assert_eq!(format_value(Some(999.0), FormatKind::Number), "999");
        assert_eq!(format_value(Some(1_000_000.0), FormatKind::Number), "1,000,000");
        assert_eq!(format_value(Some(0.7), FormatKind::Number), "0");
    }

    #[test]
    fn none_and_nan_are_not_available() {
        for kind in [
            FormatKind::Currency,
            FormatKind::Percentage,
            FormatKind::Ratio,
            FormatKind::Number,
        ] {
            assert_eq!(format_value(None, kind), "N/A");
            assert_eq!(format_value(Some(f64::NAN), kind), "N/A");
        }
    }

    #[test]
    fn negative_values_keep_their_sign() {
        assert_eq!(format_value(Some(-1234.5), FormatKind::Currency), "$-1,234.50");
        assert_eq!(format_value(Some(-1500.0), FormatKind::Number), "-1,500");
    }

    #[test]
    fn grouping_boundaries() {
        assert_eq!(group_digits("1"), "1");
        assert_eq!(group_digits("12"), "12");
        assert_eq!(group_digits("123"), "123");
        assert_eq!(group_digits("1234"), "1,234");
        assert_eq!(group_digits("123456"), "123,456");
        assert_eq!(group_digits("1234567"), "1,234,567");
    }
}
