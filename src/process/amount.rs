use once_cell::sync::Lazy;
use regex::Regex;

/// Currency symbols and thousands separators stripped before parsing.
static CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$,₹€£¥]").expect("currency pattern is a valid regex"));

/// Parse a currency-formatted cell, `None` when nothing numeric remains.
///
/// Non-finite values (`NaN`, `inf`) count as unparseable.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let stripped = CURRENCY.replace_all(raw, "");
    let value: f64 = stripped.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parsed and strictly positive.
pub fn parse_positive_amount(raw: &str) -> Option<f64> {
    parse_amount(raw).filter(|v| *v > 0.0)
}
