//! Display rounding. Classification and ranking always see the raw `f64`;
//! these helpers run only when a value is about to be shown.

/// Round half away from zero to one decimal place. `-0.0` folds to `0.0`.
#[inline]
pub fn round_one_decimal(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let r = (x * 10.0).round() / 10.0;
    if r == 0.0 { 0.0 } else { r }
}

/// One-decimal string, e.g. `16.7`. Non-finite input renders as `0.0`.
pub fn format_one_decimal(x: f64) -> String {
    format!("{:.1}", round_one_decimal(x))
}

/// One-decimal percent string, e.g. `6.0%`.
pub fn format_percent_one_decimal(x: f64) -> String {
    format!("{}%", format_one_decimal(x))
}
