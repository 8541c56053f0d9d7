//! Numeric coercion for optional text fields.
//!
//! The backend serialises decimals (GPA thresholds, amounts) as strings.
//! Every numeric comparison in the engine goes through
//! [`parse_optional_number`] so that a malformed value behaves exactly like
//! an absent one.

/// Coerce an optional string into a finite number.
///
/// Returns `None` for absent, blank, non-numeric, NaN and infinite input.
pub fn parse_optional_number(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
