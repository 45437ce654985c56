use std::collections::BTreeSet;

/// Saturate into `[0, 1]`. Out-of-range input is clamped, never rejected.
pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Round half away from zero to `digits` decimal places.
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let unit = 10f64.powi(digits);
    (value * unit).round() / unit
}

pub(crate) fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trimmed, lower-cased comparison key for ingredient codes.
pub(crate) fn normalize_token(value: &str) -> String {
    value.trim().to_lowercase()
}

pub(crate) fn unique_sorted<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
