use serde::Serialize;
use std::fs;
use std::path::Path;
use supplement_optimizer::error::AppError;
use supplement_optimizer::workflows::optimization::contracts::is_iso_datetime;
use supplement_optimizer::workflows::optimization::{
    parse_document_str, ObjectiveWeights, OptimizationInput,
};

pub(crate) fn parse_weights(raw: &str) -> Result<ObjectiveWeights, String> {
    raw.parse::<ObjectiveWeights>()
        .map_err(|err| format!("failed to parse '{raw}' as efficacy,risk,cost ({err})"))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if is_iso_datetime(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(format!("'{raw}' is not an ISO-8601 datetime"))
    }
}

pub(crate) fn parse_positive_count(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("value must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(err) => Err(format!("failed to parse '{raw}' as a positive integer ({err})")),
    }
}

pub(crate) fn load_input(path: &Path) -> Result<OptimizationInput, AppError> {
    let raw = fs::read_to_string(path)?;
    let input = parse_document_str::<OptimizationInput>(&raw)?;
    tracing::debug!(path = %path.display(), case_id = %input.case_id, "loaded optimization input");
    Ok(input)
}

/// Pretty-prints `document` to stdout, or writes it to `out` when given.
pub(crate) fn emit_document<T>(
    document: &T,
    out: Option<&Path>,
    label: &str,
) -> Result<(), AppError>
where
    T: Serialize,
{
    let rendered = serde_json::to_string_pretty(document)?;
    let Some(path) = out else {
        println!("{rendered}");
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{rendered}\n"))?;
    println!("Wrote {label}: {}", path.display());
    Ok(())
}
