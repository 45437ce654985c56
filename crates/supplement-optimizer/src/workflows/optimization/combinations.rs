use super::domain::CandidateItem;

/// Prefix shared by every generated combination id.
pub const COMBO_ID_PREFIX: &str = "m05-mvp-combo-";

/// Enumerate every `combo_size` subset of `candidates`.
///
/// Candidates are ordered by `item_id` first, so the enumeration order is fully
/// determined by the input set. Callers guarantee `0 < combo_size <= len`.
pub fn generate_combinations(
    candidates: &[CandidateItem],
    combo_size: usize,
) -> Vec<Vec<&CandidateItem>> {
    let mut sorted: Vec<&CandidateItem> = candidates.iter().collect();
    sorted.sort_by(|left, right| left.item_id.cmp(&right.item_id));

    let mut results = Vec::new();
    let mut selected = Vec::with_capacity(combo_size);
    extend_selection(&sorted, combo_size, 0, &mut selected, &mut results);
    results
}

fn extend_selection<'a>(
    sorted: &[&'a CandidateItem],
    combo_size: usize,
    start: usize,
    selected: &mut Vec<&'a CandidateItem>,
    results: &mut Vec<Vec<&'a CandidateItem>>,
) {
    if selected.len() == combo_size {
        results.push(selected.clone());
        return;
    }

    let remaining = combo_size - selected.len();
    if sorted.len() < remaining {
        return;
    }

    // Stop early enough that the suffix can still fill the remaining slots.
    let max_start = sorted.len() - remaining;
    for index in start..=max_start {
        selected.push(sorted[index]);
        extend_selection(sorted, combo_size, index + 1, selected, results);
        selected.pop();
    }
}

/// Deterministic slug built from already-sorted item ids.
pub fn combo_id<S: AsRef<str>>(sorted_item_ids: &[S]) -> String {
    let suffix = sorted_item_ids
        .iter()
        .map(|item_id| slug_part(item_id.as_ref()))
        .collect::<Vec<_>>()
        .join("-");
    format!("{COMBO_ID_PREFIX}{suffix}")
}

fn slug_part(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.trim().to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}
