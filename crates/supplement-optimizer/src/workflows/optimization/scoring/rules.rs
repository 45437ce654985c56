use std::collections::BTreeSet;

use super::super::domain::{ObjectiveWeights, Preference, ReasonCode};
use super::super::numeric::{average, clamp01};

pub(crate) const PREFERRED_MATCH_BONUS: f64 = 0.03;
pub(crate) const PREFERRED_BONUS_CAP: f64 = 0.12;
pub(crate) const LIMIT_MATCH_PENALTY: f64 = 0.08;
pub(crate) const AVOIDED_MATCH_PENALTY: f64 = 0.2;
pub(crate) const EFFICACY_PRIORITY_THRESHOLD: f64 = 0.6;

/// Ingredient matches against the soft signals of one combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MatchCounts {
    pub preferred: usize,
    pub limited: usize,
    pub avoided: usize,
}

pub(crate) fn efficacy_component(signal_scores: &[f64], preferred_matches: usize) -> f64 {
    let bonus = (preferred_matches as f64 * PREFERRED_MATCH_BONUS).min(PREFERRED_BONUS_CAP);
    clamp01(average(signal_scores) + bonus)
}

pub(crate) fn risk_component(limited_matches: usize, avoided_matches: usize) -> f64 {
    clamp01(
        1.0 - limited_matches as f64 * LIMIT_MATCH_PENALTY
            - avoided_matches as f64 * AVOIDED_MATCH_PENALTY,
    )
}

/// A zero budget only admits free combinations at full marks.
pub(crate) fn cost_component(monthly_cost_krw: f64, monthly_budget_krw: f64) -> f64 {
    if monthly_budget_krw > 0.0 {
        clamp01(1.0 - monthly_cost_krw / monthly_budget_krw)
    } else if monthly_cost_krw == 0.0 {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn total_score(weights: &ObjectiveWeights, efficacy: f64, risk: f64, cost: f64) -> f64 {
    clamp01(weights.efficacy * efficacy + weights.risk * risk + weights.cost * cost)
}

pub(crate) fn reason_codes(
    efficacy: f64,
    monthly_cost_krw: f64,
    daily_dose_count: u64,
    preference: &Preference,
) -> Vec<ReasonCode> {
    let mut codes = BTreeSet::from([ReasonCode::GoalMatch, ReasonCode::SafetyCompliant]);
    if efficacy >= EFFICACY_PRIORITY_THRESHOLD {
        codes.insert(ReasonCode::EfficacyPriority);
    }
    if monthly_cost_krw <= preference.monthly_budget_krw {
        codes.insert(ReasonCode::BudgetFit);
    }
    if daily_dose_count <= u64::from(preference.max_daily_dose_count) {
        codes.insert(ReasonCode::DoseConvenience);
    }
    codes.into_iter().collect()
}
