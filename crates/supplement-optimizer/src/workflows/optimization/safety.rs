use std::collections::{BTreeMap, BTreeSet};

use super::combinations::combo_id;
use super::domain::{CandidateItem, OptimizationInput, SafetyDecision};
use super::numeric::{normalize_token, round_to, unique_sorted};

/// Ingredient-level view of the rule-engine decisions and user preferences.
///
/// All lookups go through [`normalize_token`], so matching ignores case and
/// surrounding whitespace.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    blocked: BTreeMap<String, BTreeSet<String>>,
    limited: BTreeSet<String>,
    preferred: BTreeSet<String>,
    avoided: BTreeSet<String>,
    monthly_budget_krw: f64,
    max_daily_dose_count: u64,
}

impl SafetyPolicy {
    pub fn from_input(input: &OptimizationInput) -> Self {
        let mut blocked: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut limited = BTreeSet::new();

        for constraint in &input.safety_constraints {
            let key = normalize_token(&constraint.ingredient_code);
            match constraint.decision {
                SafetyDecision::Block => {
                    blocked
                        .entry(key)
                        .or_default()
                        .insert(constraint.constraint_id.clone());
                }
                SafetyDecision::Limit => {
                    limited.insert(key);
                }
                SafetyDecision::Allow => {}
            }
        }

        let preference = &input.preference;
        Self {
            blocked,
            limited,
            preferred: normalized_set(&preference.preferred_ingredient_codes),
            avoided: normalized_set(&preference.avoided_ingredient_codes),
            monthly_budget_krw: preference.monthly_budget_krw,
            max_daily_dose_count: u64::from(preference.max_daily_dose_count),
        }
    }

    pub fn blocking_constraints(&self, ingredient_code: &str) -> Option<&BTreeSet<String>> {
        self.blocked.get(&normalize_token(ingredient_code))
    }

    pub fn is_blocked(&self, ingredient_code: &str) -> bool {
        self.blocking_constraints(ingredient_code).is_some()
    }

    pub fn is_limited(&self, ingredient_code: &str) -> bool {
        self.limited.contains(&normalize_token(ingredient_code))
    }

    pub fn is_preferred(&self, ingredient_code: &str) -> bool {
        self.preferred.contains(&normalize_token(ingredient_code))
    }

    pub fn is_avoided(&self, ingredient_code: &str) -> bool {
        self.avoided.contains(&normalize_token(ingredient_code))
    }

    /// Run the safety check followed by the budget and dose ceilings.
    pub fn screen(&self, combo: &[&CandidateItem]) -> Screening {
        let item_ids = unique_sorted(combo.iter().map(|item| item.item_id.as_str()));
        let combo_id = combo_id(&item_ids);
        let ingredient_codes = unique_sorted(
            combo
                .iter()
                .flat_map(|item| item.ingredient_codes.iter().map(String::as_str)),
        );

        let blocked_ingredient_codes: Vec<String> = ingredient_codes
            .iter()
            .filter(|code| self.is_blocked(code))
            .cloned()
            .collect();
        if !blocked_ingredient_codes.is_empty() {
            let constraint_ids = unique_sorted(
                blocked_ingredient_codes
                    .iter()
                    .filter_map(|code| self.blocking_constraints(code))
                    .flat_map(|ids| ids.iter().map(String::as_str)),
            );
            return Screening::SafetyExcluded(SafetyExclusion {
                combo_id,
                blocked_ingredient_codes,
                constraint_ids,
            });
        }

        let monthly_cost_krw = round_to(combo.iter().map(|item| item.monthly_cost_krw).sum(), 2);
        let daily_dose_count: u64 = combo
            .iter()
            .map(|item| u64::from(item.daily_dose_count))
            .sum();

        if monthly_cost_krw > self.monthly_budget_krw {
            return Screening::OverBudget {
                combo_id,
                monthly_cost_krw,
            };
        }
        if daily_dose_count > self.max_daily_dose_count {
            return Screening::OverDoseLimit {
                combo_id,
                daily_dose_count,
            };
        }

        Screening::Qualified(ComboDraft {
            combo_id,
            item_ids,
            ingredient_codes,
            monthly_cost_krw,
            daily_dose_count,
        })
    }

    /// Partition every enumerated combination, preserving enumeration order.
    pub fn partition(&self, combinations: &[Vec<&CandidateItem>]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for combo in combinations {
            match self.screen(combo) {
                Screening::Qualified(draft) => outcome.qualified.push(draft),
                Screening::SafetyExcluded(exclusion) => {
                    tracing::debug!(
                        combo_id = %exclusion.combo_id,
                        blocked = ?exclusion.blocked_ingredient_codes,
                        "combination excluded by safety constraint"
                    );
                    outcome.safety_exclusions.push(exclusion);
                }
                Screening::OverBudget {
                    combo_id,
                    monthly_cost_krw,
                } => {
                    tracing::debug!(%combo_id, monthly_cost_krw, "combination exceeds budget");
                    outcome.excluded_by_budget += 1;
                }
                Screening::OverDoseLimit {
                    combo_id,
                    daily_dose_count,
                } => {
                    tracing::debug!(%combo_id, daily_dose_count, "combination exceeds dose limit");
                    outcome.excluded_by_dose += 1;
                }
            }
        }

        outcome
    }
}

fn normalized_set(codes: &[String]) -> BTreeSet<String> {
    codes.iter().map(|code| normalize_token(code)).collect()
}

/// Combination that cleared every hard filter and awaits scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboDraft {
    pub combo_id: String,
    pub item_ids: Vec<String>,
    pub ingredient_codes: Vec<String>,
    pub monthly_cost_krw: f64,
    pub daily_dose_count: u64,
}

/// Safety exclusion with the evidence needed for its audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyExclusion {
    pub combo_id: String,
    pub blocked_ingredient_codes: Vec<String>,
    pub constraint_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screening {
    Qualified(ComboDraft),
    SafetyExcluded(SafetyExclusion),
    OverBudget {
        combo_id: String,
        monthly_cost_krw: f64,
    },
    OverDoseLimit {
        combo_id: String,
        daily_dose_count: u64,
    },
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub qualified: Vec<ComboDraft>,
    pub safety_exclusions: Vec<SafetyExclusion>,
    pub excluded_by_budget: usize,
    pub excluded_by_dose: usize,
}
