mod rules;
mod signals;

pub use signals::SignalIndex;

use rules::MatchCounts;

use super::contracts::ContractViolation;
use super::domain::{ObjectiveWeights, Preference, ReasonCode, ScoreBreakdown};
use super::numeric::{round_to, unique_sorted};
use super::safety::{ComboDraft, SafetyPolicy};

/// Decimal places kept on every published score.
pub const SCORE_PRECISION: i32 = 4;

/// Stateless scorer combining efficacy, risk, and cost into a weighted total.
pub struct ComboScorer<'a> {
    weights: ObjectiveWeights,
    signals: &'a SignalIndex,
    policy: &'a SafetyPolicy,
    preference: &'a Preference,
}

impl<'a> ComboScorer<'a> {
    pub fn new(
        weights: ObjectiveWeights,
        signals: &'a SignalIndex,
        policy: &'a SafetyPolicy,
        preference: &'a Preference,
    ) -> Self {
        Self {
            weights,
            signals,
            policy,
            preference,
        }
    }

    pub fn score(&self, draft: ComboDraft) -> Result<ScoredCombo, ContractViolation> {
        let mut signal_scores = Vec::with_capacity(draft.item_ids.len());
        let mut signal_ids = Vec::with_capacity(draft.item_ids.len());
        for item_id in &draft.item_ids {
            let signal = self.signals.get(item_id)?;
            signal_scores.push(signal.score);
            signal_ids.push(signal.signal_id.clone());
        }

        let counts = self.match_counts(&draft.ingredient_codes);
        let efficacy = rules::efficacy_component(&signal_scores, counts.preferred);
        let risk = rules::risk_component(counts.limited, counts.avoided);
        let cost = rules::cost_component(draft.monthly_cost_krw, self.preference.monthly_budget_krw);
        let total = rules::total_score(&self.weights, efficacy, risk, cost);

        let reason_codes = rules::reason_codes(
            efficacy,
            draft.monthly_cost_krw,
            draft.daily_dose_count,
            self.preference,
        );

        Ok(ScoredCombo {
            score: ScoreBreakdown {
                efficacy_component: round_to(efficacy, SCORE_PRECISION),
                risk_component: round_to(risk, SCORE_PRECISION),
                cost_component: round_to(cost, SCORE_PRECISION),
                total_score: round_to(total, SCORE_PRECISION),
            },
            reason_codes,
            signal_ids: unique_sorted(signal_ids),
            draft,
        })
    }

    fn match_counts(&self, ingredient_codes: &[String]) -> MatchCounts {
        let mut counts = MatchCounts::default();
        for code in ingredient_codes {
            if self.policy.is_preferred(code) {
                counts.preferred += 1;
            }
            if self.policy.is_limited(code) {
                counts.limited += 1;
            }
            if self.policy.is_avoided(code) {
                counts.avoided += 1;
            }
        }
        counts
    }
}

/// Qualified combination with its rounded score breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCombo {
    pub draft: ComboDraft,
    pub score: ScoreBreakdown,
    pub reason_codes: Vec<ReasonCode>,
    pub signal_ids: Vec<String>,
}
