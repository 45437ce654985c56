use std::cmp::Ordering;

use super::domain::Recommendation;
use super::scoring::ScoredCombo;

/// Total order over scored combinations.
///
/// Higher total first, then higher efficacy, then cheaper, then `combo_id`
/// ascending. Ties on every score field still resolve on the id, so two runs
/// over the same input always agree.
pub fn rank_order(left: &ScoredCombo, right: &ScoredCombo) -> Ordering {
    right
        .score
        .total_score
        .total_cmp(&left.score.total_score)
        .then_with(|| {
            right
                .score
                .efficacy_component
                .total_cmp(&left.score.efficacy_component)
        })
        .then_with(|| {
            left.draft
                .monthly_cost_krw
                .total_cmp(&right.draft.monthly_cost_krw)
        })
        .then_with(|| left.draft.combo_id.cmp(&right.draft.combo_id))
}

/// Recommendation kept after truncation, with the signals backing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecommendation {
    pub recommendation: Recommendation,
    pub signal_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Number of combinations that were ordered before truncation.
    pub ranked_count: usize,
    pub recommendations: Vec<RankedRecommendation>,
}

impl Ranking {
    pub fn top_score(&self) -> Option<f64> {
        self.recommendations
            .first()
            .map(|ranked| ranked.recommendation.score.total_score)
    }

    pub fn into_recommendations(self) -> Vec<Recommendation> {
        self.recommendations
            .into_iter()
            .map(|ranked| ranked.recommendation)
            .collect()
    }
}

/// Sort scored combinations and keep the first `top_k`, ranked from 1.
pub fn rank_combos(mut scored: Vec<ScoredCombo>, top_k: usize) -> Ranking {
    scored.sort_by(rank_order);
    let ranked_count = scored.len();

    let recommendations = scored
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(index, combo)| RankedRecommendation {
            recommendation: Recommendation {
                rank: index as u32 + 1,
                combo_id: combo.draft.combo_id,
                item_ids: combo.draft.item_ids,
                ingredient_codes: combo.draft.ingredient_codes,
                monthly_cost_krw: combo.draft.monthly_cost_krw,
                daily_dose_count: combo.draft.daily_dose_count,
                safety_compliant: true,
                blocked_ingredient_codes: Vec::new(),
                score: combo.score,
                reason_codes: combo.reason_codes,
            },
            signal_ids: combo.signal_ids,
        })
        .collect();

    Ranking {
        ranked_count,
        recommendations,
    }
}
