use std::cmp::Ordering;

use crate::workflows::optimization::domain::{ReasonCode, ScoreBreakdown};
use crate::workflows::optimization::ranking::{rank_combos, rank_order};
use crate::workflows::optimization::safety::ComboDraft;
use crate::workflows::optimization::scoring::ScoredCombo;

fn scored(combo_id: &str, total: f64, efficacy: f64, cost: f64) -> ScoredCombo {
    ScoredCombo {
        draft: ComboDraft {
            combo_id: combo_id.to_string(),
            item_ids: vec![format!("{combo_id}-a"), format!("{combo_id}-b")],
            ingredient_codes: vec!["omega3".to_string()],
            monthly_cost_krw: cost,
            daily_dose_count: 2,
        },
        score: ScoreBreakdown {
            efficacy_component: efficacy,
            risk_component: 1.0,
            cost_component: 0.5,
            total_score: total,
        },
        reason_codes: vec![ReasonCode::GoalMatch, ReasonCode::SafetyCompliant],
        signal_ids: vec![format!("signal-{combo_id}")],
    }
}

#[test]
fn higher_total_ranks_first() {
    let leader = scored("b", 0.8, 0.5, 10_000.0);
    let trailer = scored("a", 0.7, 0.9, 1_000.0);

    assert_eq!(rank_order(&leader, &trailer), Ordering::Less);
}

#[test]
fn ties_break_on_efficacy_then_cost_then_id() {
    let stronger = scored("z", 0.7, 0.9, 50_000.0);
    let weaker = scored("a", 0.7, 0.8, 10_000.0);
    assert_eq!(rank_order(&stronger, &weaker), Ordering::Less);

    let cheaper = scored("z", 0.7, 0.8, 10_000.0);
    let pricier = scored("a", 0.7, 0.8, 20_000.0);
    assert_eq!(rank_order(&cheaper, &pricier), Ordering::Less);

    let first = scored("a", 0.7, 0.8, 10_000.0);
    let second = scored("b", 0.7, 0.8, 10_000.0);
    assert_eq!(rank_order(&first, &second), Ordering::Less);
    assert_eq!(rank_order(&second, &first), Ordering::Greater);
}

#[test]
fn truncates_to_top_k_and_assigns_contiguous_ranks() {
    let ranking = rank_combos(
        vec![
            scored("c", 0.5, 0.5, 1.0),
            scored("a", 0.9, 0.5, 1.0),
            scored("d", 0.7, 0.5, 1.0),
            scored("b", 0.7, 0.5, 1.0),
        ],
        3,
    );

    assert_eq!(ranking.ranked_count, 4);
    assert_eq!(ranking.top_score(), Some(0.9));

    let ranked: Vec<(u32, &str)> = ranking
        .recommendations
        .iter()
        .map(|ranked| {
            (
                ranked.recommendation.rank,
                ranked.recommendation.combo_id.as_str(),
            )
        })
        .collect();
    assert_eq!(ranked, vec![(1, "a"), (2, "b"), (3, "d")]);
    assert!(ranking.recommendations.iter().all(|ranked| {
        ranked.recommendation.safety_compliant
            && ranked.recommendation.blocked_ingredient_codes.is_empty()
    }));
}

#[test]
fn fewer_combos_than_top_k_returns_all() {
    let ranking = rank_combos(vec![scored("a", 0.4, 0.4, 1.0)], 5);

    assert_eq!(ranking.recommendations.len(), 1);
    assert_eq!(ranking.recommendations[0].signal_ids, vec!["signal-a"]);
}

#[test]
fn empty_input_yields_no_top_score() {
    let ranking = rank_combos(Vec::new(), 2);

    assert_eq!(ranking.ranked_count, 0);
    assert_eq!(ranking.top_score(), None);
}
