use super::common::*;
use crate::workflows::optimization::contracts::ContractViolation;
use crate::workflows::optimization::domain::{
    CandidateItem, ObjectiveWeights, OptimizationInput, ReasonCode,
};
use crate::workflows::optimization::safety::{ComboDraft, SafetyPolicy, Screening};
use crate::workflows::optimization::scoring::{ComboScorer, ScoredCombo, SignalIndex};

fn pick<'a>(input: &'a OptimizationInput, item_id: &str) -> &'a CandidateItem {
    input
        .candidates
        .iter()
        .find(|candidate| candidate.item_id == item_id)
        .expect("candidate exists")
}

fn draft(input: &OptimizationInput, first: &str, second: &str) -> ComboDraft {
    let policy = SafetyPolicy::from_input(input);

    match policy.screen(&[pick(input, first), pick(input, second)]) {
        Screening::Qualified(draft) => draft,
        other => panic!("expected qualified draft, got {other:?}"),
    }
}

fn score(input: &OptimizationInput, first: &str, second: &str) -> ScoredCombo {
    score_with(input, first, second, ObjectiveWeights::default())
}

fn score_with(
    input: &OptimizationInput,
    first: &str,
    second: &str,
    weights: ObjectiveWeights,
) -> ScoredCombo {
    let signals = SignalIndex::build(input).expect("signals index");
    let policy = SafetyPolicy::from_input(input);
    let scorer = ComboScorer::new(weights, &signals, &policy, &input.preference);
    scorer
        .score(draft(input, first, second))
        .expect("combo scores")
}

#[test]
fn signal_index_covers_every_candidate() {
    let signals = SignalIndex::build(&input()).expect("signals index");
    assert_eq!(signals.len(), 4);
}

#[test]
fn duplicate_candidates_are_rejected() {
    let mut input = input();
    input.candidates.push(input.candidates[0].clone());

    match SignalIndex::build(&input) {
        Err(ContractViolation::DuplicateCandidate { item_id }) => {
            assert_eq!(item_id, "m05-item-omega3-d");
        }
        other => panic!("expected duplicate candidate, got {other:?}"),
    }
}

#[test]
fn signal_for_unknown_item_is_rejected() {
    let mut input = input();
    input
        .efficacy_signals
        .push(signal_for("m05-item-zinc", 0.5, 0.5));

    match SignalIndex::build(&input) {
        Err(ContractViolation::UnknownSignalItem { item_id }) => {
            assert_eq!(item_id, "m05-item-zinc");
        }
        other => panic!("expected unknown signal item, got {other:?}"),
    }
}

#[test]
fn second_signal_for_an_item_is_rejected() {
    let mut input = input();
    input
        .efficacy_signals
        .push(signal_for("m05-item-probiotic", 0.5, 0.5));

    assert!(matches!(
        SignalIndex::build(&input),
        Err(ContractViolation::DuplicateSignal { .. })
    ));
}

#[test]
fn candidate_without_signal_fails_the_batch() {
    let mut input = input();
    input
        .efficacy_signals
        .retain(|signal| signal.item_id != "m05-item-probiotic");

    match SignalIndex::build(&input) {
        Err(ContractViolation::MissingSignal { item_id }) => {
            assert_eq!(item_id, "m05-item-probiotic");
        }
        other => panic!("expected missing signal, got {other:?}"),
    }
}

#[test]
fn scores_reference_leader() {
    let scored = score(&input(), "m05-item-omega3-d", "m05-item-magnesium");

    assert_close(scored.score.efficacy_component, 0.7056);
    assert_close(scored.score.risk_component, 0.92);
    assert_close(scored.score.cost_component, 0.1429);
    assert_close(scored.score.total_score, 0.6748);
    assert_eq!(
        scored.reason_codes,
        vec![
            ReasonCode::BudgetFit,
            ReasonCode::DoseConvenience,
            ReasonCode::EfficacyPriority,
            ReasonCode::GoalMatch,
            ReasonCode::SafetyCompliant,
        ]
    );
    assert_eq!(
        scored.signal_ids,
        vec!["m05-signal-magnesium", "m05-signal-omega3-d"]
    );
}

#[test]
fn efficacy_below_threshold_drops_priority_reason() {
    let scored = score(&input(), "m05-item-omega3-d", "m05-item-probiotic");

    assert_close(scored.score.efficacy_component, 0.5948);
    assert_close(scored.score.risk_component, 1.0);
    assert_close(scored.score.cost_component, 0.0286);
    assert_close(scored.score.total_score, 0.6111);
    assert!(!scored.reason_codes.contains(&ReasonCode::EfficacyPriority));
}

#[test]
fn avoided_ingredient_reduces_risk_component() {
    let mut input = input();
    input.preference.avoided_ingredient_codes = vec!["Probiotic".to_string()];

    let scored = score(&input, "m05-item-omega3-d", "m05-item-probiotic");

    assert_close(scored.score.risk_component, 0.8);
}

#[test]
fn weights_shift_the_total() {
    let cost_only = ObjectiveWeights {
        efficacy: 0.0,
        risk: 0.0,
        cost: 1.0,
    };

    let scored = score_with(
        &input(),
        "m05-item-magnesium",
        "m05-item-probiotic",
        cost_only,
    );

    assert_close(scored.score.total_score, scored.score.cost_component);
    assert_close(scored.score.cost_component, 0.3714);
}

#[test]
fn zero_budget_rewards_free_combinations() {
    let mut input = input();
    input.preference.monthly_budget_krw = 0.0;
    for candidate in &mut input.candidates {
        candidate.monthly_cost_krw = 0.0;
    }

    let scored = score(&input, "m05-item-omega3-d", "m05-item-magnesium");

    assert_close(scored.score.cost_component, 1.0);
    assert!(scored.reason_codes.contains(&ReasonCode::BudgetFit));
}
