use crate::workflows::optimization::domain::{
    CandidateItem, EfficacySignal, OptimizationInput, SafetyConstraint, SafetyDecision,
};
use crate::workflows::optimization::engine::{
    EngineSettings, OptimizationEngine, OptimizationRequest, OptimizationRun,
};
use crate::workflows::optimization::reference::reference_input;

pub(super) const CAPTURED_AT: &str = "2026-02-14T09:30:00.000Z";
pub(super) const GENERATED_AT: &str = "2026-02-14T09:31:00.000Z";

pub(super) fn input() -> OptimizationInput {
    reference_input(CAPTURED_AT)
}

pub(super) fn engine() -> OptimizationEngine {
    OptimizationEngine::new(EngineSettings::default())
}

pub(super) fn request(input: OptimizationInput) -> OptimizationRequest {
    OptimizationRequest::new(input).with_generated_at(GENERATED_AT)
}

pub(super) fn run(input: OptimizationInput) -> OptimizationRun {
    engine()
        .run(&request(input))
        .expect("engine run succeeds")
}

pub(super) fn item(item_id: &str, ingredients: &[&str], cost: f64, doses: u32) -> CandidateItem {
    CandidateItem {
        item_id: item_id.to_string(),
        product_code: format!("prod-{item_id}"),
        ingredient_codes: ingredients.iter().map(|code| code.to_string()).collect(),
        monthly_cost_krw: cost,
        daily_dose_count: doses,
    }
}

pub(super) fn signal_for(item_id: &str, benefit: f64, confidence: f64) -> EfficacySignal {
    EfficacySignal {
        signal_id: format!("signal-{item_id}"),
        item_id: item_id.to_string(),
        expected_benefit_score: benefit,
        confidence_score: confidence,
        source_model_version: "test-model".to_string(),
    }
}

pub(super) fn block(ingredient_code: &str) -> SafetyConstraint {
    SafetyConstraint {
        constraint_id: format!("block-{ingredient_code}"),
        ingredient_code: ingredient_code.to_string(),
        decision: SafetyDecision::Block,
        max_daily_intake_mg: None,
        reason: "Blocked for testing.".to_string(),
        source_rule_ids: vec![format!("rule-{ingredient_code}")],
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
