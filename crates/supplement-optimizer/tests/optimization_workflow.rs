use serde_json::Value;
use supplement_optimizer::workflows::optimization::{
    parse_document, parse_document_str, reference_input, Contract, EngineSettings,
    OptimizationEngine, OptimizationError, OptimizationInput, OptimizationOutput,
    OptimizationRequest, OptimizationRun, SafetyDecision, TraceStep,
};

const GENERATED_AT: &str = "2026-02-14T09:31:00.000Z";

const MINERAL_CASE: &str = r#"{
  "caseId": "mineral-case-001",
  "module": "05_optimization_engine",
  "schemaVersion": "2026-02-scaffold-v1",
  "capturedAt": "2026-02-14T08:00:00Z",
  "topK": 1,
  "profile": {
    "appUserIdHash": "sha256:0b7c1d",
    "ageBand": "30-39",
    "sex": "female",
    "healthGoals": ["bone-health"],
    "conditions": [],
    "medications": []
  },
  "candidates": [
    { "itemId": "item-a", "productCode": "prod-a", "ingredientCodes": ["zinc"], "monthlyCostKrw": 10000, "dailyDoseCount": 1 },
    { "itemId": "item-b", "productCode": "prod-b", "ingredientCodes": ["iron"], "monthlyCostKrw": 20000, "dailyDoseCount": 1 },
    { "itemId": "item-c", "productCode": "prod-c", "ingredientCodes": ["calcium", "zinc"], "monthlyCostKrw": 15000, "dailyDoseCount": 2 }
  ],
  "efficacySignals": [
    { "signalId": "signal-a", "itemId": "item-a", "expectedBenefitScore": 0.9, "confidenceScore": 0.9, "sourceModelVersion": "v1" },
    { "signalId": "signal-b", "itemId": "item-b", "expectedBenefitScore": 0.5, "confidenceScore": 0.8, "sourceModelVersion": "v1" },
    { "signalId": "signal-c", "itemId": "item-c", "expectedBenefitScore": 0.7, "confidenceScore": 0.7, "sourceModelVersion": "v1" }
  ],
  "safetyConstraints": [
    {
      "constraintId": "constraint-calcium",
      "ingredientCode": "calcium",
      "decision": "allow",
      "maxDailyIntakeMg": 500,
      "reason": "Calcium is allowed within the intake range.",
      "sourceRuleIds": ["rule-calcium"]
    }
  ],
  "preference": {
    "monthlyBudgetKrw": 40000,
    "maxDailyDoseCount": 3,
    "preferredIngredientCodes": [],
    "avoidedIngredientCodes": []
  }
}"#;

fn engine() -> OptimizationEngine {
    OptimizationEngine::new(EngineSettings::default())
}

fn reference_run() -> OptimizationRun {
    let request =
        OptimizationRequest::new(reference_input(GENERATED_AT)).with_generated_at(GENERATED_AT);
    engine().run(&request).expect("engine run succeeds")
}

#[test]
fn json_document_runs_end_to_end() {
    let input: OptimizationInput = parse_document_str(MINERAL_CASE).expect("input parses");

    let run = engine()
        .run(&OptimizationRequest::new(input).with_generated_at(GENERATED_AT))
        .expect("engine run succeeds");

    assert_eq!(run.output.recommendations.len(), 1);
    let leader = &run.output.recommendations[0];
    assert_eq!(leader.combo_id, "m05-mvp-combo-item-a-item-c");
    assert_eq!(leader.ingredient_codes, vec!["calcium", "zinc"]);
    assert_eq!(leader.monthly_cost_krw, 25_000.0);

    assert_eq!(run.trace_logs.len(), 1);
    assert_eq!(run.trace_logs[0].step, TraceStep::Ranking);
    assert_eq!(run.runtime_logs.len(), 5);
}

#[test]
fn bundle_serializes_as_documented_wire_shape() {
    let run = reference_run();

    let value = serde_json::to_value(run.bundle()).expect("serialize bundle");
    let object = value.as_object().expect("bundle is an object");
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["output", "runtimeLogs", "traceLogs"]);

    let output: OptimizationOutput = parse_document(&value["output"]).expect("output parses");
    assert_eq!(output, run.output);
    assert_eq!(value["runtimeLogs"][0]["phase"], "MVP");
    assert_eq!(value["runtimeLogs"][0]["stage"], "input_validation");
    assert_eq!(value["traceLogs"][0]["step"], "safety-filter");
    assert_eq!(
        value["output"]["recommendations"][0]["reasonCodes"][0],
        Value::from("budget_fit")
    );
}

#[test]
fn reference_case_honors_hard_constraints() {
    let input = reference_input(GENERATED_AT);
    let blocked: Vec<&str> = input
        .safety_constraints
        .iter()
        .filter(|constraint| constraint.decision == SafetyDecision::Block)
        .map(|constraint| constraint.ingredient_code.as_str())
        .collect();

    let run = engine()
        .run(&OptimizationRequest::new(input.clone()).with_generated_at(GENERATED_AT))
        .expect("engine run succeeds");

    assert!(run.output.is_valid());
    assert!(run.output.recommendations.len() <= input.top_k as usize);
    for recommendation in &run.output.recommendations {
        assert!(recommendation.safety_compliant);
        assert!(recommendation.blocked_ingredient_codes.is_empty());
        assert!(recommendation
            .ingredient_codes
            .iter()
            .all(|code| !blocked.contains(&code.as_str())));
        assert!(recommendation.monthly_cost_krw <= input.preference.monthly_budget_krw);
        assert!(
            recommendation.daily_dose_count <= u64::from(input.preference.max_daily_dose_count)
        );
    }

    let vitamin_k_combos: Vec<_> = run
        .trace_logs
        .iter()
        .filter(|trace| trace.step == TraceStep::SafetyFilter)
        .collect();
    assert_eq!(vitamin_k_combos.len(), 3);
    assert!(vitamin_k_combos.iter().all(|trace| {
        trace.combo_id.contains("vitamin-k")
            && trace
                .evidence
                .contains(&"constraint:m05-constraint-vitamin-k-block".to_string())
    }));
}

#[test]
fn leader_is_the_omega3_magnesium_pair() {
    let run = reference_run();

    let leader = &run.output.recommendations[0];
    assert_eq!(leader.rank, 1);
    assert!(leader.item_ids.contains(&"m05-item-omega3-d".to_string()));
    assert!(leader.item_ids.contains(&"m05-item-magnesium".to_string()));
    assert!(run.output.recommendations[1].score.total_score < leader.score.total_score);
}

#[test]
fn tight_budget_reports_exhaustion() {
    let mut input = reference_input(GENERATED_AT);
    input.preference.monthly_budget_krw = 10_000.0;

    match engine().run(&OptimizationRequest::new(input).with_generated_at(GENERATED_AT)) {
        Err(OptimizationError::NoQualifiedCombinations {
            excluded_safety,
            excluded_budget,
            ..
        }) => {
            assert_eq!(excluded_safety, 3);
            assert_eq!(excluded_budget, 3);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}
