//! Reference metabolic case used by the command-line service, the evaluation
//! harness, and the end-to-end tests.
//!
//! The expected output here is hand-authored. It is what a reviewer expects to
//! see for this case, not a snapshot of the engine, so its ids and scores
//! differ from a live run while its ingredient selection agrees.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::contracts::{is_iso_datetime, Contract, ContractViolation};
use super::domain::{
    CandidateItem, EfficacySignal, ModuleTag, ObjectiveWeights, OptimizationInput,
    OptimizationOutput, Preference, ReasonCode, Recommendation, SafetyConstraint, SafetyDecision,
    SchemaVersion, ScoreBreakdown, Sex, TraceLog, TraceStep, UserProfile,
};
use super::numeric::{normalize_token, unique_sorted};

pub const REFERENCE_CASE_ID: &str = "rnd05-case-metabolic-001";
pub const REFERENCE_TOP_K: u32 = 2;

/// Input, expected output, and trace entries for one reviewed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceBundle {
    pub generated_at: String,
    pub optimization_input: OptimizationInput,
    pub optimization_output: OptimizationOutput,
    pub trace_logs: Vec<TraceLog>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn candidate(slug: &str, ingredients: &[&str], cost: f64, doses: u32) -> CandidateItem {
    CandidateItem {
        item_id: format!("m05-item-{slug}"),
        product_code: format!("prod-{slug}-01"),
        ingredient_codes: strings(ingredients),
        monthly_cost_krw: cost,
        daily_dose_count: doses,
    }
}

fn signal(slug: &str, benefit: f64, confidence: f64) -> EfficacySignal {
    EfficacySignal {
        signal_id: format!("m05-signal-{slug}"),
        item_id: format!("m05-item-{slug}"),
        expected_benefit_score: benefit,
        confidence_score: confidence,
        source_model_version: "module04-v1.0.0".to_string(),
    }
}

fn constraint(
    constraint_id: &str,
    ingredient_code: &str,
    decision: SafetyDecision,
    cap: Option<f64>,
    reason: &str,
    rule_id: &str,
) -> SafetyConstraint {
    SafetyConstraint {
        constraint_id: constraint_id.to_string(),
        ingredient_code: ingredient_code.to_string(),
        decision,
        max_daily_intake_mg: cap,
        reason: reason.to_string(),
        source_rule_ids: vec![rule_id.to_string()],
    }
}

/// Four candidates, a warfarin-driven vitamin K block and a magnesium cap.
pub fn reference_input(captured_at: &str) -> OptimizationInput {
    OptimizationInput {
        case_id: REFERENCE_CASE_ID.to_string(),
        module: ModuleTag::OptimizationEngine,
        schema_version: SchemaVersion::ScaffoldV1,
        captured_at: captured_at.to_string(),
        top_k: REFERENCE_TOP_K,
        profile: UserProfile {
            app_user_id_hash: "sha256:20fa95ef337db99f".to_string(),
            age_band: "40-49".to_string(),
            sex: Sex::Male,
            health_goals: strings(&["metabolic-balance", "sleep-quality"]),
            conditions: strings(&["prediabetes"]),
            medications: strings(&["warfarin"]),
        },
        candidates: vec![
            candidate("omega3-d", &["omega3", "vitamin_d"], 42_000.0, 2),
            candidate("magnesium", &["magnesium"], 18_000.0, 1),
            candidate("probiotic", &["probiotic"], 26_000.0, 1),
            candidate("vitamin-k", &["vitamin_k"], 15_000.0, 1),
        ],
        efficacy_signals: vec![
            signal("omega3-d", 0.81, 0.79),
            signal("magnesium", 0.74, 0.88),
            signal("probiotic", 0.68, 0.72),
            signal("vitamin-k", 0.65, 0.66),
        ],
        safety_constraints: vec![
            constraint(
                "m05-constraint-vitamin-k-block",
                "vitamin_k",
                SafetyDecision::Block,
                None,
                "Blocked due to interaction risk with active warfarin medication.",
                "m03-rule-vitk-warfarin",
            ),
            constraint(
                "m05-constraint-magnesium-limit",
                "magnesium",
                SafetyDecision::Limit,
                Some(350.0),
                "Daily magnesium intake must remain at or below 350mg/day.",
                "m03-rule-magnesium-max",
            ),
            constraint(
                "m05-constraint-omega3-allow",
                "omega3",
                SafetyDecision::Allow,
                Some(2_000.0),
                "Omega-3 is allowed within the configured intake range.",
                "m03-rule-omega3-allow",
            ),
        ],
        preference: Preference {
            monthly_budget_krw: 70_000.0,
            max_daily_dose_count: 3,
            preferred_ingredient_codes: strings(&["omega3", "magnesium"]),
            avoided_ingredient_codes: strings(&["vitamin_k"]),
        },
    }
}

fn expected_output(generated_at: &str) -> OptimizationOutput {
    OptimizationOutput {
        case_id: REFERENCE_CASE_ID.to_string(),
        module: ModuleTag::OptimizationEngine,
        schema_version: SchemaVersion::ScaffoldV1,
        generated_at: generated_at.to_string(),
        top_k: REFERENCE_TOP_K,
        objective_weights: ObjectiveWeights::default(),
        recommendations: vec![
            Recommendation {
                rank: 1,
                combo_id: "m05-combo-omega3-magnesium".to_string(),
                item_ids: strings(&["m05-item-omega3-d", "m05-item-magnesium"]),
                ingredient_codes: strings(&["magnesium", "omega3", "vitamin_d"]),
                monthly_cost_krw: 60_000.0,
                daily_dose_count: 3,
                safety_compliant: true,
                blocked_ingredient_codes: Vec::new(),
                score: ScoreBreakdown {
                    efficacy_component: 0.86,
                    risk_component: 0.92,
                    cost_component: 0.78,
                    total_score: 0.863,
                },
                reason_codes: vec![
                    ReasonCode::BudgetFit,
                    ReasonCode::DoseConvenience,
                    ReasonCode::EfficacyPriority,
                    ReasonCode::GoalMatch,
                    ReasonCode::SafetyCompliant,
                ],
            },
            Recommendation {
                rank: 2,
                combo_id: "m05-combo-omega3-probiotic".to_string(),
                item_ids: strings(&["m05-item-omega3-d", "m05-item-probiotic"]),
                ingredient_codes: strings(&["omega3", "probiotic", "vitamin_d"]),
                monthly_cost_krw: 68_000.0,
                daily_dose_count: 3,
                safety_compliant: true,
                blocked_ingredient_codes: Vec::new(),
                score: ScoreBreakdown {
                    efficacy_component: 0.81,
                    risk_component: 0.96,
                    cost_component: 0.72,
                    total_score: 0.834,
                },
                reason_codes: vec![
                    ReasonCode::BudgetFit,
                    ReasonCode::DoseConvenience,
                    ReasonCode::GoalMatch,
                    ReasonCode::SafetyCompliant,
                ],
            },
        ],
    }
}

fn expected_traces(generated_at: &str) -> Vec<TraceLog> {
    let entry = |trace_id: &str, combo_id: &str, step, detail: &str, evidence: &[&str]| TraceLog {
        trace_id: trace_id.to_string(),
        case_id: REFERENCE_CASE_ID.to_string(),
        combo_id: combo_id.to_string(),
        step,
        detail: detail.to_string(),
        evidence: strings(evidence),
        logged_at: generated_at.to_string(),
    };

    vec![
        entry(
            "m05-trace-filter-vitamin-k",
            "m05-combo-omega3-magnesium",
            TraceStep::SafetyFilter,
            "Candidates containing vitamin_k were excluded from ranking.",
            &["m03-rule-vitk-warfarin", "m05-constraint-vitamin-k-block"],
        ),
        entry(
            "m05-trace-rank-001",
            "m05-combo-omega3-magnesium",
            TraceStep::Ranking,
            "Highest weighted score after applying efficacy/risk/cost objectives.",
            &["m05-signal-magnesium", "m05-signal-omega3-d"],
        ),
        entry(
            "m05-trace-rank-002",
            "m05-combo-omega3-probiotic",
            TraceStep::Ranking,
            "Selected as a budget-fit alternative with lower efficacy component.",
            &["m05-signal-omega3-d", "m05-signal-probiotic"],
        ),
    ]
}

/// Build the reference bundle stamped with `generated_at` and check it.
pub fn reference_bundle(generated_at: &str) -> Result<ReferenceBundle, ContractViolation> {
    if !is_iso_datetime(generated_at) {
        return Err(ContractViolation::InvalidTimestamp {
            field: "generatedAt".to_string(),
            value: generated_at.to_string(),
        });
    }

    let bundle = ReferenceBundle {
        generated_at: generated_at.to_string(),
        optimization_input: reference_input(generated_at),
        optimization_output: expected_output(generated_at),
        trace_logs: expected_traces(generated_at),
    };
    assert_bundle(&bundle)?;
    Ok(bundle)
}

fn inconsistent(message: impl Into<String>) -> ContractViolation {
    ContractViolation::Inconsistent(message.into())
}

/// Cross-document consistency check over an input, output, and trace set.
pub fn assert_bundle(bundle: &ReferenceBundle) -> Result<(), ContractViolation> {
    let input = &bundle.optimization_input;
    let output = &bundle.optimization_output;

    if !is_iso_datetime(&bundle.generated_at) {
        return Err(ContractViolation::InvalidTimestamp {
            field: "generatedAt".to_string(),
            value: bundle.generated_at.clone(),
        });
    }
    input.validate()?;
    output.validate()?;

    if bundle.trace_logs.is_empty() {
        return Err(ContractViolation::EmptyList {
            field: "traceLogs".to_string(),
        });
    }
    for trace in &bundle.trace_logs {
        trace.validate()?;
    }

    if input.case_id != output.case_id {
        return Err(inconsistent("caseId differs between input and output"));
    }
    if let Some(trace) = bundle
        .trace_logs
        .iter()
        .find(|trace| trace.case_id != input.case_id)
    {
        return Err(inconsistent(format!(
            "trace {} has mismatched caseId",
            trace.trace_id
        )));
    }
    if output.generated_at != bundle.generated_at {
        return Err(inconsistent("bundle generatedAt must match output generatedAt"));
    }
    if input.top_k != output.top_k {
        return Err(inconsistent("topK differs between input and output"));
    }

    let mut candidates: BTreeMap<&str, &CandidateItem> = BTreeMap::new();
    for candidate in &input.candidates {
        if candidates
            .insert(candidate.item_id.as_str(), candidate)
            .is_some()
        {
            return Err(ContractViolation::DuplicateCandidate {
                item_id: candidate.item_id.clone(),
            });
        }
    }

    let signal_ids: BTreeSet<&str> = input
        .efficacy_signals
        .iter()
        .map(|signal| signal.signal_id.as_str())
        .collect();
    if signal_ids.len() != input.efficacy_signals.len() {
        return Err(inconsistent("efficacy signals must be unique by signalId"));
    }
    let signal_items: BTreeSet<&str> = input
        .efficacy_signals
        .iter()
        .map(|signal| signal.item_id.as_str())
        .collect();
    if let Some(unknown) = signal_items
        .iter()
        .find(|item_id| !candidates.contains_key(**item_id))
    {
        return Err(ContractViolation::UnknownSignalItem {
            item_id: unknown.to_string(),
        });
    }
    if signal_items.len() != candidates.len() {
        return Err(inconsistent(
            "exactly one efficacy signal per candidate item is required",
        ));
    }

    let blocked: BTreeSet<String> = input
        .safety_constraints
        .iter()
        .filter(|constraint| constraint.decision == SafetyDecision::Block)
        .map(|constraint| normalize_token(&constraint.ingredient_code))
        .collect();

    let preference = &input.preference;
    for recommendation in &output.recommendations {
        check_recommendation(recommendation, &candidates, &blocked, preference)?;
    }

    let combo_ids: BTreeSet<&str> = output
        .recommendations
        .iter()
        .map(|recommendation| recommendation.combo_id.as_str())
        .collect();
    if let Some(trace) = bundle
        .trace_logs
        .iter()
        .find(|trace| !combo_ids.contains(trace.combo_id.as_str()))
    {
        return Err(inconsistent(format!(
            "trace {} references unknown comboId {}",
            trace.trace_id, trace.combo_id
        )));
    }

    Ok(())
}

fn check_recommendation(
    recommendation: &Recommendation,
    candidates: &BTreeMap<&str, &CandidateItem>,
    blocked: &BTreeSet<String>,
    preference: &Preference,
) -> Result<(), ContractViolation> {
    let combo_id = &recommendation.combo_id;
    if unique_sorted(recommendation.item_ids.iter().map(String::as_str)).len()
        != recommendation.item_ids.len()
    {
        return Err(inconsistent(format!(
            "duplicate itemIds found in recommendation {combo_id}"
        )));
    }

    let mut monthly_cost_krw = 0.0;
    let mut daily_dose_count = 0u64;
    let mut ingredient_codes = Vec::new();
    for item_id in &recommendation.item_ids {
        let Some(candidate) = candidates.get(item_id.as_str()) else {
            return Err(inconsistent(format!(
                "recommendation {combo_id} references unknown itemId {item_id}"
            )));
        };
        monthly_cost_krw += candidate.monthly_cost_krw;
        daily_dose_count += u64::from(candidate.daily_dose_count);
        ingredient_codes.extend(candidate.ingredient_codes.iter().map(String::as_str));
    }

    let actual = unique_sorted(recommendation.ingredient_codes.iter().map(String::as_str));
    if actual != unique_sorted(ingredient_codes) {
        return Err(inconsistent(format!(
            "recommendation {combo_id} has ingredientCodes mismatch with itemIds"
        )));
    }
    if (recommendation.monthly_cost_krw - monthly_cost_krw).abs() > 1e-6 {
        return Err(inconsistent(format!(
            "recommendation {combo_id} has monthlyCostKrw mismatch"
        )));
    }
    if recommendation.daily_dose_count != daily_dose_count {
        return Err(inconsistent(format!(
            "recommendation {combo_id} has dailyDoseCount mismatch"
        )));
    }
    if recommendation.monthly_cost_krw > preference.monthly_budget_krw {
        return Err(inconsistent(format!(
            "recommendation {combo_id} exceeds configured monthly budget"
        )));
    }
    if recommendation.daily_dose_count > u64::from(preference.max_daily_dose_count) {
        return Err(inconsistent(format!(
            "recommendation {combo_id} exceeds configured maxDailyDoseCount"
        )));
    }

    let present: Vec<&str> = actual
        .iter()
        .map(String::as_str)
        .filter(|code| blocked.contains(&normalize_token(code)))
        .collect();
    if !present.is_empty() {
        return Err(inconsistent(format!(
            "recommendation {combo_id} includes blocked ingredients: {}",
            present.join(", ")
        )));
    }

    Ok(())
}
