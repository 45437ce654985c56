//! Recommendation-accuracy KPI over a batch of engine runs.
//!
//! Each case scores `100 * |expected ∩ observed| / |expected|` on normalized
//! ingredient codes. The batch score is the mean of the rounded case scores.

mod policy;
mod samples;


pub use policy::{EvaluationPolicy, DEFAULT_MIN_CASE_COUNT, DEFAULT_TARGET_PERCENT};
pub use samples::{
    normalize_ingredient_codes, samples_from_run, AccuracySample, TopRecommendationRef,
    SAMPLE_ID_PREFIX,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::workflows::optimization::contracts::is_iso_datetime;
use crate::workflows::optimization::numeric::round_to;
use crate::workflows::optimization::ModuleTag;

pub const KPI_ID: &str = "kpi-01";
/// Decimal places kept on every reported percentage.
pub const PERCENT_PRECISION: i32 = 2;
pub const ACCURACY_FORMULA: &str = "s_i = 100 * |R_i ∩ Γ_i| / |R_i|; Score = (1/N) * sum(s_i)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvaluationPhase {
    #[default]
    #[serde(rename = "EVALUATION")]
    Evaluation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("evaluation requires at least one case sample")]
    EmptyBatch,
    #[error("samples[{index}].{field} {problem}")]
    MalformedSample {
        index: usize,
        field: &'static str,
        problem: &'static str,
    },
    #[error("evaluatedAt must be a valid ISO datetime string (found {0:?})")]
    InvalidEvaluatedAt(String),
    #[error("evaluation requires at least one observed recommendation")]
    NoRecommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyCaseResult {
    pub sample_id: String,
    pub case_id: String,
    pub expected_ingredient_count: usize,
    pub observed_ingredient_count: usize,
    pub overlap_ingredient_count: usize,
    pub score_percent: f64,
    pub missing_ingredient_codes: Vec<String>,
    pub extra_ingredient_codes: Vec<String>,
    pub top_recommendation_combo_id: String,
    pub intervention_link_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    pub module: ModuleTag,
    pub phase: EvaluationPhase,
    pub kpi_id: String,
    pub formula: String,
    pub evaluated_at: String,
    pub case_count: usize,
    pub mean_score_percent: f64,
    pub target_percent: f64,
    pub min_case_count: usize,
    pub target_satisfied: bool,
    pub min_case_count_satisfied: bool,
    pub intervention_link_ready_case_count: usize,
    pub intervention_link_readiness_percent: f64,
    pub case_results: Vec<AccuracyCaseResult>,
}

/// Applies an [`EvaluationPolicy`] to a batch of samples.
#[derive(Debug, Clone, Default)]
pub struct AccuracyEvaluator {
    policy: EvaluationPolicy,
}

impl AccuracyEvaluator {
    pub fn new(policy: EvaluationPolicy) -> Self {
        Self { policy }
    }

    pub fn evaluate(
        &self,
        samples: &[AccuracySample],
        evaluated_at: &str,
    ) -> Result<AccuracyReport, EvaluationError> {
        if samples.is_empty() {
            return Err(EvaluationError::EmptyBatch);
        }
        if !is_iso_datetime(evaluated_at) {
            return Err(EvaluationError::InvalidEvaluatedAt(evaluated_at.to_string()));
        }

        let case_results = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                check_sample(sample, index)?;
                Ok(score_sample(sample))
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        let case_count = case_results.len();
        let mean_score_percent = round_to(
            case_results
                .iter()
                .map(|result| result.score_percent)
                .sum::<f64>()
                / case_count as f64,
            PERCENT_PRECISION,
        );
        let ready_count = case_results
            .iter()
            .filter(|result| result.intervention_link_ready)
            .count();

        let report = AccuracyReport {
            module: ModuleTag::OptimizationEngine,
            phase: EvaluationPhase::Evaluation,
            kpi_id: KPI_ID.to_string(),
            formula: ACCURACY_FORMULA.to_string(),
            evaluated_at: evaluated_at.to_string(),
            case_count,
            mean_score_percent,
            target_percent: self.policy.target_percent,
            min_case_count: self.policy.min_case_count,
            target_satisfied: self.policy.target_satisfied(mean_score_percent),
            min_case_count_satisfied: self.policy.case_count_satisfied(case_count),
            intervention_link_ready_case_count: ready_count,
            intervention_link_readiness_percent: round_to(
                ready_count as f64 / case_count as f64 * 100.0,
                PERCENT_PRECISION,
            ),
            case_results,
        };

        tracing::info!(
            case_count,
            mean_score_percent,
            target_satisfied = report.target_satisfied,
            min_case_count_satisfied = report.min_case_count_satisfied,
            "recommendation accuracy evaluated"
        );

        Ok(report)
    }
}

fn malformed(index: usize, field: &'static str, problem: &'static str) -> EvaluationError {
    EvaluationError::MalformedSample {
        index,
        field,
        problem,
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_sample(sample: &AccuracySample, index: usize) -> Result<(), EvaluationError> {
    const NON_EMPTY: &str = "must be a non-empty string";
    const NO_ENTRIES: &str = "must include at least one entry";
    const BLANK_ENTRY: &str = "must contain non-empty strings";

    if is_blank(&sample.sample_id) {
        return Err(malformed(index, "sampleId", NON_EMPTY));
    }
    if is_blank(&sample.case_id) {
        return Err(malformed(index, "caseId", NON_EMPTY));
    }

    let lists = [
        ("expectedIngredientCodes", &sample.expected_ingredient_codes),
        ("observedIngredientCodes", &sample.observed_ingredient_codes),
        ("topRecommendation.itemIds", &sample.top_recommendation.item_ids),
    ];
    for (field, values) in lists {
        if values.is_empty() {
            return Err(malformed(index, field, NO_ENTRIES));
        }
        if values.iter().any(|value| is_blank(value)) {
            return Err(malformed(index, field, BLANK_ENTRY));
        }
    }

    if is_blank(&sample.top_recommendation.combo_id) {
        return Err(malformed(index, "topRecommendation.comboId", NON_EMPTY));
    }
    Ok(())
}

fn score_sample(sample: &AccuracySample) -> AccuracyCaseResult {
    let expected = normalize_ingredient_codes(&sample.expected_ingredient_codes);
    let observed = normalize_ingredient_codes(&sample.observed_ingredient_codes);
    let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let observed_set: BTreeSet<&str> = observed.iter().map(String::as_str).collect();

    let (overlap, missing): (Vec<String>, Vec<String>) = expected
        .iter()
        .cloned()
        .partition(|code| observed_set.contains(code.as_str()));
    let extra: Vec<String> = observed
        .iter()
        .filter(|code| !expected_set.contains(code.as_str()))
        .cloned()
        .collect();

    let top = &sample.top_recommendation;
    AccuracyCaseResult {
        sample_id: sample.sample_id.clone(),
        case_id: sample.case_id.clone(),
        expected_ingredient_count: expected.len(),
        observed_ingredient_count: observed.len(),
        overlap_ingredient_count: overlap.len(),
        score_percent: round_to(
            overlap.len() as f64 / expected.len() as f64 * 100.0,
            PERCENT_PRECISION,
        ),
        missing_ingredient_codes: missing,
        extra_ingredient_codes: extra,
        top_recommendation_combo_id: top.combo_id.clone(),
        intervention_link_ready: !is_blank(&top.combo_id) && !top.item_ids.is_empty(),
    }
}
