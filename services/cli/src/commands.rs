use crate::infra::{emit_document, load_input};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use supplement_optimizer::config::AppConfig;
use supplement_optimizer::error::AppError;
use supplement_optimizer::workflows::evaluation::{
    samples_from_run, AccuracyEvaluator, AccuracyReport, AccuracySample, EvaluationPhase,
    EvaluationPolicy,
};
use supplement_optimizer::workflows::optimization::{
    assert_bundle, current_timestamp, reference_bundle, reference_input, EngineSettings,
    ModuleTag, ObjectiveWeights, OptimizationEngine, OptimizationRequest, OptimizationRun,
};

#[derive(Args, Debug, Default)]
pub(crate) struct OptimizeArgs {
    /// Optimization input document (JSON). Defaults to the built-in reference scenario.
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Number of items per combination (overrides OPTIMIZER_COMBO_SIZE)
    #[arg(long, value_parser = crate::infra::parse_positive_count)]
    pub(crate) combo_size: Option<usize>,
    /// Objective weights as efficacy,risk,cost summing to 1 (overrides OPTIMIZER_WEIGHTS)
    #[arg(long, value_parser = crate::infra::parse_weights)]
    pub(crate) weights: Option<ObjectiveWeights>,
    /// Timestamp stamped on the output and every log entry (defaults to now)
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) generated_at: Option<String>,
    /// Write the bundle to this path instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Number of case samples to score (defaults to EVAL_MIN_CASE_COUNT)
    #[arg(long, value_parser = crate::infra::parse_positive_count)]
    pub(crate) cases: Option<usize>,
    /// Timestamp for the optimization run (defaults to now)
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) generated_at: Option<String>,
    /// Timestamp for the evaluation report (defaults to the run timestamp)
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) evaluated_at: Option<String>,
    /// Write the evaluation document to this path instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

/// Evaluation report together with the run it was derived from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluationDocument {
    pub(crate) module: ModuleTag,
    pub(crate) phase: EvaluationPhase,
    pub(crate) generated_at: String,
    pub(crate) evaluated_at: String,
    pub(crate) mvp_recommendation_count: usize,
    pub(crate) mvp_trace_log_count: usize,
    pub(crate) mvp_runtime_log_count: usize,
    pub(crate) sample_case_count: usize,
    pub(crate) report: AccuracyReport,
    pub(crate) samples: Vec<AccuracySample>,
}

pub(crate) fn run_optimize(args: OptimizeArgs, config: &AppConfig) -> Result<(), AppError> {
    let out = args.out.clone();
    let run = build_optimization(args, config.engine)?;
    emit_document(&run.bundle(), out.as_deref(), "optimization bundle")
}

pub(crate) fn run_evaluate(args: EvaluateArgs, config: &AppConfig) -> Result<(), AppError> {
    let out = args.out.clone();
    let document = build_evaluation(args, config.engine, config.evaluation)?;
    tracing::info!(
        mean_score_percent = document.report.mean_score_percent,
        target_satisfied = document.report.target_satisfied,
        min_case_count_satisfied = document.report.min_case_count_satisfied,
        "evaluation finished"
    );
    emit_document(&document, out.as_deref(), "evaluation report")
}

pub(crate) fn build_optimization(
    args: OptimizeArgs,
    settings: EngineSettings,
) -> Result<OptimizationRun, AppError> {
    let OptimizeArgs {
        input,
        combo_size,
        weights,
        generated_at,
        out: _,
    } = args;

    let generated_at = generated_at.unwrap_or_else(current_timestamp);
    let input = match input {
        Some(path) => load_input(&path)?,
        None => reference_input(&generated_at),
    };

    let mut request = OptimizationRequest::new(input).with_generated_at(generated_at);
    if let Some(combo_size) = combo_size {
        request = request.with_combo_size(combo_size);
    }
    if let Some(weights) = weights {
        request = request.with_objective_weights(weights);
    }

    Ok(OptimizationEngine::new(settings).run(&request)?)
}

pub(crate) fn build_evaluation(
    args: EvaluateArgs,
    settings: EngineSettings,
    policy: EvaluationPolicy,
) -> Result<EvaluationDocument, AppError> {
    let EvaluateArgs {
        cases,
        generated_at,
        evaluated_at,
        out: _,
    } = args;

    let generated_at = generated_at.unwrap_or_else(current_timestamp);
    let bundle = reference_bundle(&generated_at)?;
    assert_bundle(&bundle)?;

    let request =
        OptimizationRequest::new(bundle.optimization_input.clone()).with_generated_at(&generated_at);
    let run = OptimizationEngine::new(settings).run(&request)?;

    let case_count = cases.unwrap_or(policy.min_case_count);
    let samples = samples_from_run(&bundle.optimization_output, &run, case_count)?;
    let evaluated_at = evaluated_at.unwrap_or_else(|| run.generated_at.clone());
    let report = AccuracyEvaluator::new(policy).evaluate(&samples, &evaluated_at)?;

    Ok(EvaluationDocument {
        module: ModuleTag::OptimizationEngine,
        phase: EvaluationPhase::Evaluation,
        generated_at: run.generated_at.clone(),
        evaluated_at,
        mvp_recommendation_count: run.output.recommendations.len(),
        mvp_trace_log_count: run.trace_logs.len(),
        mvp_runtime_log_count: run.runtime_logs.len(),
        sample_case_count: samples.len(),
        report,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use supplement_optimizer::workflows::optimization::reference::REFERENCE_CASE_ID;

    const GENERATED_AT: &str = "2026-02-14T09:31:00.000Z";
    const LEADER: &str = "m05-mvp-combo-m05-item-magnesium-m05-item-omega3-d";

    fn optimize_args() -> OptimizeArgs {
        OptimizeArgs {
            generated_at: Some(GENERATED_AT.to_string()),
            ..OptimizeArgs::default()
        }
    }

    fn evaluate_args(cases: usize) -> EvaluateArgs {
        EvaluateArgs {
            cases: Some(cases),
            generated_at: Some(GENERATED_AT.to_string()),
            ..EvaluateArgs::default()
        }
    }

    #[test]
    fn optimize_falls_back_to_reference_scenario() {
        let run = build_optimization(optimize_args(), EngineSettings::default())
            .expect("reference run succeeds");

        assert_eq!(run.output.case_id, REFERENCE_CASE_ID);
        assert_eq!(run.generated_at, GENERATED_AT);
        assert_eq!(run.output.recommendations.len(), 2);
        assert_eq!(run.output.recommendations[0].combo_id, LEADER);
        assert!(run.trace_logs.iter().all(|trace| trace.logged_at == GENERATED_AT));
        assert!(run.runtime_logs.iter().all(|log| log.logged_at == GENERATED_AT));
    }

    #[test]
    fn optimize_applies_weight_override() {
        let weights = ObjectiveWeights {
            efficacy: 0.5,
            risk: 0.3,
            cost: 0.2,
        };
        let args = OptimizeArgs {
            weights: Some(weights),
            ..optimize_args()
        };

        let run = build_optimization(args, EngineSettings::default()).expect("run succeeds");
        assert_eq!(run.output.objective_weights, weights);
    }

    #[test]
    fn optimize_rejects_combo_size_above_candidate_count() {
        let args = OptimizeArgs {
            combo_size: Some(50),
            ..optimize_args()
        };

        let err = build_optimization(args, EngineSettings::default()).expect_err("too large");
        assert!(matches!(err, AppError::Optimization(_)), "{err}");
    }

    #[test]
    fn optimize_reads_input_document_from_disk() {
        let dir = std::env::temp_dir()
            .join(format!("supplement-optimizer-input-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("input.json");
        let input = reference_input(GENERATED_AT);
        fs::write(&path, serde_json::to_string(&input).expect("serialize input"))
            .expect("write input");

        let args = OptimizeArgs {
            input: Some(path),
            ..optimize_args()
        };
        let run = build_optimization(args, EngineSettings::default()).expect("run succeeds");

        assert_eq!(run.output.case_id, input.case_id);
        assert_eq!(run.output.recommendations[0].combo_id, LEADER);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn evaluate_scores_reference_run_at_full_accuracy() {
        let document = build_evaluation(
            evaluate_args(5),
            EngineSettings::default(),
            EvaluationPolicy::default(),
        )
        .expect("evaluation succeeds");

        assert_eq!(document.sample_case_count, 5);
        assert_eq!(document.samples.len(), 5);
        assert_eq!(document.evaluated_at, GENERATED_AT);
        assert_eq!(document.mvp_recommendation_count, 2);
        assert_eq!(document.report.case_count, 5);
        assert_eq!(document.report.mean_score_percent, 100.0);
        assert!(document.report.target_satisfied);
        assert!(!document.report.min_case_count_satisfied);
    }

    #[test]
    fn evaluate_defaults_case_count_to_policy_minimum() {
        let policy = EvaluationPolicy {
            min_case_count: 7,
            target_percent: 80.0,
        };
        let args = EvaluateArgs {
            cases: None,
            evaluated_at: Some("2026-02-15T00:00:00.000Z".to_string()),
            ..evaluate_args(1)
        };

        let document =
            build_evaluation(args, EngineSettings::default(), policy).expect("evaluation succeeds");

        assert_eq!(document.sample_case_count, 7);
        assert!(document.report.min_case_count_satisfied);
        assert_eq!(document.report.evaluated_at, "2026-02-15T00:00:00.000Z");

        let value = serde_json::to_value(&document).expect("serializable");
        assert_eq!(value["phase"], "EVALUATION");
        assert_eq!(value["module"], "05_optimization_engine");
        assert_eq!(value["sampleCaseCount"], 7);
    }
}
