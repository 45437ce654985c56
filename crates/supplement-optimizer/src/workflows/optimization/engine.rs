use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::combinations::generate_combinations;
use super::contracts::{is_iso_datetime, Contract, ContractViolation};
use super::domain::{
    ModuleTag, ObjectiveWeights, OptimizationInput, OptimizationOutput, RunPhase, RuntimeDetail,
    RuntimeLog, RuntimeStage, TraceLog,
};
use super::ranking::rank_combos;
use super::safety::{FilterOutcome, SafetyPolicy};
use super::scoring::{ComboScorer, SignalIndex};
use super::trace::{count, RuntimeRecorder, TraceRecorder};

/// Combination size used when neither the request nor configuration overrides it.
pub const DEFAULT_COMBO_SIZE: usize = 2;

/// Engine-wide defaults applied to requests that leave a knob unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub combo_size: usize,
    pub objective_weights: ObjectiveWeights,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            combo_size: DEFAULT_COMBO_SIZE,
            objective_weights: ObjectiveWeights::default(),
        }
    }
}

/// One unit of work: the input document plus optional per-run overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    pub input: OptimizationInput,
    pub generated_at: Option<String>,
    pub combo_size: Option<usize>,
    pub objective_weights: Option<ObjectiveWeights>,
}

impl OptimizationRequest {
    pub fn new(input: OptimizationInput) -> Self {
        Self {
            input,
            generated_at: None,
            combo_size: None,
            objective_weights: None,
        }
    }

    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    pub fn with_combo_size(mut self, combo_size: usize) -> Self {
        self.combo_size = Some(combo_size);
        self
    }

    pub fn with_objective_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.objective_weights = Some(weights);
        self
    }
}

/// Everything a run produces. Trace and runtime entries share `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRun {
    pub module: ModuleTag,
    pub phase: RunPhase,
    pub generated_at: String,
    pub output: OptimizationOutput,
    pub trace_logs: Vec<TraceLog>,
    pub runtime_logs: Vec<RuntimeLog>,
}

impl OptimizationRun {
    /// Borrowed `{output, traceLogs, runtimeLogs}` view for serialization.
    pub fn bundle(&self) -> OutputBundle<'_> {
        OutputBundle {
            output: &self.output,
            trace_logs: &self.trace_logs,
            runtime_logs: &self.runtime_logs,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBundle<'a> {
    pub output: &'a OptimizationOutput,
    pub trace_logs: &'a [TraceLog],
    pub runtime_logs: &'a [RuntimeLog],
}

/// Run-level parameter problems, distinct from a malformed input document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationViolation {
    #[error("comboSize must be a positive integer")]
    ComboSizeNotPositive,
    #[error("comboSize {combo_size} cannot exceed candidate count {candidate_count}")]
    ComboSizeExceedsCandidates {
        combo_size: usize,
        candidate_count: usize,
    },
    #[error("generatedAt must be an ISO datetime string (found {0:?})")]
    InvalidGeneratedAt(String),
}

#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("invalid optimization input: {0}")]
    InvalidInput(ContractViolation),
    #[error("invalid run configuration: {0}")]
    Configuration(#[from] ConfigurationViolation),
    #[error(
        "no qualified combinations remain after constraints \
         (safety: {excluded_safety}, budget: {excluded_budget}, dose: {excluded_dose})"
    )]
    NoQualifiedCombinations {
        excluded_safety: usize,
        excluded_budget: usize,
        excluded_dose: usize,
    },
    #[error("no recommendations generated after ranking")]
    NoRecommendations,
    #[error("assembled optimization output failed validation: {0}")]
    InvalidOutput(ContractViolation),
    #[error("trace log failed validation: {0}")]
    InvalidTrace(ContractViolation),
}

/// Deterministic exhaustive optimizer over small candidate sets.
#[derive(Debug, Clone, Default)]
pub struct OptimizationEngine {
    settings: EngineSettings,
}

impl OptimizationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn run(&self, request: &OptimizationRequest) -> Result<OptimizationRun, OptimizationError> {
        let generated_at = match &request.generated_at {
            Some(timestamp) if is_iso_datetime(timestamp) => timestamp.clone(),
            Some(timestamp) => {
                return Err(ConfigurationViolation::InvalidGeneratedAt(timestamp.clone()).into())
            }
            None => current_timestamp(),
        };

        let input = &request.input;
        input.validate().map_err(OptimizationError::InvalidInput)?;

        let combo_size = request.combo_size.unwrap_or(self.settings.combo_size);
        if combo_size == 0 {
            return Err(ConfigurationViolation::ComboSizeNotPositive.into());
        }
        if combo_size > input.candidates.len() {
            return Err(ConfigurationViolation::ComboSizeExceedsCandidates {
                combo_size,
                candidate_count: input.candidates.len(),
            }
            .into());
        }

        let weights = request
            .objective_weights
            .unwrap_or(self.settings.objective_weights);
        weights.validate().map_err(OptimizationError::InvalidInput)?;

        let signals = SignalIndex::build(input).map_err(OptimizationError::InvalidInput)?;
        let policy = SafetyPolicy::from_input(input);

        let mut runtime = RuntimeRecorder::new(&input.case_id, &generated_at);
        runtime.checkpoint(
            RuntimeStage::InputValidation,
            "validated_inputs",
            [
                ("candidateCount", count(input.candidates.len())),
                ("efficacySignalCount", count(input.efficacy_signals.len())),
                ("safetyConstraintCount", count(input.safety_constraints.len())),
                ("comboSize", count(combo_size)),
                ("topK", count(input.top_k as usize)),
            ],
        );

        let combinations = generate_combinations(&input.candidates, combo_size);
        runtime.checkpoint(
            RuntimeStage::CombinationBuild,
            "generated_combinations",
            [("combinationCount", count(combinations.len()))],
        );

        let FilterOutcome {
            qualified,
            safety_exclusions,
            excluded_by_budget,
            excluded_by_dose,
        } = policy.partition(&combinations);

        let scorer = ComboScorer::new(weights, &signals, &policy, &input.preference);
        let scored = qualified
            .into_iter()
            .map(|draft| scorer.score(draft))
            .collect::<Result<Vec<_>, _>>()
            .map_err(OptimizationError::InvalidInput)?;

        runtime.checkpoint(
            RuntimeStage::SafetyFilter,
            "filtered_combinations",
            [
                ("qualifiedCount", count(scored.len())),
                ("excludedSafetyCount", count(safety_exclusions.len())),
                ("excludedBudgetCount", count(excluded_by_budget)),
                ("excludedDoseCount", count(excluded_by_dose)),
            ],
        );

        if scored.is_empty() {
            return Err(OptimizationError::NoQualifiedCombinations {
                excluded_safety: safety_exclusions.len(),
                excluded_budget: excluded_by_budget,
                excluded_dose: excluded_by_dose,
            });
        }

        let ranking = rank_combos(scored, input.top_k as usize);
        let Some(top_score) = ranking.top_score() else {
            return Err(OptimizationError::NoRecommendations);
        };
        runtime.checkpoint(
            RuntimeStage::Ranking,
            "ranked_recommendations",
            [
                ("rankedComboCount", count(ranking.ranked_count)),
                ("recommendationCount", count(ranking.recommendations.len())),
                ("topScore", RuntimeDetail::Score(top_score)),
            ],
        );

        let mut traces = TraceRecorder::new(&input.case_id, &generated_at);
        for exclusion in &safety_exclusions {
            traces
                .record_exclusion(exclusion)
                .map_err(OptimizationError::InvalidTrace)?;
        }
        for ranked in &ranking.recommendations {
            traces
                .record_ranking(ranked)
                .map_err(OptimizationError::InvalidTrace)?;
        }

        let output = OptimizationOutput {
            case_id: input.case_id.clone(),
            module: input.module,
            schema_version: input.schema_version,
            generated_at: generated_at.clone(),
            top_k: input.top_k,
            objective_weights: weights,
            recommendations: ranking.into_recommendations(),
        };
        output.validate().map_err(OptimizationError::InvalidOutput)?;

        let runtime_log_count = runtime.len();
        runtime.checkpoint(
            RuntimeStage::OutputBuild,
            "built_output",
            [
                ("recommendationCount", count(output.recommendations.len())),
                ("traceLogCount", count(traces.len())),
                ("runtimeLogCount", count(runtime_log_count)),
            ],
        );

        tracing::info!(
            case_id = %output.case_id,
            recommendations = output.recommendations.len(),
            excluded_safety = safety_exclusions.len(),
            top_score,
            "optimization run completed"
        );

        Ok(OptimizationRun {
            module: ModuleTag::OptimizationEngine,
            phase: RunPhase::Mvp,
            generated_at,
            output,
            trace_logs: traces.into_entries(),
            runtime_logs: runtime.into_entries(),
        })
    }
}

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
