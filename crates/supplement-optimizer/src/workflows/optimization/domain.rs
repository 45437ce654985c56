use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Module tag stamped on every optimization document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModuleTag {
    #[default]
    #[serde(rename = "05_optimization_engine")]
    OptimizationEngine,
}

/// Versioned contract tag. Only the current literal is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[default]
    #[serde(rename = "2026-02-scaffold-v1")]
    ScaffoldV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
    Other,
    Unknown,
}

/// Pseudonymized user snapshot captured once per optimization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub app_user_id_hash: String,
    pub age_band: String,
    pub sex: Sex,
    pub health_goals: Vec<String>,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
}

/// Orderable unit eligible for inclusion in a recommended combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    pub item_id: String,
    pub product_code: String,
    pub ingredient_codes: Vec<String>,
    pub monthly_cost_krw: f64,
    pub daily_dose_count: u32,
}

/// Precomputed benefit estimate for exactly one candidate item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficacySignal {
    pub signal_id: String,
    pub item_id: String,
    pub expected_benefit_score: f64,
    pub confidence_score: f64,
    pub source_model_version: String,
}

/// Rules-engine decision over a single ingredient code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyDecision {
    Allow,
    Limit,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyConstraint {
    pub constraint_id: String,
    pub ingredient_code: String,
    pub decision: SafetyDecision,
    pub max_daily_intake_mg: Option<f64>,
    pub reason: String,
    pub source_rule_ids: Vec<String>,
}

/// User-stated ceilings (hard) and ingredient leanings (soft).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub monthly_budget_krw: f64,
    pub max_daily_dose_count: u32,
    pub preferred_ingredient_codes: Vec<String>,
    pub avoided_ingredient_codes: Vec<String>,
}

/// Sole unit of work handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationInput {
    pub case_id: String,
    pub module: ModuleTag,
    pub schema_version: SchemaVersion,
    pub captured_at: String,
    pub top_k: u32,
    pub profile: UserProfile,
    pub candidates: Vec<CandidateItem>,
    pub efficacy_signals: Vec<EfficacySignal>,
    pub safety_constraints: Vec<SafetyConstraint>,
    pub preference: Preference,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub efficacy: f64,
    pub risk: f64,
    pub cost: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            efficacy: 0.6,
            risk: 0.25,
            cost: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub efficacy_component: f64,
    pub risk_component: f64,
    pub cost_component: f64,
    pub total_score: f64,
}

/// Machine-checkable justification attached to a recommendation.
///
/// Variants are declared in lexicographic order of their wire labels so the
/// derived `Ord` matches a plain string sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    BudgetFit,
    DoseConvenience,
    EfficacyPriority,
    GoalMatch,
    SafetyCompliant,
}

impl ReasonCode {
    pub const fn label(self) -> &'static str {
        match self {
            ReasonCode::BudgetFit => "budget_fit",
            ReasonCode::DoseConvenience => "dose_convenience",
            ReasonCode::EfficacyPriority => "efficacy_priority",
            ReasonCode::GoalMatch => "goal_match",
            ReasonCode::SafetyCompliant => "safety_compliant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub rank: u32,
    pub combo_id: String,
    pub item_ids: Vec<String>,
    pub ingredient_codes: Vec<String>,
    pub monthly_cost_krw: f64,
    pub daily_dose_count: u64,
    pub safety_compliant: bool,
    pub blocked_ingredient_codes: Vec<String>,
    pub score: ScoreBreakdown,
    pub reason_codes: Vec<ReasonCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOutput {
    pub case_id: String,
    pub module: ModuleTag,
    pub schema_version: SchemaVersion,
    pub generated_at: String,
    pub top_k: u32,
    pub objective_weights: ObjectiveWeights,
    pub recommendations: Vec<Recommendation>,
}

/// Reasoning step an audit entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceStep {
    SafetyFilter,
    Ranking,
}

/// Evidence-linked audit record for one combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceLog {
    pub trace_id: String,
    pub case_id: String,
    pub combo_id: String,
    pub step: TraceStep,
    pub detail: String,
    pub evidence: Vec<String>,
    pub logged_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    #[serde(rename = "MVP")]
    Mvp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStage {
    InputValidation,
    CombinationBuild,
    SafetyFilter,
    Ranking,
    OutputBuild,
}

impl RuntimeStage {
    pub const fn label(self) -> &'static str {
        match self {
            RuntimeStage::InputValidation => "input_validation",
            RuntimeStage::CombinationBuild => "combination_build",
            RuntimeStage::SafetyFilter => "safety_filter",
            RuntimeStage::Ranking => "ranking",
            RuntimeStage::OutputBuild => "output_build",
        }
    }
}

/// Diagnostic value carried by a runtime checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeDetail {
    Flag(bool),
    Count(u64),
    Score(f64),
    Text(String),
    Empty,
}

/// Coarse stage checkpoint. Operational only, never evidentiary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeLog {
    pub log_id: String,
    pub case_id: String,
    pub module: ModuleTag,
    pub phase: RunPhase,
    pub stage: RuntimeStage,
    pub event: String,
    pub details: BTreeMap<String, RuntimeDetail>,
    pub logged_at: String,
}
