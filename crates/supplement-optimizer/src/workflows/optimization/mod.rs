//! Deterministic supplement-combination optimizer.
//!
//! A run validates one [`OptimizationInput`], enumerates fixed-size candidate
//! combinations, drops anything containing a blocked ingredient or breaking the
//! budget and dose ceilings, scores the survivors on efficacy, risk, and cost,
//! and returns the top-K alongside an evidence-linked trace stream.

pub mod combinations;
pub mod contracts;
pub mod domain;
pub mod engine;
pub(crate) mod numeric;
pub mod ranking;
pub mod reference;
pub mod safety;
pub mod scoring;
pub mod trace;

#[cfg(test)]
mod tests;

pub use contracts::{conforms, parse_document, parse_document_str, Contract, ContractViolation};
pub use domain::{
    CandidateItem, EfficacySignal, ModuleTag, ObjectiveWeights, OptimizationInput,
    OptimizationOutput, Preference, ReasonCode, Recommendation, RunPhase, RuntimeDetail,
    RuntimeLog, RuntimeStage, SafetyConstraint, SafetyDecision, SchemaVersion, ScoreBreakdown,
    Sex, TraceLog, TraceStep, UserProfile,
};
pub use engine::{
    current_timestamp, ConfigurationViolation, EngineSettings, OptimizationEngine,
    OptimizationError, OptimizationRequest, OptimizationRun, OutputBundle, DEFAULT_COMBO_SIZE,
};
pub use reference::{assert_bundle, reference_bundle, reference_input, ReferenceBundle};
