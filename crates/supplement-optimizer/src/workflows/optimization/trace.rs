use std::collections::BTreeMap;

use super::contracts::{Contract, ContractViolation};
use super::domain::{
    ModuleTag, RunPhase, RuntimeDetail, RuntimeLog, RuntimeStage, TraceLog, TraceStep,
};
use super::numeric::unique_sorted;
use super::ranking::RankedRecommendation;
use super::safety::SafetyExclusion;

pub const TRACE_ID_PREFIX: &str = "m05-trace-";
pub const RUNTIME_ID_PREFIX: &str = "m05-runtime-";

/// Append-only builder for the evidentiary audit stream.
///
/// Every entry is validated before it is appended, so a recorder never holds
/// an entry that would fail [`TraceLog::validate`].
#[derive(Debug)]
pub struct TraceRecorder {
    case_id: String,
    logged_at: String,
    entries: Vec<TraceLog>,
}

impl TraceRecorder {
    pub fn new(case_id: impl Into<String>, logged_at: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            logged_at: logged_at.into(),
            entries: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        combo_id: &str,
        step: TraceStep,
        detail: String,
        evidence: Vec<String>,
    ) -> Result<&TraceLog, ContractViolation> {
        let entry = TraceLog {
            trace_id: format!("{TRACE_ID_PREFIX}{:04}", self.entries.len() + 1),
            case_id: self.case_id.clone(),
            combo_id: combo_id.to_string(),
            step,
            detail,
            evidence: unique_sorted(evidence),
            logged_at: self.logged_at.clone(),
        };
        entry.validate()?;
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn record_exclusion(
        &mut self,
        exclusion: &SafetyExclusion,
    ) -> Result<&TraceLog, ContractViolation> {
        let detail = format!(
            "Excluded blocked ingredients: {}.",
            exclusion.blocked_ingredient_codes.join(", ")
        );
        let evidence = exclusion
            .blocked_ingredient_codes
            .iter()
            .map(|code| format!("ingredient:{code}"))
            .chain(
                exclusion
                    .constraint_ids
                    .iter()
                    .map(|constraint_id| format!("constraint:{constraint_id}")),
            )
            .collect();
        self.record(&exclusion.combo_id, TraceStep::SafetyFilter, detail, evidence)
    }

    pub fn record_ranking(
        &mut self,
        ranked: &RankedRecommendation,
    ) -> Result<&TraceLog, ContractViolation> {
        let recommendation = &ranked.recommendation;
        let detail = format!(
            "Ranked #{} with total score {}.",
            recommendation.rank, recommendation.score.total_score
        );
        let evidence = ranked
            .signal_ids
            .iter()
            .map(|signal_id| format!("signal:{signal_id}"))
            .chain(
                recommendation
                    .reason_codes
                    .iter()
                    .map(|code| format!("reason:{}", code.label())),
            )
            .collect();
        self.record(&recommendation.combo_id, TraceStep::Ranking, detail, evidence)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<TraceLog> {
        self.entries
    }
}

/// Operational stage checkpoints. Not validated and never used as evidence.
#[derive(Debug)]
pub struct RuntimeRecorder {
    case_id: String,
    logged_at: String,
    entries: Vec<RuntimeLog>,
}

impl RuntimeRecorder {
    pub fn new(case_id: impl Into<String>, logged_at: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            logged_at: logged_at.into(),
            entries: Vec::new(),
        }
    }

    pub fn checkpoint<I, K>(&mut self, stage: RuntimeStage, event: &str, details: I)
    where
        I: IntoIterator<Item = (K, RuntimeDetail)>,
        K: Into<String>,
    {
        let details: BTreeMap<String, RuntimeDetail> = details
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        tracing::debug!(
            case_id = %self.case_id,
            stage = stage.label(),
            event,
            "runtime checkpoint"
        );
        self.entries.push(RuntimeLog {
            log_id: format!("{RUNTIME_ID_PREFIX}{:04}", self.entries.len() + 1),
            case_id: self.case_id.clone(),
            module: ModuleTag::OptimizationEngine,
            phase: RunPhase::Mvp,
            stage,
            event: event.to_string(),
            details,
            logged_at: self.logged_at.clone(),
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<RuntimeLog> {
        self.entries
    }
}

pub(crate) fn count(value: usize) -> RuntimeDetail {
    RuntimeDetail::Count(value as u64)
}
