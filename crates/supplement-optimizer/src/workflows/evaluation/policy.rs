use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_CASE_COUNT: usize = 100;
pub const DEFAULT_TARGET_PERCENT: f64 = 80.0;

/// Thresholds a batch must clear for the accuracy KPI to count as met.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationPolicy {
    pub min_case_count: usize,
    pub target_percent: f64,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            min_case_count: DEFAULT_MIN_CASE_COUNT,
            target_percent: DEFAULT_TARGET_PERCENT,
        }
    }
}

impl EvaluationPolicy {
    pub fn case_count_satisfied(&self, case_count: usize) -> bool {
        case_count >= self.min_case_count
    }

    pub fn target_satisfied(&self, mean_score_percent: f64) -> bool {
        mean_score_percent >= self.target_percent
    }
}
