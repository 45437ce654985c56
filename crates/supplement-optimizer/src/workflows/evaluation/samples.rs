use serde::{Deserialize, Serialize};

use super::EvaluationError;
use crate::workflows::optimization::{OptimizationOutput, OptimizationRun, Recommendation};

pub const SAMPLE_ID_PREFIX: &str = "m05-eval-sample-";

/// Pointer to the recommendation a case would act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRecommendationRef {
    pub combo_id: String,
    pub item_ids: Vec<String>,
}

/// One scored case: ground-truth ingredients against what the engine chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracySample {
    pub sample_id: String,
    pub case_id: String,
    pub expected_ingredient_codes: Vec<String>,
    pub observed_ingredient_codes: Vec<String>,
    pub top_recommendation: TopRecommendationRef,
}

/// Lower-cased, trimmed, deduplicated, and sorted; blank codes are dropped.
pub fn normalize_ingredient_codes<'a, I>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut normalized: Vec<String> = codes
        .into_iter()
        .map(|code| code.trim().to_lowercase())
        .filter(|code| !code.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn ingredient_union(recommendations: &[Recommendation]) -> Vec<String> {
    normalize_ingredient_codes(
        recommendations
            .iter()
            .flat_map(|recommendation| recommendation.ingredient_codes.iter()),
    )
}

/// Replicate one expected-vs-observed comparison into `case_count` samples.
///
/// The observed side is the ingredient union of the run's recommendations and
/// every sample points at the run's rank-1 recommendation.
pub fn samples_from_run(
    expected: &OptimizationOutput,
    observed: &OptimizationRun,
    case_count: usize,
) -> Result<Vec<AccuracySample>, EvaluationError> {
    let Some(top) = observed
        .output
        .recommendations
        .iter()
        .min_by_key(|recommendation| recommendation.rank)
    else {
        return Err(EvaluationError::NoRecommendations);
    };

    let expected_codes = ingredient_union(&expected.recommendations);
    let observed_codes = ingredient_union(&observed.output.recommendations);
    let case_id = &expected.case_id;

    Ok((1..=case_count)
        .map(|index| AccuracySample {
            sample_id: format!("{SAMPLE_ID_PREFIX}{index:03}"),
            case_id: format!("{case_id}-{index:03}"),
            expected_ingredient_codes: expected_codes.clone(),
            observed_ingredient_codes: observed_codes.clone(),
            top_recommendation: TopRecommendationRef {
                combo_id: top.combo_id.clone(),
                item_ids: top.item_ids.clone(),
            },
        })
        .collect())
}
