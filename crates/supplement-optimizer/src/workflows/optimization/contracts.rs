//! Structural and invariant checks for every optimization document.
//!
//! Parsing happens in two steps: `serde` rejects documents with the wrong shape
//! (missing fields, unknown enum tags, negative or fractional counts), then
//! [`Contract::validate`] enforces the data-dependent rules that types cannot
//! express. Nothing here repairs input; a failing document is always rejected.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::domain::{
    CandidateItem, EfficacySignal, ObjectiveWeights, OptimizationInput, OptimizationOutput,
    Preference, Recommendation, SafetyConstraint, SafetyDecision, ScoreBreakdown, TraceLog,
    UserProfile,
};

/// Tolerance applied when checking that objective weights sum to one.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Validation failures, each naming the offending entity or field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    #[error("{entity} payload is malformed: {detail}")]
    Malformed { entity: &'static str, detail: String },
    #[error("{field} must be a non-empty string")]
    EmptyString { field: String },
    #[error("{field} must include at least one entry")]
    EmptyList { field: String },
    #[error("{field} must be an ISO datetime string (found {value:?})")]
    InvalidTimestamp { field: String, value: String },
    #[error("{field} must be between 0 and 1 (found {value})")]
    RateOutOfRange { field: String, value: f64 },
    #[error("{field} must be a finite non-negative number (found {value})")]
    InvalidAmount { field: String, value: f64 },
    #[error("{field} must be a positive integer")]
    NotPositive { field: String },
    #[error("safety constraint {constraint_id} uses decision `limit` without maxDailyIntakeMg")]
    LimitWithoutCap { constraint_id: String },
    #[error("safety constraint {constraint_id} uses decision `block` but sets maxDailyIntakeMg")]
    BlockWithCap { constraint_id: String },
    #[error("{field} must sum to exactly 1 (found {sum})")]
    WeightSum { field: String, sum: f64 },
    #[error("candidates must be unique by itemId (duplicate {item_id})")]
    DuplicateCandidate { item_id: String },
    #[error("efficacy signal references unknown itemId: {item_id}")]
    UnknownSignalItem { item_id: String },
    #[error("duplicate efficacy signal for itemId: {item_id}")]
    DuplicateSignal { item_id: String },
    #[error("missing efficacy signal for itemId: {item_id}")]
    MissingSignal { item_id: String },
    #[error("recommendations must be unique by comboId (duplicate {combo_id})")]
    DuplicateCombo { combo_id: String },
    #[error("recommendation ranks must be contiguous starting at 1")]
    NonContiguousRanks,
    #[error("recommendations must be sorted by descending totalScore (rank {rank} outscores rank {previous})")]
    ScoreOrder { rank: u32, previous: u32 },
    #[error("recommendation count {count} exceeds topK {top_k}")]
    TooManyRecommendations { count: usize, top_k: u32 },
    #[error("recommendation {combo_id} is marked safety compliant but lists blocked ingredients")]
    CompliantWithBlocked { combo_id: String },
    #[error("{field} must be sorted and free of duplicates")]
    UnsortedEvidence { field: String },
    #[error("{0}")]
    Inconsistent(String),
}

/// Document shape with invariants beyond what deserialization guarantees.
pub trait Contract {
    /// Name used as the root of every reported field path.
    const ENTITY: &'static str;

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation>;

    fn validate(&self) -> Result<(), ContractViolation> {
        self.validate_at(Self::ENTITY)
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Parse an arbitrary JSON value into `T` and enforce its contract.
pub fn parse_document<T>(value: &Value) -> Result<T, ContractViolation>
where
    T: Contract + DeserializeOwned,
{
    let document: T =
        serde_json::from_value(value.clone()).map_err(|err| ContractViolation::Malformed {
            entity: T::ENTITY,
            detail: err.to_string(),
        })?;
    document.validate()?;
    Ok(document)
}

/// Same as [`parse_document`] but starting from raw JSON text.
pub fn parse_document_str<T>(raw: &str) -> Result<T, ContractViolation>
where
    T: Contract + DeserializeOwned,
{
    let document: T = serde_json::from_str(raw).map_err(|err| ContractViolation::Malformed {
        entity: T::ENTITY,
        detail: err.to_string(),
    })?;
    document.validate()?;
    Ok(document)
}

/// Boolean guard variant of [`parse_document`].
pub fn conforms<T>(value: &Value) -> bool
where
    T: Contract + DeserializeOwned,
{
    parse_document::<T>(value).is_ok()
}

/// Accepts RFC 3339, offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`, or a bare date.
pub fn is_iso_datetime(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    DateTime::parse_from_rfc3339(trimmed).is_ok()
        || NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn indexed(path: &str, field: &str, index: usize) -> String {
    format!("{}[{index}]", join(path, field))
}

fn require_text(value: &str, field: impl FnOnce() -> String) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::EmptyString { field: field() });
    }
    Ok(())
}

fn require_texts(values: &[String], path: &str, field: &str) -> Result<(), ContractViolation> {
    for (index, value) in values.iter().enumerate() {
        require_text(value, || indexed(path, field, index))?;
    }
    Ok(())
}

fn require_non_empty_texts(
    values: &[String],
    path: &str,
    field: &str,
) -> Result<(), ContractViolation> {
    if values.is_empty() {
        return Err(ContractViolation::EmptyList {
            field: join(path, field),
        });
    }
    require_texts(values, path, field)
}

fn require_timestamp(value: &str, path: &str, field: &str) -> Result<(), ContractViolation> {
    if !is_iso_datetime(value) {
        return Err(ContractViolation::InvalidTimestamp {
            field: join(path, field),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn require_rate(value: f64, path: &str, field: &str) -> Result<(), ContractViolation> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ContractViolation::RateOutOfRange {
            field: join(path, field),
            value,
        });
    }
    Ok(())
}

fn require_amount(value: f64, path: &str, field: &str) -> Result<(), ContractViolation> {
    if !value.is_finite() || value < 0.0 {
        return Err(ContractViolation::InvalidAmount {
            field: join(path, field),
            value,
        });
    }
    Ok(())
}

fn require_positive(
    value: impl Into<u64>,
    path: &str,
    field: &str,
) -> Result<(), ContractViolation> {
    if value.into() == 0 {
        return Err(ContractViolation::NotPositive {
            field: join(path, field),
        });
    }
    Ok(())
}

fn require_entries<T: Contract>(
    values: &[T],
    path: &str,
    field: &str,
) -> Result<(), ContractViolation> {
    if values.is_empty() {
        return Err(ContractViolation::EmptyList {
            field: join(path, field),
        });
    }
    for (index, value) in values.iter().enumerate() {
        value.validate_at(&indexed(path, field, index))?;
    }
    Ok(())
}

impl Contract for UserProfile {
    const ENTITY: &'static str = "profile";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.app_user_id_hash, || join(path, "appUserIdHash"))?;
        require_text(&self.age_band, || join(path, "ageBand"))?;
        require_texts(&self.health_goals, path, "healthGoals")?;
        require_texts(&self.conditions, path, "conditions")?;
        require_texts(&self.medications, path, "medications")
    }
}

impl Contract for CandidateItem {
    const ENTITY: &'static str = "candidate";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.item_id, || join(path, "itemId"))?;
        require_text(&self.product_code, || join(path, "productCode"))?;
        require_non_empty_texts(&self.ingredient_codes, path, "ingredientCodes")?;
        require_amount(self.monthly_cost_krw, path, "monthlyCostKrw")?;
        require_positive(self.daily_dose_count, path, "dailyDoseCount")
    }
}

impl Contract for EfficacySignal {
    const ENTITY: &'static str = "efficacySignal";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.signal_id, || join(path, "signalId"))?;
        require_text(&self.item_id, || join(path, "itemId"))?;
        require_rate(self.expected_benefit_score, path, "expectedBenefitScore")?;
        require_rate(self.confidence_score, path, "confidenceScore")?;
        require_text(&self.source_model_version, || {
            join(path, "sourceModelVersion")
        })
    }
}

impl Contract for SafetyConstraint {
    const ENTITY: &'static str = "safetyConstraint";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.constraint_id, || join(path, "constraintId"))?;
        require_text(&self.ingredient_code, || join(path, "ingredientCode"))?;
        if let Some(cap) = self.max_daily_intake_mg {
            require_amount(cap, path, "maxDailyIntakeMg")?;
        }
        require_text(&self.reason, || join(path, "reason"))?;
        require_non_empty_texts(&self.source_rule_ids, path, "sourceRuleIds")?;

        match (self.decision, self.max_daily_intake_mg) {
            (SafetyDecision::Limit, None) => Err(ContractViolation::LimitWithoutCap {
                constraint_id: self.constraint_id.clone(),
            }),
            (SafetyDecision::Block, Some(_)) => Err(ContractViolation::BlockWithCap {
                constraint_id: self.constraint_id.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl Contract for Preference {
    const ENTITY: &'static str = "preference";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_amount(self.monthly_budget_krw, path, "monthlyBudgetKrw")?;
        require_positive(self.max_daily_dose_count, path, "maxDailyDoseCount")?;
        require_texts(
            &self.preferred_ingredient_codes,
            path,
            "preferredIngredientCodes",
        )?;
        require_texts(&self.avoided_ingredient_codes, path, "avoidedIngredientCodes")
    }
}

impl Contract for OptimizationInput {
    const ENTITY: &'static str = "optimizationInput";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.case_id, || join(path, "caseId"))?;
        require_timestamp(&self.captured_at, path, "capturedAt")?;
        require_positive(self.top_k, path, "topK")?;
        self.profile.validate_at(&join(path, "profile"))?;
        require_entries(&self.candidates, path, "candidates")?;
        require_entries(&self.efficacy_signals, path, "efficacySignals")?;
        require_entries(&self.safety_constraints, path, "safetyConstraints")?;
        self.preference.validate_at(&join(path, "preference"))
    }
}

impl Contract for ObjectiveWeights {
    const ENTITY: &'static str = "objectiveWeights";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_rate(self.efficacy, path, "efficacy")?;
        require_rate(self.risk, path, "risk")?;
        require_rate(self.cost, path, "cost")?;

        let sum = self.efficacy + self.risk + self.cost;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ContractViolation::WeightSum {
                field: path.to_string(),
                sum,
            });
        }
        Ok(())
    }
}

impl FromStr for ObjectiveWeights {
    type Err = ContractViolation;

    /// Parses `efficacy,risk,cost` and validates the result.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ContractViolation::Malformed {
                entity: Self::ENTITY,
                detail: format!("'{raw}' is not a list of numbers ({err})"),
            })?;

        let &[efficacy, risk, cost] = parts.as_slice() else {
            return Err(ContractViolation::Malformed {
                entity: Self::ENTITY,
                detail: format!("expected efficacy,risk,cost but found {} value(s)", parts.len()),
            });
        };

        let weights = Self {
            efficacy,
            risk,
            cost,
        };
        weights.validate()?;
        Ok(weights)
    }
}

impl Contract for ScoreBreakdown {
    const ENTITY: &'static str = "score";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_rate(self.efficacy_component, path, "efficacyComponent")?;
        require_rate(self.risk_component, path, "riskComponent")?;
        require_rate(self.cost_component, path, "costComponent")?;
        require_rate(self.total_score, path, "totalScore")
    }
}

impl Contract for Recommendation {
    const ENTITY: &'static str = "recommendation";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_positive(self.rank, path, "rank")?;
        require_text(&self.combo_id, || join(path, "comboId"))?;
        require_non_empty_texts(&self.item_ids, path, "itemIds")?;
        require_non_empty_texts(&self.ingredient_codes, path, "ingredientCodes")?;
        require_amount(self.monthly_cost_krw, path, "monthlyCostKrw")?;
        require_positive(self.daily_dose_count, path, "dailyDoseCount")?;
        require_texts(&self.blocked_ingredient_codes, path, "blockedIngredientCodes")?;
        self.score.validate_at(&join(path, "score"))?;
        if self.reason_codes.is_empty() {
            return Err(ContractViolation::EmptyList {
                field: join(path, "reasonCodes"),
            });
        }
        if self.safety_compliant && !self.blocked_ingredient_codes.is_empty() {
            return Err(ContractViolation::CompliantWithBlocked {
                combo_id: self.combo_id.clone(),
            });
        }
        Ok(())
    }
}

impl Contract for OptimizationOutput {
    const ENTITY: &'static str = "optimizationOutput";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.case_id, || join(path, "caseId"))?;
        require_timestamp(&self.generated_at, path, "generatedAt")?;
        require_positive(self.top_k, path, "topK")?;
        self.objective_weights
            .validate_at(&join(path, "objectiveWeights"))?;
        require_entries(&self.recommendations, path, "recommendations")?;

        if self.recommendations.len() > self.top_k as usize {
            return Err(ContractViolation::TooManyRecommendations {
                count: self.recommendations.len(),
                top_k: self.top_k,
            });
        }

        let mut combo_ids = BTreeSet::new();
        for recommendation in &self.recommendations {
            if !combo_ids.insert(recommendation.combo_id.as_str()) {
                return Err(ContractViolation::DuplicateCombo {
                    combo_id: recommendation.combo_id.clone(),
                });
            }
        }

        let mut by_rank: Vec<&Recommendation> = self.recommendations.iter().collect();
        by_rank.sort_by_key(|recommendation| recommendation.rank);
        let contiguous = by_rank
            .iter()
            .enumerate()
            .all(|(index, recommendation)| recommendation.rank as usize == index + 1);
        if !contiguous {
            return Err(ContractViolation::NonContiguousRanks);
        }

        for pair in by_rank.windows(2) {
            if pair[1].score.total_score > pair[0].score.total_score {
                return Err(ContractViolation::ScoreOrder {
                    rank: pair[1].rank,
                    previous: pair[0].rank,
                });
            }
        }

        Ok(())
    }
}

impl Contract for TraceLog {
    const ENTITY: &'static str = "traceLog";

    fn validate_at(&self, path: &str) -> Result<(), ContractViolation> {
        require_text(&self.trace_id, || join(path, "traceId"))?;
        require_text(&self.case_id, || join(path, "caseId"))?;
        require_text(&self.combo_id, || join(path, "comboId"))?;
        require_text(&self.detail, || join(path, "detail"))?;
        require_texts(&self.evidence, path, "evidence")?;
        if self.evidence.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ContractViolation::UnsortedEvidence {
                field: join(path, "evidence"),
            });
        }
        require_timestamp(&self.logged_at, path, "loggedAt")
    }
}
