use std::collections::{BTreeMap, BTreeSet};

use super::super::contracts::ContractViolation;
use super::super::domain::OptimizationInput;
use super::super::numeric::round_to;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemSignal {
    pub signal_id: String,
    pub score: f64,
}

/// Per-item efficacy lookup, built only when every candidate has exactly one signal.
#[derive(Debug, Clone)]
pub struct SignalIndex {
    by_item: BTreeMap<String, ItemSignal>,
}

impl SignalIndex {
    pub fn build(input: &OptimizationInput) -> Result<Self, ContractViolation> {
        let mut candidate_ids = BTreeSet::new();
        for candidate in &input.candidates {
            if !candidate_ids.insert(candidate.item_id.as_str()) {
                return Err(ContractViolation::DuplicateCandidate {
                    item_id: candidate.item_id.clone(),
                });
            }
        }

        let mut by_item = BTreeMap::new();
        for signal in &input.efficacy_signals {
            if !candidate_ids.contains(signal.item_id.as_str()) {
                return Err(ContractViolation::UnknownSignalItem {
                    item_id: signal.item_id.clone(),
                });
            }
            if by_item.contains_key(&signal.item_id) {
                return Err(ContractViolation::DuplicateSignal {
                    item_id: signal.item_id.clone(),
                });
            }
            by_item.insert(
                signal.item_id.clone(),
                ItemSignal {
                    signal_id: signal.signal_id.clone(),
                    score: round_to(signal.expected_benefit_score * signal.confidence_score, 6),
                },
            );
        }

        if let Some(missing) = candidate_ids
            .iter()
            .find(|item_id| !by_item.contains_key(**item_id))
        {
            return Err(ContractViolation::MissingSignal {
                item_id: missing.to_string(),
            });
        }

        Ok(Self { by_item })
    }

    pub(crate) fn get(&self, item_id: &str) -> Result<&ItemSignal, ContractViolation> {
        self.by_item
            .get(item_id)
            .ok_or_else(|| ContractViolation::MissingSignal {
                item_id: item_id.to_string(),
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.by_item.len()
    }
}
