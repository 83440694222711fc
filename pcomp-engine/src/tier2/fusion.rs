// Tier 2: Fusion Engine
//
// Concept: Reduce candidates to one trusted value per field
// Synchronization: Accepts Vec<FieldCandidate> (generation order), outputs FusedFields
//
// Algorithm:
// 1. Group candidates by field, preserving generation order
// 2. Stable sort each group by confidence (highest first); ties keep
//    extractor order Model → Vocabulary → Pattern → Generative
// 3. The first candidate wins; below the threshold the field is absent

use crate::types::{FieldCandidate, FieldName, FusedField, FusedFields};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Minimum winner confidence for a field to be present (all fields)
    pub confidence_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
        }
    }
}

/// Fusion engine (Tier 2 fusion concept)
///
/// Pure: no side effects besides logging. Callers downstream never see a
/// value below the threshold; a field either clears the bar or is absent.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.confidence_threshold
    }

    /// Fuse candidates from all extractors of one description
    ///
    /// The result holds an entry for every field that had at least one
    /// candidate; fields without candidates are omitted.
    pub fn fuse(&self, candidates: Vec<FieldCandidate>) -> FusedFields {
        let mut groups: BTreeMap<FieldName, Vec<FieldCandidate>> = BTreeMap::new();
        for candidate in candidates {
            groups.entry(candidate.field).or_default().push(candidate);
        }

        groups
            .into_iter()
            .filter_map(|(field, group)| self.select_best(field, group).map(|f| (field, f)))
            .collect()
    }

    /// Select the winning candidate of one field
    fn select_best(&self, field: FieldName, mut group: Vec<FieldCandidate>) -> Option<FusedField> {
        // Stable: equal confidences keep generation order
        group.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal) // Treat NaN as equal
        });

        let best = group.into_iter().next()?;

        if best.confidence >= self.config.confidence_threshold {
            debug!(
                "  {}: {} (confidence: {:.2}, method: {})",
                field, best.value, best.confidence, best.source
            );
            Some(FusedField {
                field,
                value: Some(best.value),
                confidence: best.confidence,
                source: Some(best.source),
            })
        } else {
            debug!(
                "  {}: Skipped (confidence: {:.2} < {})",
                field, best.confidence, self.config.confidence_threshold
            );
            Some(FusedField {
                field,
                value: None,
                confidence: best.confidence,
                source: Some(best.source),
            })
        }
    }
}
