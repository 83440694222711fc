// Tier 3: Field Comparator
//
// Concept: Classify agreement between two values of the same field
// Synchronization: Accepts two FusedFields sets (Tier 2), returns ComparisonRow
//
// Layers (first match wins):
// 1. both absent                              → NotMentioned, 1.0
// 2. equal after trim (case-sensitive)        → ExactMatch, 1.0
// 3. normalized Levenshtein (lowercase) > 0.85 → FuzzyMatch, ratio
// 4. embedding cosine > semantic_threshold    → SemanticMatch, similarity
// 5. otherwise                                → Mismatch, 0.0

use crate::tier1::embedder::{cosine_similarity, Embedder};
use crate::types::{ComparisonRow, FieldName, FusedFields, MatchStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Comparison thresholds (strict `>` for both)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonThresholds {
    pub fuzzy_threshold: f64,
    /// 0.8 default; 0.85 is the strict variant
    pub semantic_threshold: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            semantic_threshold: 0.8,
        }
    }
}

/// Field comparator (Tier 3 comparison concept)
///
/// Symmetric: swapping the two values never changes the status.
pub struct FieldComparator {
    thresholds: ComparisonThresholds,
    embedder: Arc<dyn Embedder>,
}

impl FieldComparator {
    pub fn new(thresholds: ComparisonThresholds, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            thresholds,
            embedder,
        }
    }

    /// Compare two optional values
    ///
    /// Blank values count as absent.
    pub fn compare(&self, value1: Option<&str>, value2: Option<&str>) -> (MatchStatus, f64) {
        let value1 = value1.map(str::trim).filter(|v| !v.is_empty());
        let value2 = value2.map(str::trim).filter(|v| !v.is_empty());

        let (v1, v2) = match (value1, value2) {
            (None, None) => return (MatchStatus::NotMentioned, 1.0),
            (Some(v1), Some(v2)) => (v1, v2),
            _ => return (MatchStatus::Mismatch, 0.0),
        };

        if v1 == v2 {
            return (MatchStatus::ExactMatch, 1.0);
        }

        let ratio = strsim::normalized_levenshtein(&v1.to_lowercase(), &v2.to_lowercase());
        if ratio > self.thresholds.fuzzy_threshold {
            return (MatchStatus::FuzzyMatch, ratio);
        }

        let similarity = self.semantic_similarity(v1, v2);
        if similarity > self.thresholds.semantic_threshold {
            return (MatchStatus::SemanticMatch, similarity);
        }

        (MatchStatus::Mismatch, 0.0)
    }

    /// Compare one field across two fused sets (missing entries are absent)
    pub fn compare_field(
        &self,
        field: FieldName,
        fused1: &FusedFields,
        fused2: &FusedFields,
    ) -> ComparisonRow {
        let value1 = fused1.get(&field).and_then(|f| f.value.clone());
        let value2 = fused2.get(&field).and_then(|f| f.value.clone());
        let (status, confidence) = self.compare(value1.as_deref(), value2.as_deref());

        ComparisonRow {
            field,
            value1,
            value2,
            status,
            confidence,
        }
    }

    /// Cosine similarity of embeddings, clamped to [0, 1]; 0.0 if embedding fails
    pub fn semantic_similarity(&self, value1: &str, value2: &str) -> f64 {
        let embeddings = self
            .embedder
            .embed(value1)
            .and_then(|a| self.embedder.embed(value2).map(|b| (a, b)));

        match embeddings {
            Ok((a, b)) => f64::from(cosine_similarity(&a, &b)).clamp(0.0, 1.0),
            Err(e) => {
                warn!(
                    "Semantic comparison of '{}' and '{}' failed: {}",
                    value1, value2, e
                );
                0.0
            }
        }
    }
}
