// Tier 2: Normalizer
//
// Routes values of normalizable fields (Grade, Standard) through the
// canonical vocabulary index.
//
// Three uses:
// 1. Extraction fallback: when the model produced no span for a normalizable
//    field, search 1..=max_window_tokens token windows of the raw text for a
//    near-exact vocabulary entry and emit it as one Vocabulary candidate
// 2. Corroboration: a fallback candidate reaches corroborated_confidence only
//    when another extractor proposed a value with the same canonical form
// 3. Pre-comparison canonicalization of fused values (no hit → keep value)
//
// A hit is accepted iff its distance is below the field's effective radius:
// the configured radius, capped at half the field's minimum entry separation.

use crate::tier1::embedder::Embedder;
use crate::tier1::vocabulary_index::VocabularyIndex;
use crate::types::{EngineResult, ExtractorKind, FieldCandidate, FieldName, FusedFields};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Accept nearest neighbor iff squared L2 distance < radius
    pub acceptance_radius: f32,
    /// Tighter radius for hits found in raw text by the extraction fallback
    pub fallback_radius: f32,
    /// Canonicalize fused values before comparison
    pub normalize_before_compare: bool,
    /// Confidence of uncorroborated fallback candidates
    pub fallback_confidence: f64,
    /// Confidence of fallback candidates another extractor agrees with
    pub corroborated_confidence: f64,
    /// Longest token window tried by the extraction fallback
    pub max_window_tokens: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            acceptance_radius: 0.2,
            fallback_radius: 0.05,
            normalize_before_compare: true,
            fallback_confidence: 0.6,
            corroborated_confidence: 0.75,
            max_window_tokens: 3,
        }
    }
}

/// Accepted nearest vocabulary entry
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyHit {
    pub canonical_value: String,
    pub distance: f32,
}

pub struct Normalizer {
    index: Arc<VocabularyIndex>,
    embedder: Arc<dyn Embedder>,
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(
        index: Arc<VocabularyIndex>,
        embedder: Arc<dyn Embedder>,
        config: NormalizerConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Radius actually applied to lookups for `field`
    pub fn acceptance_radius(&self, field: FieldName) -> f32 {
        match self.index.min_separation(field) {
            Some(separation) => self.config.acceptance_radius.min(separation / 2.0),
            None => self.config.acceptance_radius,
        }
    }

    /// Nearest accepted vocabulary entry for `value`
    ///
    /// `Ok(None)` for non-normalizable fields, blank values, or when the
    /// nearest entry lies outside the acceptance radius.
    pub fn lookup(&self, field: FieldName, value: &str) -> EngineResult<Option<VocabularyHit>> {
        self.lookup_within(field, value, self.acceptance_radius(field))
    }

    fn lookup_within(
        &self,
        field: FieldName,
        value: &str,
        radius: f32,
    ) -> EngineResult<Option<VocabularyHit>> {
        let value = value.trim();
        if !field.is_normalizable() || value.is_empty() {
            return Ok(None);
        }

        let query = self.embedder.embed(value)?;
        let Some(neighbor) = self.index.nearest(field, &query) else {
            return Ok(None);
        };

        if neighbor.distance < radius {
            Ok(Some(VocabularyHit {
                canonical_value: neighbor.canonical_value.to_string(),
                distance: neighbor.distance,
            }))
        } else {
            debug!(
                "  {}: '{}' nearest '{}' rejected (distance: {:.3} >= {:.3})",
                field, value, neighbor.canonical_value, neighbor.distance, radius
            );
            Ok(None)
        }
    }

    /// Canonical form of `value`, or None without an accepted neighbor
    ///
    /// Embedding failures are logged and treated as no neighbor.
    pub fn normalize(&self, field: FieldName, value: &str) -> Option<String> {
        match self.lookup(field, value) {
            Ok(hit) => hit.map(|h| h.canonical_value),
            Err(e) => {
                warn!("Normalization of {} '{}' failed: {}", field, value, e);
                None
            }
        }
    }

    /// Search token windows of `text` for a near-exact vocabulary entry
    ///
    /// Tokens are whitespace-separated with surrounding punctuation removed.
    /// Windows are held to `fallback_radius` (never looser than the field's
    /// acceptance radius); the closest accepted window wins, earliest on ties.
    /// The candidate carries `fallback_confidence` until [`Self::corroborate`]
    /// finds agreement.
    pub fn extraction_fallback(&self, field: FieldName, text: &str) -> Option<FieldCandidate> {
        if !field.is_normalizable() {
            return None;
        }

        let radius = self.config.fallback_radius.min(self.acceptance_radius(field));
        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .collect();

        let mut best: Option<VocabularyHit> = None;
        for width in 1..=self.config.max_window_tokens.max(1) {
            for window in tokens.windows(width) {
                let phrase = window.join(" ");
                let hit = match self.lookup_within(field, &phrase, radius) {
                    Ok(Some(hit)) => hit,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Vocabulary fallback for {} aborted: {}", field, e);
                        return None;
                    }
                };

                if best.as_ref().map_or(true, |b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }

        let hit = best?;
        debug!(
            "  {}: vocabulary fallback '{}' (distance: {:.3})",
            field, hit.canonical_value, hit.distance
        );
        Some(FieldCandidate::new(
            field,
            hit.canonical_value,
            self.config.fallback_confidence,
            ExtractorKind::Vocabulary,
        ))
    }

    /// Raise fallback candidates that another extractor agrees with
    ///
    /// A Vocabulary candidate is corroborated when a candidate from any other
    /// source, for the same field, normalizes to the same canonical value.
    pub fn corroborate(&self, candidates: &mut [FieldCandidate]) {
        let corroborated: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.source == ExtractorKind::Vocabulary)
            .filter(|(_, fallback)| {
                candidates.iter().any(|other| {
                    other.source != ExtractorKind::Vocabulary
                        && other.field == fallback.field
                        && self.normalize(other.field, &other.value).as_deref()
                            == Some(fallback.value.as_str())
                })
            })
            .map(|(i, _)| i)
            .collect();

        for i in corroborated {
            let candidate = &mut candidates[i];
            if candidate.confidence < self.config.corroborated_confidence {
                debug!(
                    "  {}: vocabulary fallback '{}' corroborated ({:.2} → {:.2})",
                    candidate.field,
                    candidate.value,
                    candidate.confidence,
                    self.config.corroborated_confidence
                );
                candidate.confidence = self.config.corroborated_confidence;
            }
        }
    }

    /// Replace present normalizable values with their canonical form
    pub fn canonicalize(&self, fused: &mut FusedFields) {
        for fused_field in fused.values_mut() {
            let Some(value) = fused_field.value.as_deref() else {
                continue;
            };
            if !fused_field.field.is_normalizable() {
                continue;
            }

            match self.normalize(fused_field.field, value) {
                Some(canonical) if canonical != value => {
                    debug!("  {}: '{}' → '{}'", fused_field.field, value, canonical);
                    fused_field.value = Some(canonical);
                }
                Some(_) => {}
                None => debug!(
                    "  {}: '{}' has no canonical form, kept as-is",
                    fused_field.field, value
                ),
            }
        }
    }
}
