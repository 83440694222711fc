// Product Comparator
//
// Coordinates extraction → fusion → normalization → comparison for a pair of
// product descriptions.
//
// Workflow (per description):
// 1. Tier 1: extractors in order (Model, Pattern, Generative); the vocabulary
//    fallback runs right after the Model extractors, and its candidates only
//    clear the fusion threshold when another extractor corroborates them
// 2. Tier 2: confidence-threshold fusion, then optional canonicalization
//
// Then per field:
// 3. Tier 3: layered comparison, aggregated into a ComparisonReport
//
// Extractor failures are isolated: a failing extractor contributes no
// candidates and the comparison still completes.

use crate::config::EngineConfig;
use crate::tier1::{
    load_embedder, load_labeler, Embedder, FieldExtractor, GenerativeExtractor, HashingEmbedder,
    ModelExtractor, PatternExtractor, VocabularyIndex,
};
use crate::tier2::{FusionEngine, Normalizer};
use crate::tier3::{ComparisonReport, FieldComparator};
use crate::types::{EngineResult, ExtractorKind, FieldCandidate, FieldName, FusedFields};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Product comparison engine
///
/// Holds only read-only state after construction, so one instance can serve
/// concurrent comparisons.
pub struct ProductComparator {
    // Tier 1 extractors, in generation order
    extractors: Vec<Box<dyn FieldExtractor>>,

    // Tier 2
    normalizer: Normalizer,
    fusion: FusionEngine,

    // Tier 3
    field_comparator: FieldComparator,
}

impl ProductComparator {
    /// Assemble a comparator from ready-made parts
    ///
    /// Model extractors should come first in `extractors`; the vocabulary
    /// fallback is inserted after them.
    pub fn new(
        extractors: Vec<Box<dyn FieldExtractor>>,
        normalizer: Normalizer,
        fusion: FusionEngine,
        field_comparator: FieldComparator,
    ) -> Self {
        for extractor in &extractors {
            let (_, ceiling) = extractor.confidence_range();
            if ceiling < fusion.threshold() {
                info!(
                    "{} extractor cannot reach the fusion threshold ({:.2} < {:.2}); \
                     its candidates alone never produce a value",
                    extractor.kind(),
                    ceiling,
                    fusion.threshold()
                );
            }
        }

        Self {
            extractors,
            normalizer,
            fusion,
            field_comparator,
        }
    }

    /// Build the full pipeline from configuration
    ///
    /// # Errors
    /// Invalid configuration, or an embedding failure while indexing the
    /// vocabulary. A missing sequence-labeling model, sentence embedding
    /// model or API key is not an error: the pipeline degrades to the
    /// remaining extractors and the hashing embedder.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        // Canonical forms are matched lexically; the loaded model serves
        // only the semantic comparison layer
        let lexical: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(config.embedding.dimension)?);
        let index = Arc::new(VocabularyIndex::build(lexical.as_ref(), &config.vocabulary)?);
        info!(
            "Vocabulary index ready ({} dimensions, embedder '{}')",
            index.dimension(),
            lexical.name()
        );
        let semantic = load_embedder(&config.embedding)?;

        let labeler = load_labeler(&config.model.paths);
        let mut extractors: Vec<Box<dyn FieldExtractor>> = vec![
            Box::new(ModelExtractor::new(labeler)),
            Box::new(PatternExtractor::new()),
        ];

        if config.generative.enabled {
            let generative = GenerativeExtractor::new(config.generative.clone())?;
            if !generative.is_available() {
                warn!(
                    "Generative extractor unavailable: {} not set and no api_key in config",
                    config.generative.api_key_env
                );
            }
            extractors.push(Box::new(generative));
        } else {
            info!("Generative extractor disabled by configuration");
        }

        let normalizer = Normalizer::new(index, lexical, config.normalizer.clone());
        let fusion = FusionEngine::new(config.fusion.clone());
        let field_comparator = FieldComparator::new(config.comparison.clone(), semantic);

        Ok(Self::new(extractors, normalizer, fusion, field_comparator))
    }

    /// Collect candidates from every available extractor, in generation order
    pub async fn extract_candidates(&self, text: &str) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        let mut fallback_pending = true;

        for extractor in &self.extractors {
            let kind = extractor.kind();
            if fallback_pending && kind != ExtractorKind::Model {
                candidates.extend(self.vocabulary_fallback(text, &candidates));
                fallback_pending = false;
            }

            if !extractor.is_available() {
                debug!("Skipping {} extractor (unavailable)", kind);
                continue;
            }

            match extractor.extract(text).await {
                Ok(found) => {
                    debug!("{} extractor: {} candidates", kind, found.len());
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!("{} extractor failed: {}. Continuing without it", kind, e);
                }
            }
        }

        if fallback_pending {
            candidates.extend(self.vocabulary_fallback(text, &candidates));
        }

        self.normalizer.corroborate(&mut candidates);
        candidates
    }

    /// Vocabulary candidates for normalizable fields the model missed
    fn vocabulary_fallback(&self, text: &str, model_candidates: &[FieldCandidate]) -> Vec<FieldCandidate> {
        FieldName::ALL
            .into_iter()
            .filter(|field| field.is_normalizable())
            .filter(|field| {
                !model_candidates
                    .iter()
                    .any(|c| c.field == *field && c.source == ExtractorKind::Model)
            })
            .filter_map(|field| self.normalizer.extraction_fallback(field, text))
            .collect()
    }

    /// Extract and fuse the fields of one description
    pub async fn analyze(&self, text: &str) -> FusedFields {
        let candidates = self.extract_candidates(text).await;
        debug!("Fusing {} candidates", candidates.len());

        let mut fused = self.fusion.fuse(candidates);
        if self.normalizer.config().normalize_before_compare {
            self.normalizer.canonicalize(&mut fused);
        }
        fused
    }

    /// Compare two product descriptions field by field
    ///
    /// Never fails: extractor errors degrade to fewer candidates.
    pub async fn compare_products(&self, text1: &str, text2: &str) -> ComparisonReport {
        let fused1 = self.analyze(text1).await;
        let fused2 = self.analyze(text2).await;

        let rows = FieldName::ALL
            .into_iter()
            .map(|field| self.field_comparator.compare_field(field, &fused1, &fused2))
            .collect();

        let report = ComparisonReport::new(text1, text2, &fused1, &fused2, rows);
        info!(
            "Comparison {} complete: {}/{} fields match, overall similarity {:.1}%",
            report.id,
            report.matching_fields,
            report.total_fields,
            report.overall_similarity * 100.0
        );
        report
    }
}
