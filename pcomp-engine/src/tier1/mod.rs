// Tier 1 - Independent Field Extractors and their collaborators
//
// 3 extractors: Model (sequence labeling), Pattern (regex), Generative (LLM)
// Collaborators: sequence labelers, embedders, canonical vocabulary index

use crate::types::{EngineResult, ExtractorKind, FieldCandidate};
use async_trait::async_trait;

pub mod embedder;
pub mod generative_extractor;
pub mod labeler;
pub mod model_extractor;
pub mod pattern_extractor;
pub mod sentence_embedder;
pub mod vocabulary_index;

pub use embedder::{load_embedder, Embedder, EmbeddingConfig, HashingEmbedder};
pub use generative_extractor::{GenerativeConfig, GenerativeExtractor};
pub use labeler::{load_labeler, BlankLabeler, LabeledSpan, RulerLabeler, SequenceLabeler};
pub use model_extractor::ModelExtractor;
pub use pattern_extractor::PatternExtractor;
pub use sentence_embedder::SentenceEmbedder;
pub use vocabulary_index::{VocabularyConfig, VocabularyIndex};

/// Extractor trait - all Tier 1 extractors implement this
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Provenance tag attached to every candidate this extractor emits
    fn kind(&self) -> ExtractorKind;

    /// Extract field candidates from a product description
    ///
    /// # Returns
    /// * `Ok(candidates)` - Possibly empty; no matches is not an error
    /// * `Err(_)` - Extraction failed (logged, treated as no candidates)
    async fn extract(&self, text: &str) -> EngineResult<Vec<FieldCandidate>>;

    /// Check if extractor is available (model loaded, API key configured, etc.)
    fn is_available(&self) -> bool {
        true // Default: assume available
    }

    /// Get confidence range of the candidates this extractor emits
    fn confidence_range(&self) -> (f64, f64) {
        (0.0, 1.0) // Default: full range
    }
}
