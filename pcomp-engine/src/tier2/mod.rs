// Tier 2 - Fusion and Normalization
//
// Contract: fusion accepts every candidate of one description and outputs at
// most one trusted value per field; the normalizer maps values onto the
// canonical vocabulary.

pub mod fusion;
pub mod normalizer;

pub use fusion::{FusionConfig, FusionEngine};
pub use normalizer::{Normalizer, NormalizerConfig, VocabularyHit};
