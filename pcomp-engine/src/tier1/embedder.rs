//! Text embedding for normalization and semantic comparison
//!
//! [`Embedder`] is the seam for any embedding model. [`HashingEmbedder`] is
//! the bundled deterministic implementation; [`load_embedder`] prefers a
//! sentence-transformers model and falls back to it.

use crate::tier1::sentence_embedder::{SentenceEmbedder, DEFAULT_MODEL_ID};
use crate::types::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Default embedding dimension
pub const DEFAULT_DIMENSION: usize = 384;

/// Weight of a letter/digit run relative to a single trigram
const RUN_WEIGHT: f32 = 2.0;

/// Embedding model contract
///
/// Must be deterministic for identical input and return vectors of
/// [`Embedder::dimension`] length for the lifetime of the process.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;
}

/// Character-trigram + token-run feature hashing embedder
///
/// Features come from the lowercased alphanumeric characters with separators
/// removed, so `"Fe 500D"`, `"fe500d"` and `"FE-500D"` embed identically.
/// Trigrams over the compact form carry spelling similarity; each maximal
/// letter or digit run (`fe`, `500`, `d`) is hashed as a heavier feature, so
/// values differing in a numeral or suffix (`IS 1785`, `Class III`) stay far
/// apart. Output is L2-normalized (all-zero for text without alphanumerics).
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> EngineResult<Self> {
        if dimension == 0 {
            return Err(EngineError::Embedding(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn bucket<T: Hash>(&self, feature: T) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-trigram"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let compact: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        if !compact.is_empty() {
            // Trigrams over "#<compact>#"
            let mut padded = Vec::with_capacity(compact.len() + 2);
            padded.push('#');
            padded.extend_from_slice(&compact);
            padded.push('#');
            for window in padded.windows(3) {
                let pos = self.bucket(("t", window));
                vector[pos] += 1.0;
            }

            let mut start = 0;
            for end in 1..=compact.len() {
                if end == compact.len() || compact[end].is_numeric() != compact[start].is_numeric() {
                    let pos = self.bucket(("r", &compact[start..end]));
                    vector[pos] += RUN_WEIGHT;
                    start = end;
                }
            }
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }

        Ok(vector)
    }
}

/// Embedding backends for the semantic comparison layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Dimension of the hashing embedder
    pub dimension: usize,
    /// Local sentence-transformers model directory, tried first
    pub model_dir: Option<PathBuf>,
    /// Hugging Face model id, fetched when `allow_download` is set
    pub model_id: String,
    pub allow_download: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            model_dir: Some(PathBuf::from("models/paraphrase-MiniLM-L6-v2")),
            model_id: DEFAULT_MODEL_ID.to_string(),
            allow_download: false,
        }
    }
}

/// Load the first usable embedder: local model, Hub model, then hashing
///
/// # Errors
/// Only when the hashing fallback itself is misconfigured (zero dimension).
pub fn load_embedder(config: &EmbeddingConfig) -> EngineResult<Arc<dyn Embedder>> {
    if let Some(dir) = &config.model_dir {
        match SentenceEmbedder::from_dir(dir) {
            Ok(embedder) => return Ok(Arc::new(embedder)),
            Err(e) => warn!("{}, trying alternatives...", e),
        }
    }

    if config.allow_download {
        match SentenceEmbedder::from_hub(&config.model_id) {
            Ok(embedder) => return Ok(Arc::new(embedder)),
            Err(e) => warn!("{}, trying alternatives...", e),
        }
    }

    let embedder = HashingEmbedder::new(config.dimension)?;
    warn!(
        "No sentence embedding model available. Using {} embedder ({} dimensions)",
        embedder.name(),
        embedder.dimension()
    );
    Ok(Arc::new(embedder))
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Squared Euclidean distance; infinite for mismatched dimensions
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("IS 1786").unwrap();
        let b = embedder.embed("IS 1786").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_spacing_variants_are_close() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Fe 500D").unwrap();
        let b = embedder.embed("fe500d").unwrap();
        assert!(cosine_similarity(&a, &b) > 0.7);
    }

    #[test]
    fn test_different_grades_are_far() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("OPC 43").unwrap();
        let b = embedder.embed("OPC 53").unwrap();
        assert!(cosine_similarity(&a, &b) < 0.8);
    }

    #[test]
    fn test_numeral_changes_are_far() {
        let embedder = HashingEmbedder::default();
        for (a, b) in [("IS 1786", "IS 1785"), ("Class II", "class iii"), ("ASTM A615", "ASTM A36")] {
            let va = embedder.embed(a).unwrap();
            let vb = embedder.embed(b).unwrap();
            assert!(
                squared_l2(&va, &vb) > 0.3,
                "'{}' and '{}' should not be near-duplicates",
                a,
                b
            );
        }
    }

    #[test]
    fn test_separator_variants_embed_identically() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("IS 1786").unwrap();
        let b = embedder.embed("is-1786").unwrap();
        assert_eq!(squared_l2(&a, &b), 0.0);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        let v = embedder.embed(" - ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(HashingEmbedder::new(0), Err(EngineError::Embedding(_))));
    }

    #[test]
    fn test_load_embedder_falls_back_to_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            dimension: 64,
            model_dir: Some(dir.path().to_path_buf()),
            ..EmbeddingConfig::default()
        };

        let embedder = load_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hashing-trigram");
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn test_load_embedder_rejects_zero_dimension_fallback() {
        let config = EmbeddingConfig {
            dimension: 0,
            model_dir: None,
            ..EmbeddingConfig::default()
        };
        assert!(load_embedder(&config).is_err());
    }

    #[test]
    fn test_distance_helpers() {
        assert_eq!(squared_l2(&[1.0, 0.0], &[0.0, 1.0]), 2.0);
        assert_eq!(squared_l2(&[1.0], &[1.0, 0.0]), f32::INFINITY);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
