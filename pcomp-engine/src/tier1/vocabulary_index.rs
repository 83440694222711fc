//! Canonical vocabulary index
//!
//! Exact (flat) nearest-neighbor search over embeddings of the canonical
//! values of each normalizable field, using squared Euclidean distance.
//! Built once at startup and read-only afterwards.
//!
//! The index also records, per field, the smallest distance between two
//! distinct entries. An acceptance radius below half of it keeps every query
//! from being accepted by two entries at once.

use crate::tier1::embedder::{squared_l2, Embedder};
use crate::types::{EngineError, EngineResult, FieldName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Canonical vocabularies for normalizable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub grades: Vec<String>,
    pub standards: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let owned = |values: &[&str]| -> Vec<String> { values.iter().map(|v| v.to_string()).collect() };
        Self {
            grades: owned(&[
                "Fe 500D", "Fe 500", "Fe 550", "Fe 415", "OPC 43", "OPC 53", "Type I", "Type V",
                "Class I", "Class II",
            ]),
            standards: owned(&[
                "IS 1786", "IS 456", "IS 10262", "IS 4031", "IS 12269", "IS 14268", "IS 8112",
                "IS 6003", "ASTM A706", "ASTM A615",
            ]),
        }
    }
}

impl VocabularyConfig {
    /// Vocabulary for a field (empty for non-normalizable fields)
    pub fn values(&self, field: FieldName) -> &[String] {
        match field {
            FieldName::Grade => &self.grades,
            FieldName::Standard => &self.standards,
            _ => &[],
        }
    }
}

/// Canonical value with its embedding
#[derive(Debug, Clone)]
pub struct VocabularyEntry {
    pub canonical_value: String,
    pub embedding: Vec<f32>,
}

/// Nearest vocabulary entry for a query
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a> {
    pub canonical_value: &'a str,
    pub distance: f32,
}

/// Per-field flat index
#[derive(Debug)]
pub struct VocabularyIndex {
    dimension: usize,
    entries: HashMap<FieldName, Vec<VocabularyEntry>>,
    separations: HashMap<FieldName, f32>,
}

impl VocabularyIndex {
    /// Embed every vocabulary entry of every normalizable field
    ///
    /// Blank entries are skipped; duplicates are kept once.
    ///
    /// # Errors
    /// `Embedding` if the embedder fails or returns a vector of the wrong
    /// dimension. This aborts initialization.
    pub fn build(embedder: &dyn Embedder, vocabulary: &VocabularyConfig) -> EngineResult<Self> {
        let dimension = embedder.dimension();
        let mut entries = HashMap::new();
        let mut separations = HashMap::new();

        for field in FieldName::ALL.into_iter().filter(|f| f.is_normalizable()) {
            let mut field_entries: Vec<VocabularyEntry> = Vec::new();
            for value in vocabulary.values(field) {
                let value = value.trim();
                if value.is_empty() || field_entries.iter().any(|e| e.canonical_value == value) {
                    continue;
                }

                let embedding = embedder.embed(value)?;
                if embedding.len() != dimension {
                    return Err(EngineError::Embedding(format!(
                        "embedder '{}' returned {} dimensions for '{}', expected {}",
                        embedder.name(),
                        embedding.len(),
                        value,
                        dimension
                    )));
                }

                field_entries.push(VocabularyEntry {
                    canonical_value: value.to_string(),
                    embedding,
                });
            }

            match min_separation(&field_entries) {
                Some(separation) => {
                    info!(
                        "Vocabulary index for {}: {} entries (min separation: {:.3})",
                        field,
                        field_entries.len(),
                        separation
                    );
                    separations.insert(field, separation);
                }
                None => info!("Vocabulary index for {}: {} entries", field, field_entries.len()),
            }
            entries.insert(field, field_entries);
        }

        Ok(Self {
            dimension,
            entries,
            separations,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self, field: FieldName) -> &[VocabularyEntry] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Smallest non-zero distance between two entries of `field`
    ///
    /// None with fewer than two distinguishable entries.
    pub fn min_separation(&self, field: FieldName) -> Option<f32> {
        self.separations.get(&field).copied()
    }

    /// Single nearest entry to `query` (first wins on ties)
    pub fn nearest(&self, field: FieldName, query: &[f32]) -> Option<Neighbor<'_>> {
        let mut best: Option<Neighbor<'_>> = None;
        for entry in self.entries(field) {
            let distance = squared_l2(&entry.embedding, query);
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(Neighbor {
                    canonical_value: &entry.canonical_value,
                    distance,
                });
            }
        }
        best
    }
}

fn min_separation(entries: &[VocabularyEntry]) -> Option<f32> {
    let mut min: Option<f32> = None;
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            let distance = squared_l2(&a.embedding, &b.embedding);
            // Entries that embed identically cannot be told apart by distance
            if distance > 0.0 && min.map_or(true, |m| distance < m) {
                min = Some(distance);
            }
        }
    }
    min
}
