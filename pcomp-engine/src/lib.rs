//! pcomp-engine library interface
//!
//! Extraction-Fusion-Comparison engine for free-text product descriptions.
//! Each description passes through three tiers:
//! - Tier 1: independent field extractors (model, pattern, generative)
//! - Tier 2: confidence-threshold fusion and vocabulary normalization
//! - Tier 3: layered field comparison and report aggregation

pub mod comparator;
pub mod config;
pub mod tier1; // Extractors, labelers, embedder, vocabulary index
pub mod tier2; // Fusion, normalizer
pub mod tier3; // Field comparator, report
pub mod types;

pub use crate::comparator::ProductComparator;
pub use crate::config::EngineConfig;
pub use crate::tier3::ComparisonReport;
pub use crate::types::{
    ComparisonRow, EngineError, EngineResult, ExtractorKind, FieldCandidate, FieldName,
    FusedField, FusedFields, MatchStatus,
};
