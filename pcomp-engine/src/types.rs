// Shared Types and Data Contracts
//
// Explicit contracts between the three tiers of the comparison pipeline:
// Tier 1 extractors emit `FieldCandidate`s, Tier 2 reduces them to
// `FusedField`s, Tier 3 turns two fused sets into a `ComparisonReport`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Field Names
// ============================================================================

/// Structured attribute extracted from a product description
///
/// Closed set: extractors map their native labels onto these variants and
/// drop anything that does not map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    Material,
    Grade,
    Diameter,
    Length,
    Form,
    Standard,
}

/// Sequence-labeling model labels → canonical field (case-insensitive)
const MODEL_LABELS: &[(&str, FieldName)] = &[
    ("material", FieldName::Material),
    ("material_type", FieldName::Material),
    ("product", FieldName::Material),
    ("grade", FieldName::Grade),
    ("diameter", FieldName::Diameter),
    ("dia", FieldName::Diameter),
    ("size", FieldName::Diameter),
    ("length", FieldName::Length),
    ("form", FieldName::Form),
    ("packaging", FieldName::Form),
    ("standard", FieldName::Standard),
    ("spec", FieldName::Standard),
];

/// Generative service JSON keys → canonical field (case-insensitive)
const GENERATIVE_KEYS: &[(&str, FieldName)] = &[
    ("material", FieldName::Material),
    ("grade", FieldName::Grade),
    ("diameter", FieldName::Diameter),
    ("length", FieldName::Length),
    ("form", FieldName::Form),
    ("standard", FieldName::Standard),
];

impl FieldName {
    /// All fields in report order
    pub const ALL: [FieldName; 6] = [
        FieldName::Material,
        FieldName::Grade,
        FieldName::Diameter,
        FieldName::Length,
        FieldName::Form,
        FieldName::Standard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Material => "Material",
            Self::Grade => "Grade",
            Self::Diameter => "Diameter",
            Self::Length => "Length",
            Self::Form => "Form",
            Self::Standard => "Standard",
        }
    }

    /// Fields with a canonical vocabulary
    pub fn is_normalizable(self) -> bool {
        matches!(self, Self::Grade | Self::Standard)
    }

    /// Map a sequence-labeling model label onto a field
    pub fn from_model_label(label: &str) -> Option<Self> {
        let label = label.trim();
        MODEL_LABELS
            .iter()
            .find(|(native, _)| native.eq_ignore_ascii_case(label))
            .map(|(_, field)| *field)
    }

    /// Map a generative service key onto a field
    ///
    /// Unit annotations are ignored, so `"Diameter (in mm)"` maps to Diameter.
    pub fn from_generative_key(key: &str) -> Option<Self> {
        let key = key.split('(').next().unwrap_or(key).trim();
        GENERATIVE_KEYS
            .iter()
            .find(|(native, _)| native.eq_ignore_ascii_case(key))
            .map(|(_, field)| *field)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// Tier 1 Outputs: Field Candidates
// ============================================================================

/// Which extractor produced a candidate (for provenance tracking)
///
/// Candidates are generated in this order, which is also the fusion
/// tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractorKind {
    Model,      // confidence: 0.5-0.9 (span length + position)
    Vocabulary, // confidence: configured (normalizer fallback)
    Pattern,    // confidence: 0.5-0.8 (match length)
    Generative, // confidence: 0.6 (fixed, below default threshold)
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractorKind::Model => "Model",
            ExtractorKind::Vocabulary => "Vocabulary",
            ExtractorKind::Pattern => "Pattern",
            ExtractorKind::Generative => "Generative",
        };
        f.pad(name)
    }
}

/// Proposed value for one field from one extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub field: FieldName,
    pub value: String,
    pub confidence: f64, // [0.0, 1.0]
    pub source: ExtractorKind,
}

impl FieldCandidate {
    /// Create new candidate with clamped confidence (0.0-1.0)
    pub fn new(
        field: FieldName,
        value: impl Into<String>,
        confidence: f64,
        source: ExtractorKind,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }
}

// ============================================================================
// Tier 2 Outputs: Fused Fields
// ============================================================================

/// Winning value for one field after fusion
///
/// `value` is present iff at least one candidate existed and the winner
/// cleared the fusion threshold. `confidence` is the winner's confidence
/// either way (0.0 when no candidate existed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedField {
    pub field: FieldName,
    pub value: Option<String>,
    pub confidence: f64,
    pub source: Option<ExtractorKind>,
}

impl FusedField {
    pub fn absent(field: FieldName) -> Self {
        Self {
            field,
            value: None,
            confidence: 0.0,
            source: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// Fused fields of one description, keyed by field
pub type FusedFields = BTreeMap<FieldName, FusedField>;

/// Present values of a fused set ("extraction details")
pub fn present_values(fused: &FusedFields) -> BTreeMap<FieldName, String> {
    fused
        .values()
        .filter_map(|f| f.value.clone().map(|v| (f.field, v)))
        .collect()
}

// ============================================================================
// Tier 3 Outputs: Comparison
// ============================================================================

/// Per-field comparison verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    NotMentioned,
    ExactMatch,
    FuzzyMatch,
    SemanticMatch,
    Mismatch,
}

impl MatchStatus {
    /// Exact, fuzzy and semantic matches count as agreement
    pub fn is_match(self) -> bool {
        matches!(
            self,
            MatchStatus::ExactMatch | MatchStatus::FuzzyMatch | MatchStatus::SemanticMatch
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStatus::NotMentioned => "Not Mentioned",
            MatchStatus::ExactMatch => "Exact Match",
            MatchStatus::FuzzyMatch => "Fuzzy Match",
            MatchStatus::SemanticMatch => "Semantic Match",
            MatchStatus::Mismatch => "Mismatch",
        };
        f.pad(label)
    }
}

/// One field of a comparison report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub field: FieldName,
    pub value1: Option<String>,
    pub value2: Option<String>,
    pub status: MatchStatus,
    pub confidence: f64, // [0.0, 1.0]
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Sequence-labeling model could not be loaded (recovered by fallback chain)
    #[error("Model unavailable ({model}): {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// Generative service failure (recovered by empty extraction)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Span offsets out of bounds or inverted (dropped during extraction)
    #[error("Malformed span [{start}, {end}) for text of {len} chars")]
    MalformedSpan { start: usize, end: usize, len: usize },

    /// Embedding model failure
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] pcomp_common::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
