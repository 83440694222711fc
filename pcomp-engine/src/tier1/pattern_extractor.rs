// Pattern Extractor - ordered regex tables per field
//
// Confidence: min(0.8, 0.4 + match_len/10)
// Every match of every pattern is a candidate; selection is left to fusion.

use crate::tier1::FieldExtractor;
use crate::types::{EngineResult, ExtractorKind, FieldCandidate, FieldName};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const MAX_PATTERN_CONFIDENCE: f64 = 0.8;

// Static pattern tables - compiled once, matched case-insensitively

static MATERIAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:pc|ht)\s+strands?\b").expect("valid regex"),
        Regex::new(r"(?i)\btmt(?:\s+bars?)?\b").expect("valid regex"),
        Regex::new(r"(?i)\b(?:portland\s+)?cement\b").expect("valid regex"),
        Regex::new(r"(?i)\bopc\b").expect("valid regex"),
        Regex::new(r"(?i)\b(?:steel|rebars?)\b").expect("valid regex"),
    ]
});

static GRADE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)fe[\s_]?500d?|\b43\b|\b53\b|\b415\b|\b550\b").expect("valid regex"),
        Regex::new(r"(?i)class\s+[iv]+").expect("valid regex"),
        Regex::new(r"(?i)opc\s+\d+").expect("valid regex"),
    ]
});

static DIAMETER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\d{1,3}\.?\d*\s?mm").expect("valid regex"),
        Regex::new(r"(?i)\d{1,3}\.?\d*\s?millimet(?:er|re)s?").expect("valid regex"),
    ]
});

static LENGTH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\d{4,5}\.?\d*\s?mm").expect("valid regex"),
        Regex::new(r"(?i)\d{4,5}\.?\d*\s?millimet(?:er|re)s?").expect("valid regex"),
    ]
});

static FORM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bstraight\s+bars?\b").expect("valid regex"),
        Regex::new(r"(?i)\b(?:loose|bulk|packed|bags?|coils?|bundles?)\b").expect("valid regex"),
    ]
});

static STANDARD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)is\s?\d{4}").expect("valid regex"),
        Regex::new(r"(?i)astm\s+[a-z]+\d+").expect("valid regex"),
        Regex::new(r"(?i)bs\s+\d+").expect("valid regex"),
    ]
});

/// Regex-based extractor; independent of any model
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Pattern table for a field, in match order
    fn patterns(field: FieldName) -> &'static [Regex] {
        match field {
            FieldName::Material => &MATERIAL_PATTERNS,
            FieldName::Grade => &GRADE_PATTERNS,
            FieldName::Diameter => &DIAMETER_PATTERNS,
            FieldName::Length => &LENGTH_PATTERNS,
            FieldName::Form => &FORM_PATTERNS,
            FieldName::Standard => &STANDARD_PATTERNS,
        }
    }

    /// Scan `text` with every pattern of every field (pure)
    pub fn scan(text: &str) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for field in FieldName::ALL {
            for pattern in Self::patterns(field) {
                for m in pattern.find_iter(text) {
                    let match_len = m.as_str().chars().count() as f64;
                    let confidence = (0.4 + match_len / 10.0).min(MAX_PATTERN_CONFIDENCE);
                    candidates.push(FieldCandidate::new(
                        field,
                        m.as_str(),
                        confidence,
                        ExtractorKind::Pattern,
                    ));
                }
            }
        }
        candidates
    }
}

#[async_trait]
impl FieldExtractor for PatternExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Pattern
    }

    async fn extract(&self, text: &str) -> EngineResult<Vec<FieldCandidate>> {
        let candidates = Self::scan(text);
        debug!("Patterns produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.5, MAX_PATTERN_CONFIDENCE)
    }
}
