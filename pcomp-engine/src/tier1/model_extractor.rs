// Model Extractor - sequence-labeling spans as field candidates
//
// Confidence: min(0.9, 0.5 + span_len/20 + start/text_len * 0.3)
// A deterministic proxy, not a learned probability: longer and later spans
// score higher.

use crate::tier1::labeler::{LabeledSpan, SequenceLabeler};
use crate::tier1::FieldExtractor;
use crate::types::{EngineError, EngineResult, ExtractorKind, FieldCandidate, FieldName};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

const MAX_MODEL_CONFIDENCE: f64 = 0.9;

pub struct ModelExtractor {
    labeler: Arc<dyn SequenceLabeler>,
}

impl ModelExtractor {
    pub fn new(labeler: Arc<dyn SequenceLabeler>) -> Self {
        Self { labeler }
    }

    /// Name of the underlying sequence-labeling model
    pub fn model_name(&self) -> &str {
        self.labeler.name()
    }

    /// Convert labeled spans into candidates (pure; no model call)
    pub fn candidates_from_spans(text: &str, spans: &[LabeledSpan]) -> Vec<FieldCandidate> {
        let text_len = text.chars().count();
        let mut candidates = Vec::with_capacity(spans.len());

        for span in spans {
            if let Err(e) = validate_span(span, text_len) {
                trace!("Dropping span '{}' ({}): {}", span.text, span.label, e);
                continue;
            }

            let Some(field) = FieldName::from_model_label(&span.label) else {
                debug!("Ignoring unknown model label '{}'", span.label);
                continue;
            };

            let value = span.text.trim();
            if value.is_empty() {
                trace!("Dropping empty span for label '{}'", span.label);
                continue;
            }

            let confidence = span_confidence(span, text_len);
            candidates.push(FieldCandidate::new(field, value, confidence, ExtractorKind::Model));
        }

        candidates
    }
}

/// Reject spans with inverted or out-of-bounds offsets
fn validate_span(span: &LabeledSpan, text_len: usize) -> EngineResult<()> {
    if span.start_char >= span.end_char || span.end_char > text_len {
        return Err(EngineError::MalformedSpan {
            start: span.start_char,
            end: span.end_char,
            len: text_len,
        });
    }
    Ok(())
}

/// Confidence proxy from span length and relative start position
///
/// Assumes `span` passed [`validate_span`], so `text_len > 0`.
fn span_confidence(span: &LabeledSpan, text_len: usize) -> f64 {
    let span_len = span.text.chars().count() as f64;
    let position = span.start_char as f64 / text_len as f64;
    (0.5 + span_len / 20.0 + position * 0.3).min(MAX_MODEL_CONFIDENCE)
}

#[async_trait]
impl FieldExtractor for ModelExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Model
    }

    async fn extract(&self, text: &str) -> EngineResult<Vec<FieldCandidate>> {
        let spans = self.labeler.label(text);
        let candidates = Self::candidates_from_spans(text, &spans);
        debug!(
            "Model '{}' produced {} spans, {} candidates",
            self.labeler.name(),
            spans.len(),
            candidates.len()
        );
        Ok(candidates)
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.5, MAX_MODEL_CONFIDENCE)
    }
}
