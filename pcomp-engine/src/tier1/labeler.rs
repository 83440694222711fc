// Sequence Labelers - models queried by the Model Extractor
//
// Loading follows a fallback chain: configured model files in order, then a
// blank labeler that never produces spans. "No model available" therefore
// means "empty extraction", never a failed comparison.

use crate::types::{EngineError, EngineResult};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Labeled span returned by a sequence-labeling model
///
/// Offsets are character (not byte) positions, `end_char` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSpan {
    pub start_char: usize,
    pub end_char: usize,
    pub label: String,
    pub text: String,
}

/// Sequence-labeling model contract
///
/// Must tolerate arbitrary UTF-8 input and return an empty list on no match.
pub trait SequenceLabeler: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    fn label(&self, text: &str) -> Vec<LabeledSpan>;
}

/// Label-free model: always returns no spans
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankLabeler;

impl SequenceLabeler for BlankLabeler {
    fn name(&self) -> &str {
        "blank"
    }

    fn label(&self, _text: &str) -> Vec<LabeledSpan> {
        Vec::new()
    }
}

// ============================================================================
// Entity ruler model
// ============================================================================

/// On-disk format of a ruler model
#[derive(Debug, Deserialize)]
struct RulerModelFile {
    name: String,
    patterns: Vec<RulerPatternFile>,
}

#[derive(Debug, Deserialize)]
struct RulerPatternFile {
    label: String,
    phrases: Vec<String>,
}

struct CompiledPhrase {
    label: String,
    regex: Regex,
}

/// Phrase-pattern entity ruler loaded from a JSON model file
///
/// Phrases match case-insensitively with flexible whitespace between
/// tokens, so `"Fe 500D"` also labels `"Fe500D"`. Overlapping matches are
/// resolved with [`filter_overlapping_spans`].
pub struct RulerLabeler {
    name: String,
    phrases: Vec<CompiledPhrase>,
}

impl RulerLabeler {
    /// Load a ruler model from a JSON file
    ///
    /// # Errors
    /// `ModelUnavailable` if the file is missing, unreadable, malformed or
    /// contains no usable phrase.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let unavailable = |reason: String| EngineError::ModelUnavailable {
            model: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let model: RulerModelFile =
            serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))?;

        let mut phrases = Vec::new();
        for pattern in &model.patterns {
            for phrase in &pattern.phrases {
                let Some(regex) = compile_phrase(phrase) else {
                    continue;
                };
                phrases.push(CompiledPhrase {
                    label: pattern.label.clone(),
                    regex,
                });
            }
        }

        if phrases.is_empty() {
            return Err(unavailable("model contains no phrases".to_string()));
        }

        Ok(Self {
            name: model.name,
            phrases,
        })
    }
}

/// Build a case-insensitive, whitespace-flexible regex for one phrase
///
/// Word boundaries are only asserted next to word characters so phrases
/// such as `"I.S."` still match.
fn compile_phrase(phrase: &str) -> Option<Regex> {
    let tokens: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if tokens.is_empty() {
        return None;
    }

    let is_word = |c: Option<char>| c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false);
    let trimmed = phrase.trim();
    let lead = if is_word(trimmed.chars().next()) { r"\b" } else { "" };
    let trail = if is_word(trimmed.chars().last()) { r"\b" } else { "" };

    let pattern = format!("{}{}{}", lead, tokens.join(r"\s*"), trail);
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Skipping ruler phrase '{}': {}", phrase, e);
            None
        }
    }
}

impl SequenceLabeler for RulerLabeler {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self, text: &str) -> Vec<LabeledSpan> {
        let mut spans = Vec::new();
        for phrase in &self.phrases {
            for m in phrase.regex.find_iter(text) {
                let start_char = text[..m.start()].chars().count();
                spans.push(LabeledSpan {
                    start_char,
                    end_char: start_char + m.as_str().chars().count(),
                    label: phrase.label.clone(),
                    text: m.as_str().to_string(),
                });
            }
        }
        filter_overlapping_spans(spans)
    }
}

/// Resolve overlapping spans by keeping the longest, earliest-starting span
///
/// Spans are visited by start position, longest first; a span overlapping
/// any already kept span is dropped. Output is ordered by start position.
pub fn filter_overlapping_spans(mut spans: Vec<LabeledSpan>) -> Vec<LabeledSpan> {
    spans.sort_by(|a, b| {
        a.start_char
            .cmp(&b.start_char)
            .then_with(|| (b.end_char - b.start_char).cmp(&(a.end_char - a.start_char)))
    });

    let mut kept: Vec<LabeledSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let overlaps = kept
            .iter()
            .any(|k| span.start_char < k.end_char && span.end_char > k.start_char);
        if !overlaps {
            kept.push(span);
        }
    }
    kept
}

/// Load the first available model from `paths`, falling back to blank
pub fn load_labeler(paths: &[PathBuf]) -> Arc<dyn SequenceLabeler> {
    for path in paths {
        match RulerLabeler::from_file(path) {
            Ok(labeler) => {
                info!(
                    "Sequence-labeling model '{}' loaded from {}",
                    labeler.name(),
                    path.display()
                );
                return Arc::new(labeler);
            }
            Err(e) => warn!("{}, trying alternatives...", e),
        }
    }

    warn!("No sequence-labeling model found. Using blank model");
    Arc::new(BlankLabeler)
}
