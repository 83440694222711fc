//! Engine configuration
//!
//! Every section is defaulted, so an empty (or missing) TOML file yields the
//! documented defaults. Resolution: explicit path → `PCOMP_CONFIG` →
//! `<config_dir>/pcomp/config.toml` → compiled defaults.

use crate::tier1::{EmbeddingConfig, GenerativeConfig, VocabularyConfig};
use crate::tier2::{FusionConfig, NormalizerConfig};
use crate::tier3::ComparisonThresholds;
use crate::types::EngineResult;
use pcomp_common::config::{load_toml_config, resolve_config_path};
use pcomp_common::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PCOMP_CONFIG";

/// Directory name under the per-user config dir
pub const APP_NAME: &str = "pcomp";

/// Sequence-labeling model files, tried in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub paths: Vec<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                PathBuf::from("models/product_ner.json"),
                PathBuf::from("models/product_ruler.json"),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fusion: FusionConfig,
    pub comparison: ComparisonThresholds,
    pub normalizer: NormalizerConfig,
    pub vocabulary: VocabularyConfig,
    pub model: ModelConfig,
    pub embedding: EmbeddingConfig,
    pub generative: GenerativeConfig,
}

impl EngineConfig {
    /// Resolve and load the config file, then validate it
    pub fn load(explicit: Option<&Path>) -> EngineResult<Self> {
        let path = resolve_config_path(explicit, CONFIG_ENV_VAR, APP_NAME);
        let config: Self = load_toml_config(path.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no pipeline stage can work with
    pub fn validate(&self) -> EngineResult<()> {
        check_unit_interval("fusion.confidence_threshold", self.fusion.confidence_threshold)?;
        check_unit_interval("comparison.fuzzy_threshold", self.comparison.fuzzy_threshold)?;
        check_unit_interval(
            "comparison.semantic_threshold",
            self.comparison.semantic_threshold,
        )?;
        check_unit_interval(
            "normalizer.fallback_confidence",
            self.normalizer.fallback_confidence,
        )?;
        check_unit_interval(
            "normalizer.corroborated_confidence",
            self.normalizer.corroborated_confidence,
        )?;
        check_positive("normalizer.acceptance_radius", self.normalizer.acceptance_radius)?;
        check_positive("normalizer.fallback_radius", self.normalizer.fallback_radius)?;
        if self.normalizer.max_window_tokens == 0 {
            return Err(invalid("normalizer.max_window_tokens must be at least 1".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension must be positive".to_string()));
        }
        if self.generative.timeout_secs == 0 {
            return Err(invalid("generative.timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> EngineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within [0.0, 1.0], got {}", name, value)))
    }
}

fn check_positive(name: &str, value: f32) -> EngineResult<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(invalid(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

fn invalid(message: String) -> crate::types::EngineError {
    Error::InvalidInput(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineError;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fusion.confidence_threshold, 0.7);
        assert_eq!(config.comparison.fuzzy_threshold, 0.85);
        assert_eq!(config.comparison.semantic_threshold, 0.8);
        assert_eq!(config.normalizer.acceptance_radius, 0.2);
        assert_eq!(config.normalizer.fallback_radius, 0.05);
        assert!(config.normalizer.fallback_confidence < config.fusion.confidence_threshold);
        assert!(config.normalizer.corroborated_confidence >= config.fusion.confidence_threshold);
        assert!(config.normalizer.normalize_before_compare);
        assert_eq!(config.embedding.dimension, 384);
        assert!(!config.embedding.allow_download);
        assert_eq!(config.model.paths.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [fusion]
            confidence_threshold = 0.6

            [generative]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.fusion.confidence_threshold, 0.6);
        assert!(!config.generative.enabled);
        assert_eq!(config.generative.timeout_secs, 10);
        assert_eq!(config.comparison.fuzzy_threshold, 0.85);
        assert_eq!(config.vocabulary.grades.len(), 10);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = EngineConfig::default();
        config.fusion.confidence_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Config(Error::InvalidInput(_)))
        ));

        let mut config = EngineConfig::default();
        config.normalizer.acceptance_radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.normalizer.fallback_radius = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.normalizer.corroborated_confidence = 1.2;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.embedding.dimension = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.generative.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
