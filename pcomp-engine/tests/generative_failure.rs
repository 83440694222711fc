// Generative extractor degradation tests
//
// The generative service is an optional fallback: an unreachable endpoint or
// a missing API key must never fail a comparison, only remove its candidates
// and leave a trace in the logs.

mod helpers;

use helpers::{capture_logs, offline_config, ruler_model_path};
use pcomp_engine::tier1::{FieldExtractor, GenerativeConfig, GenerativeExtractor};
use pcomp_engine::{EngineError, FieldName, MatchStatus, ProductComparator};
use tracing::Level;

const UNSET_KEY_ENV: &str = "PCOMP_TEST_UNSET_GENERATIVE_KEY";

fn unreachable_generative() -> GenerativeConfig {
    GenerativeConfig {
        enabled: true,
        endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        timeout_secs: 2,
        api_key_env: UNSET_KEY_ENV.to_string(),
        api_key: Some("test-key".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_returns_error() {
    let extractor = GenerativeExtractor::new(unreachable_generative()).unwrap();
    assert!(extractor.is_available());

    let result = extractor.extract("TMT Fe500D 12mm").await;
    assert!(matches!(result, Err(EngineError::ExternalService(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_still_produces_full_report() {
    let (logs, _guard) = capture_logs();

    let mut config = offline_config(vec![ruler_model_path()]);
    config.generative = unreachable_generative();
    let comparator = ProductComparator::from_config(&config).unwrap();

    let report = comparator
        .compare_products(
            "TMT Fe500D 12mm 12000mm IS 1786 Loose",
            "TMT Fe500D 12mm 12000mm IS 1786 Bulk",
        )
        .await;

    assert_eq!(report.total_fields, 6);
    assert_eq!(report.matching_fields, 5);
    assert_eq!(
        report.row(FieldName::Form).map(|r| r.status),
        Some(MatchStatus::Mismatch)
    );
    logs.assert_contains_at(Level::WARN, "Generative extractor failed");
}

#[tokio::test]
async fn test_missing_key_skips_generative_extractor() {
    let (logs, _guard) = capture_logs();

    let mut config = offline_config(vec![]);
    config.generative = GenerativeConfig {
        api_key: None,
        ..unreachable_generative()
    };
    let comparator = ProductComparator::from_config(&config).unwrap();
    logs.assert_contains_at(Level::WARN, "Generative extractor unavailable");

    let report = comparator
        .compare_products("OPC 43 Grade Cement 50kg Bag", "OPC 53 Grade Cement 50kg Bag")
        .await;

    assert_eq!(report.rows.len(), 6);
    logs.assert_contains_at(Level::DEBUG, "Skipping Generative extractor");
}

#[tokio::test]
async fn test_generative_only_evidence_is_rejected() {
    // Fixed 0.6 never clears the default 0.7 fusion threshold
    let extractor = GenerativeExtractor::new(unreachable_generative()).unwrap();
    let (_, ceiling) = extractor.confidence_range();
    assert!(ceiling < config_threshold());
}

fn config_threshold() -> f64 {
    pcomp_engine::EngineConfig::default().fusion.confidence_threshold
}
