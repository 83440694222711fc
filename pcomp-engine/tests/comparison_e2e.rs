// End-to-end comparison tests
//
// Runs full descriptions through extraction, fusion, normalization and
// comparison, with and without the bundled ruler model. Offline: the
// generative extractor is disabled.

mod helpers;

use helpers::{offline_config, ruler_model_path};
use pcomp_engine::{ComparisonReport, FieldName, MatchStatus, ProductComparator};
use std::path::PathBuf;

const TMT_LOOSE: &str = "TMT Fe500D 12mm 12000mm IS 1786 Loose";
const TMT_BULK: &str = "TMT Fe500D 12mm 12000mm IS 1786 Bulk";
const OPC_43: &str = "OPC 43 Grade Cement 50kg Bag";
const OPC_53: &str = "OPC 53 Grade Cement 50kg Bag";

fn status(report: &ComparisonReport, field: FieldName) -> MatchStatus {
    report.row(field).map(|r| r.status).unwrap()
}

fn value(report: &ComparisonReport, field: FieldName) -> (Option<&str>, Option<&str>) {
    let row = report.row(field).unwrap();
    (row.value1.as_deref(), row.value2.as_deref())
}

fn comparator(model_paths: Vec<PathBuf>) -> ProductComparator {
    ProductComparator::from_config(&offline_config(model_paths)).unwrap()
}

fn assert_rebar_report(report: &ComparisonReport) {
    assert_eq!(report.total_fields, 6);
    assert_eq!(report.rows.len(), 6);
    let fields: Vec<FieldName> = report.rows.iter().map(|r| r.field).collect();
    assert_eq!(fields, FieldName::ALL.to_vec());

    for field in [
        FieldName::Material,
        FieldName::Grade,
        FieldName::Diameter,
        FieldName::Length,
        FieldName::Standard,
    ] {
        assert_eq!(status(report, field), MatchStatus::ExactMatch, "{}", field);
    }

    assert_eq!(value(report, FieldName::Material), (Some("TMT"), Some("TMT")));
    assert_eq!(value(report, FieldName::Grade), (Some("Fe 500D"), Some("Fe 500D")));
    assert_eq!(value(report, FieldName::Diameter), (Some("12mm"), Some("12mm")));
    assert_eq!(value(report, FieldName::Length), (Some("12000mm"), Some("12000mm")));
    assert_eq!(value(report, FieldName::Standard), (Some("IS 1786"), Some("IS 1786")));
    assert_eq!(value(report, FieldName::Form), (Some("Loose"), Some("Bulk")));
    assert_eq!(status(report, FieldName::Form), MatchStatus::Mismatch);

    assert_eq!(report.matching_fields, 5);
    assert!((report.overall_similarity - 5.0 / 6.0).abs() < 1e-9);
}

fn assert_cement_report(report: &ComparisonReport) {
    assert_eq!(value(report, FieldName::Grade), (Some("OPC 43"), Some("OPC 53")));
    assert_eq!(status(report, FieldName::Grade), MatchStatus::Mismatch);

    assert_eq!(value(report, FieldName::Material), (Some("Cement"), Some("Cement")));
    assert_eq!(status(report, FieldName::Material), MatchStatus::ExactMatch);
    assert_eq!(value(report, FieldName::Form), (Some("Bag"), Some("Bag")));
    assert_eq!(status(report, FieldName::Form), MatchStatus::ExactMatch);

    assert_eq!(status(report, FieldName::Diameter), MatchStatus::NotMentioned);
    assert_eq!(status(report, FieldName::Length), MatchStatus::NotMentioned);
}

#[tokio::test]
async fn test_rebar_loose_vs_bulk_without_model() {
    let report = comparator(vec![])
        .compare_products(TMT_LOOSE, TMT_BULK)
        .await;
    assert_rebar_report(&report);
}

#[tokio::test]
async fn test_rebar_loose_vs_bulk_with_ruler_model() {
    let report = comparator(vec![ruler_model_path()])
        .compare_products(TMT_LOOSE, TMT_BULK)
        .await;
    assert_rebar_report(&report);
}

#[tokio::test]
async fn test_cement_grades_without_model() {
    let report = comparator(vec![]).compare_products(OPC_43, OPC_53).await;
    assert_cement_report(&report);
}

#[tokio::test]
async fn test_cement_grades_with_ruler_model() {
    let report = comparator(vec![ruler_model_path()])
        .compare_products(OPC_43, OPC_53)
        .await;
    assert_cement_report(&report);
}

#[tokio::test]
async fn test_missing_model_file_falls_back() {
    let missing = PathBuf::from("does/not/exist/product_ner.json");
    let report = comparator(vec![missing, ruler_model_path()])
        .compare_products(TMT_LOOSE, TMT_BULK)
        .await;
    assert_rebar_report(&report);
}

#[tokio::test]
async fn test_identical_descriptions_fully_match() {
    let report = comparator(vec![ruler_model_path()])
        .compare_products(TMT_LOOSE, TMT_LOOSE)
        .await;

    assert_eq!(report.matching_fields, 6);
    assert!(report
        .rows
        .iter()
        .all(|r| r.status == MatchStatus::ExactMatch));
    assert_eq!(report.overall_similarity, 1.0);
}

#[tokio::test]
async fn test_comparison_is_symmetric() {
    let comparator = comparator(vec![ruler_model_path()]);
    let forward = comparator.compare_products(OPC_43, TMT_LOOSE).await;
    let backward = comparator.compare_products(TMT_LOOSE, OPC_43).await;

    for field in FieldName::ALL {
        assert_eq!(status(&forward, field), status(&backward, field), "{}", field);
    }
    assert_eq!(forward.matching_fields, backward.matching_fields);
}

#[tokio::test]
async fn test_report_extraction_details() {
    let report = comparator(vec![]).compare_products(OPC_43, "").await;

    assert_eq!(
        report.extractions.product1.get(&FieldName::Grade).map(String::as_str),
        Some("OPC 43")
    );
    assert!(report.extractions.product2.is_empty());
    assert_eq!(status(&report, FieldName::Grade), MatchStatus::Mismatch);
    assert_eq!(report.product1, OPC_43);
}

#[tokio::test]
async fn test_unlisted_grades_are_not_invented() {
    let comparator = comparator(vec![ruler_model_path()]);

    for (text1, text2) in [
        ("Steel pipe Class 4", "Steel pipe Class 2"),
        ("Cement Type 2", "Cement Type 3"),
        ("Fe 5 mm rod", "Fe 55 mm rod"),
    ] {
        let report = comparator.compare_products(text1, text2).await;
        assert_eq!(
            value(&report, FieldName::Grade),
            (None, None),
            "{} vs {}",
            text1,
            text2
        );
        assert_eq!(status(&report, FieldName::Grade), MatchStatus::NotMentioned);
    }
}

#[tokio::test]
async fn test_neighbouring_standards_stay_distinct() {
    let report = comparator(vec![ruler_model_path()])
        .compare_products("TMT IS 1786", "TMT IS 1785")
        .await;

    assert_eq!(value(&report, FieldName::Standard), (Some("IS 1786"), Some("IS 1785")));
    assert_ne!(status(&report, FieldName::Standard), MatchStatus::ExactMatch);
}
