// Tier 3 - Field Comparison and Reporting
//
// Contract: accepts the fused fields of both descriptions and returns one
// ComparisonRow per FieldName, aggregated into a ComparisonReport.

pub mod field_comparator;
pub mod report;

pub use field_comparator::{ComparisonThresholds, FieldComparator};
pub use report::{ComparisonReport, ExtractionDetails};
