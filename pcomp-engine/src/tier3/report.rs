//! Comparison report
//!
//! Aggregates per-field rows into an overall similarity score.

use crate::types::{present_values, ComparisonRow, FieldName, FusedFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Present fused values of both descriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDetails {
    pub product1: BTreeMap<FieldName, String>,
    pub product2: BTreeMap<FieldName, String>,
}

/// Result of comparing two product descriptions
///
/// `rows` holds one row per [`FieldName`] in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub product1: String,
    pub product2: String,
    pub extractions: ExtractionDetails,
    pub rows: Vec<ComparisonRow>,
    /// Mean row confidence
    pub overall_similarity: f64,
    pub matching_fields: usize,
    pub total_fields: usize,
}

impl ComparisonReport {
    pub fn new(
        product1: impl Into<String>,
        product2: impl Into<String>,
        fused1: &FusedFields,
        fused2: &FusedFields,
        rows: Vec<ComparisonRow>,
    ) -> Self {
        let total_fields = rows.len();
        let matching_fields = rows.iter().filter(|r| r.status.is_match()).count();
        let overall_similarity = if total_fields == 0 {
            0.0
        } else {
            rows.iter().map(|r| r.confidence).sum::<f64>() / total_fields as f64
        };

        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            product1: product1.into(),
            product2: product2.into(),
            extractions: ExtractionDetails {
                product1: present_values(fused1),
                product2: present_values(fused2),
            },
            rows,
            overall_similarity,
            matching_fields,
            total_fields,
        }
    }

    pub fn row(&self, field: FieldName) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.field == field)
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Product 1: {}", self.product1)?;
        writeln!(f, "Product 2: {}", self.product2)?;
        writeln!(
            f,
            "{:<10} | {:<16} | {:<16} | {:<14} | {}",
            "Field", "Product 1", "Product 2", "Status", "Confidence"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10} | {:<16} | {:<16} | {:<14} | {:.2}",
                row.field,
                row.value1.as_deref().unwrap_or("-"),
                row.value2.as_deref().unwrap_or("-"),
                row.status,
                row.confidence
            )?;
        }
        write!(
            f,
            "Overall similarity: {:.1}% ({}/{} fields match)",
            self.overall_similarity * 100.0,
            self.matching_fields,
            self.total_fields
        )
    }
}
