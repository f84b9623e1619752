//! IQR outlier detection over selected columns.

use crate::error::SchemaWarning;
use crate::models::Dataset;
use crate::stats::quartiles;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Fence multiplier for the standard IQR rule.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Outlier fences for one column, recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnBounds {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ColumnBounds {
    pub fn from_values(column: &str, values: &[f64], multiplier: f64) -> Option<Self> {
        let (q1, q3) = quartiles(values)?;
        let iqr = q3 - q1;
        Some(Self {
            column: column.to_string(),
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    /// Strictly outside the fences.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Rows flagged by at least one column, in first-seen order, without duplicates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalySet {
    pub rows: Vec<usize>,
    pub bounds: Vec<ColumnBounds>,
    pub diagnostics: Vec<SchemaWarning>,
}

impl AnomalySet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    /// The flagged rows as their own dataset.
    pub fn to_dataset(&self, source: &Dataset) -> Dataset {
        source.subset(&self.rows)
    }
}

/// Flag outlier rows in `columns` using the 1.5·IQR rule.
pub fn detect_anomalies<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> AnomalySet {
    detect_anomalies_with(dataset, columns, DEFAULT_IQR_MULTIPLIER)
}

/// Flag outlier rows in `columns`, fences at Q1 − k·IQR and Q3 + k·IQR.
///
/// Missing or non-numeric columns are skipped and reported in
/// `diagnostics`; a call where every column is skipped returns an empty set.
pub fn detect_anomalies_with<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
    multiplier: f64,
) -> AnomalySet {
    let mut result = AnomalySet::default();
    if dataset.is_empty() {
        // Zero-row columns have no type yet; only absent names are reported.
        for column in columns {
            let name = column.as_ref();
            if dataset.column_index(name).is_none() {
                let w = SchemaWarning::MissingColumn {
                    column: name.to_string(),
                };
                warn!("{}", w);
                result.diagnostics.push(w);
            }
        }
        debug!("empty dataset, nothing to check");
        return result;
    }

    let mut seen: HashSet<usize> = HashSet::new();
    for column in columns {
        let name = column.as_ref();
        let idx = match dataset.numeric_column_index(name) {
            Ok(idx) => idx,
            Err(w) => {
                warn!("{}", w);
                result.diagnostics.push(w);
                continue;
            }
        };

        let Some(bounds) = ColumnBounds::from_values(name, &dataset.numeric_values(idx), multiplier)
        else {
            continue;
        };
        debug!(
            column = name,
            lower = bounds.lower,
            upper = bounds.upper,
            "iqr bounds"
        );

        for (row, cells) in dataset.rows().iter().enumerate() {
            let flagged = cells[idx].as_f64().is_some_and(|v| bounds.is_outlier(v));
            if flagged && seen.insert(row) {
                result.rows.push(row);
            }
        }
        result.bounds.push(bounds);
    }

    debug!(anomalies = result.rows.len(), "iqr detection done");
    result
}
