//! Error and diagnostic types.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Non-fatal: a requested column was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    #[error("Column '{column}' not found in the dataset. Skipping.")]
    MissingColumn { column: String },

    #[error("Column '{column}' is not numeric. Skipping.")]
    NonNumericColumn { column: String },
}

impl SchemaWarning {
    pub fn column(&self) -> &str {
        match self {
            SchemaWarning::MissingColumn { column } | SchemaWarning::NonNumericColumn { column } => {
                column
            }
        }
    }
}

/// Failures of an analysis call or of dataset construction.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Required feature column '{0}' not found in the dataset")]
    MissingFeatureColumn(String),

    #[error("Required feature column '{0}' is not numeric")]
    NonNumericFeatureColumn(String),

    #[error("Feature column '{column}' has a missing value at row {row}")]
    MissingFeatureValue { column: String, row: usize },

    #[error("No feature columns given")]
    NoFeatureColumns,

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {found} values, dataset has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Reading or writing a dataset file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("The file at {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("Unable to parse the file at {}. Please check if it's a valid CSV.", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unable to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Dataset(#[from] AnalysisError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
