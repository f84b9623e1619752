//! Sensor core: anomaly detection and hardware-failure risk scoring for tabular telemetry.
//!
//! Two independent pipelines over the same [`Dataset`]:
//!
//! - IQR outliers per column ([`detect_anomalies`]), then risk scoring of the
//!   flagged rows against full-dataset statistics ([`predict_hardware_failure`]).
//! - Isolation forest over a fixed feature subset ([`detect_multivariate_anomalies`]),
//!   with a verdict from the share of anomalous rows.

mod anomaly;
mod config;
mod error;
mod isolation;
mod loader;
mod models;
mod multivariate;
mod risk;
mod stats;
mod verdict;

pub use anomaly::{
    detect_anomalies, detect_anomalies_with, AnomalySet, ColumnBounds, DEFAULT_IQR_MULTIPLIER,
};
pub use config::{DetectionParams, DEFAULT_FEATURE_COLUMNS};
pub use error::{AnalysisError, LoadError, SchemaWarning};
pub use isolation::{Contamination, ForestConfig, IsolationForest};
pub use loader::{read_csv, write_csv};
pub use models::{ColumnSummary, ColumnType, Dataset, Value};
pub use multivariate::{detect_multivariate_anomalies, MultivariateReport, ANOMALY_LABEL_COLUMN};
pub use risk::{
    predict_hardware_failure, ColumnRisk, ColumnStatistics, RiskRecord, RiskReport,
    OVERALL_RISK_COLUMN,
};
pub use verdict::{RiskLevel, Verdict};
