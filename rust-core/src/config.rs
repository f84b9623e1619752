//! Detection parameters, read from the `params` object of a request.

use crate::anomaly::DEFAULT_IQR_MULTIPLIER;
use crate::error::{AnalysisError, Result};
use crate::isolation::ForestConfig;
use serde::{Deserialize, Serialize};

/// Machine telemetry features used by the multivariate detector unless overridden.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 5] = [
    "Air temperature [K]",
    "Process temperature [K]",
    "Rotational speed [rpm]",
    "Torque [Nm]",
    "Tool wear [min]",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub iqr_multiplier: f64,
    pub forest: ForestConfig,
    pub feature_columns: Vec<String>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            forest: ForestConfig::default(),
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier > 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "iqr_multiplier".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        self.forest.validate()
    }
}
