//! Qualitative hardware-failure verdicts.

use serde::Serialize;
use std::fmt;

/// Max overall risk score above which the verdict is high.
pub const HIGH_RISK_SCORE: f64 = 3.0;
/// Max overall risk score above which the verdict is at least moderate.
pub const MODERATE_RISK_SCORE: f64 = 2.0;
/// Anomalous-row percentage from which the verdict is high.
pub const HIGH_ANOMALY_PERCENT: f64 = 40.0;
/// Anomalous-row percentage from which the verdict is moderate.
pub const MODERATE_ANOMALY_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        })
    }
}

/// A risk level, its message, and the statistic it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub level: RiskLevel,
    pub message: String,
    pub statistic: Option<f64>,
}

impl Verdict {
    pub fn no_anomalies() -> Self {
        Self {
            level: RiskLevel::Low,
            message: "No anomalies detected. Low risk of hardware failure.".to_string(),
            statistic: None,
        }
    }

    /// Anomalies exist but no requested column could be scored.
    pub fn unscored() -> Self {
        Self {
            level: RiskLevel::Low,
            message: "Risk could not be scored for the selected columns. Continue monitoring."
                .to_string(),
            statistic: None,
        }
    }

    /// Thresholds are strict: exactly 3.0 is moderate, exactly 2.0 is low.
    pub fn from_max_risk(max_risk: f64) -> Self {
        let (level, message) = if max_risk > HIGH_RISK_SCORE {
            (
                RiskLevel::High,
                "High risk of imminent hardware failure. Immediate inspection recommended.",
            )
        } else if max_risk > MODERATE_RISK_SCORE {
            (
                RiskLevel::Moderate,
                "Moderate risk of hardware failure. Schedule an inspection soon.",
            )
        } else {
            (
                RiskLevel::Low,
                "Low risk of hardware failure, but continue monitoring.",
            )
        };
        Self {
            level,
            message: message.to_string(),
            statistic: Some(max_risk),
        }
    }

    /// `percent` in 0-100. Moderate covers [20, 40).
    pub fn from_anomaly_percent(percent: f64) -> Self {
        let (level, advice) = if percent >= HIGH_ANOMALY_PERCENT {
            (RiskLevel::High, "Immediate inspection recommended.")
        } else if percent >= MODERATE_ANOMALY_PERCENT {
            (RiskLevel::Moderate, "Schedule an inspection soon.")
        } else {
            (RiskLevel::Low, "Continue monitoring.")
        };
        Self {
            level,
            message: format!(
                "{:.1}% of readings are anomalous. {} risk of hardware failure. {}",
                percent,
                capitalized(level),
                advice
            ),
            statistic: Some(percent),
        }
    }
}

fn capitalized(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "Low",
        RiskLevel::Moderate => "Moderate",
        RiskLevel::High => "High",
    }
}
