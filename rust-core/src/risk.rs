//! Risk scoring of flagged rows against full-dataset column statistics.

use crate::anomaly::AnomalySet;
use crate::error::{AnalysisError, SchemaWarning};
use crate::models::{Dataset, Value};
use crate::stats::mean_std;
use crate::verdict::Verdict;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Column name holding each row's mean risk in annotated output.
pub const OVERALL_RISK_COLUMN: &str = "overall_risk_score";

/// Mean and population std of a column over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

impl ColumnStatistics {
    /// |value − mean| / std, or `None` when std is zero.
    pub fn risk(&self, value: f64) -> Option<f64> {
        if self.std > 0.0 {
            Some((value - self.mean).abs() / self.std)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRisk {
    pub column: String,
    pub score: Option<f64>,
}

/// Risk scores of one flagged row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRecord {
    pub row: usize,
    pub scores: Vec<ColumnRisk>,
    pub overall_risk_score: Option<f64>,
}

impl RiskRecord {
    pub fn score(&self, column: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.column == column)
            .and_then(|s| s.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub records: Vec<RiskRecord>,
    pub statistics: Vec<ColumnStatistics>,
    pub max_overall_risk_score: Option<f64>,
    pub verdict: Verdict,
    pub diagnostics: Vec<SchemaWarning>,
}

impl RiskReport {
    /// Flagged rows with a `<column>_risk_score` column per scored column and the overall score.
    pub fn annotate(&self, dataset: &Dataset) -> Result<Dataset, AnalysisError> {
        let rows: Vec<usize> = self.records.iter().map(|r| r.row).collect();
        let mut out = dataset.subset(&rows);
        for stats in &self.statistics {
            let name = format!("{}_risk_score", stats.column);
            warn_on_overwrite(dataset, &name);
            let values = self
                .records
                .iter()
                .map(|r| score_value(r.score(&stats.column)))
                .collect();
            out = out.with_column(&name, values)?;
        }
        warn_on_overwrite(dataset, OVERALL_RISK_COLUMN);
        let overall = self
            .records
            .iter()
            .map(|r| score_value(r.overall_risk_score))
            .collect();
        out.with_column(OVERALL_RISK_COLUMN, overall)
    }
}

fn warn_on_overwrite(dataset: &Dataset, column: &str) {
    if dataset.column_index(column).is_some() {
        warn!(column, "input column replaced by computed risk score");
    }
}

fn score_value(score: Option<f64>) -> Value {
    score.map(Value::Number).unwrap_or(Value::Missing)
}

/// Score each flagged row and derive a verdict from the highest overall score.
///
/// Means and standard deviations come from `dataset`, the population the
/// anomalies were detected in. A column with zero spread yields absent scores.
pub fn predict_hardware_failure<S: AsRef<str>>(
    dataset: &Dataset,
    anomalies: &AnomalySet,
    columns: &[S],
) -> RiskReport {
    if anomalies.is_empty() {
        info!("no anomalies detected");
        return RiskReport {
            records: Vec::new(),
            statistics: Vec::new(),
            max_overall_risk_score: None,
            verdict: Verdict::no_anomalies(),
            diagnostics: Vec::new(),
        };
    }

    let mut diagnostics = Vec::new();
    let mut scored: Vec<(usize, ColumnStatistics)> = Vec::new();
    for column in columns {
        let name = column.as_ref();
        match dataset.numeric_column_index(name) {
            Ok(idx) => {
                if let Some((mean, std)) = mean_std(&dataset.numeric_values(idx)) {
                    debug!(column = name, mean, std, "column statistics");
                    scored.push((
                        idx,
                        ColumnStatistics {
                            column: name.to_string(),
                            mean,
                            std,
                        },
                    ));
                }
            }
            Err(w) => {
                warn!("{}", w);
                diagnostics.push(w);
            }
        }
    }

    let records: Vec<RiskRecord> = anomalies
        .rows
        .iter()
        .map(|&row| {
            let scores: Vec<ColumnRisk> = scored
                .iter()
                .map(|(idx, stats)| ColumnRisk {
                    column: stats.column.clone(),
                    score: dataset
                        .value(row, *idx)
                        .and_then(Value::as_f64)
                        .and_then(|v| stats.risk(v)),
                })
                .collect();
            let available: Vec<f64> = scores.iter().filter_map(|s| s.score).collect();
            let overall_risk_score = if available.is_empty() {
                None
            } else {
                Some(available.iter().sum::<f64>() / available.len() as f64)
            };
            RiskRecord {
                row,
                scores,
                overall_risk_score,
            }
        })
        .collect();

    let max_overall_risk_score = records
        .iter()
        .filter_map(|r| r.overall_risk_score)
        .reduce(f64::max);
    let verdict = match max_overall_risk_score {
        Some(max) => Verdict::from_max_risk(max),
        None => Verdict::unscored(),
    };
    info!(
        flagged = records.len(),
        level = %verdict.level,
        "hardware failure risk scored"
    );

    RiskReport {
        records,
        statistics: scored.into_iter().map(|(_, s)| s).collect(),
        max_overall_risk_score,
        verdict,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::detect_anomalies;
    use crate::models::ColumnType;
    use crate::verdict::RiskLevel;
    use serde_json::json;

    fn dataset(v: serde_json::Value) -> Dataset {
        Dataset::from_records(serde_json::from_value(v).unwrap()).unwrap()
    }

    fn flagged(rows: Vec<usize>) -> AnomalySet {
        AnomalySet {
            rows,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_anomalies_is_low() {
        let ds = dataset(json!([{"v": 1}]));
        let report = predict_hardware_failure(&ds, &AnomalySet::default(), &["v", "other"]);
        assert!(report.records.is_empty());
        assert_eq!(report.verdict, Verdict::no_anomalies());
        assert!(report.verdict.message.starts_with("No anomalies detected"));
    }

    #[test]
    fn test_score_uses_full_dataset_statistics() {
        let ds = dataset(json!([
            {"v": 10}, {"v": 10}, {"v": 10}, {"v": 10}, {"v": 1000}
        ]));
        let anomalies = detect_anomalies(&ds, &["v"]);
        let report = predict_hardware_failure(&ds, &anomalies, &["v"]);

        let values = [10.0, 10.0, 10.0, 10.0, 1000.0];
        let mean = values.iter().sum::<f64>() / 5.0;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0).sqrt();
        let expected = (1000.0 - mean).abs() / std;

        assert_eq!(report.records.len(), 1);
        let score = report.records[0].score("v").unwrap();
        assert!((score - expected).abs() < 1e-9);
        assert!((report.records[0].overall_risk_score.unwrap() - expected).abs() < 1e-9);
        // 2.0 exactly for a single spike among five readings
        assert_eq!(report.verdict.level, RiskLevel::Low);
    }

    #[test]
    fn test_zero_std_column_is_absent_not_nan() {
        let ds = dataset(json!([
            {"flat": 5, "v": 1}, {"flat": 5, "v": 2}, {"flat": 5, "v": 3}
        ]));
        let report = predict_hardware_failure(&ds, &flagged(vec![2]), &["flat", "v"]);
        let rec = &report.records[0];
        assert_eq!(rec.score("flat"), None);
        let v = rec.score("v").unwrap();
        assert!(v.is_finite());
        assert_eq!(rec.overall_risk_score, Some(v));
    }

    #[test]
    fn test_overall_is_mean_of_available_scores() {
        let ds = dataset(json!([
            {"a": 0, "b": 0}, {"a": 2, "b": 4}
        ]));
        // mean a = 1, std a = 1; mean b = 2, std b = 2
        let report = predict_hardware_failure(&ds, &flagged(vec![1]), &["a", "b"]);
        let rec = &report.records[0];
        assert!((rec.score("a").unwrap() - 1.0).abs() < 1e-12);
        assert!((rec.score("b").unwrap() - 1.0).abs() < 1e-12);
        assert!((rec.overall_risk_score.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_usable_columns_is_neutral_low() {
        let ds = dataset(json!([{"name": "x", "v": 1}, {"name": "y", "v": 100}]));
        let report = predict_hardware_failure(&ds, &flagged(vec![1]), &["name", "missing"]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].overall_risk_score, None);
        assert_eq!(report.max_overall_risk_score, None);
        assert_eq!(report.verdict, Verdict::unscored());
        assert_eq!(report.diagnostics.len(), 2);
    }

    #[test]
    fn test_high_risk_verdict() {
        let mut rows: Vec<serde_json::Value> = (0..50).map(|_| json!({"v": 10.0})).collect();
        rows.push(json!({"v": 10_000.0}));
        let ds = dataset(serde_json::Value::Array(rows));
        let anomalies = detect_anomalies(&ds, &["v"]);
        let report = predict_hardware_failure(&ds, &anomalies, &["v"]);
        assert_eq!(report.verdict.level, RiskLevel::High);
        assert!(report.max_overall_risk_score.unwrap() > 3.0);
    }

    #[test]
    fn test_annotate_adds_score_columns() {
        let ds = dataset(json!([
            {"id": "a", "v": 10}, {"id": "b", "v": 10}, {"id": "c", "v": 10},
            {"id": "d", "v": 10}, {"id": "e", "v": 1000}
        ]));
        let anomalies = detect_anomalies(&ds, &["v"]);
        let report = predict_hardware_failure(&ds, &anomalies, &["v"]);
        let annotated = report.annotate(&ds).unwrap();

        assert_eq!(annotated.columns(), &["id", "v", "v_risk_score", OVERALL_RISK_COLUMN]);
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated.value(0, 0), Some(&Value::Text("e".into())));
        assert_eq!(ds.columns().len(), 2);
    }

    #[test]
    fn test_annotate_replaces_colliding_input_columns() {
        let ds = dataset(json!([
            {"v": 10, "overall_risk_score": "stale"}, {"v": 10, "overall_risk_score": "stale"},
            {"v": 10, "overall_risk_score": "stale"}, {"v": 10, "overall_risk_score": "stale"},
            {"v": 1000, "overall_risk_score": "stale"}
        ]));
        let anomalies = detect_anomalies(&ds, &["v"]);
        let report = predict_hardware_failure(&ds, &anomalies, &["v"]);
        let annotated = report.annotate(&ds).unwrap();

        assert_eq!(annotated.columns(), &["v", OVERALL_RISK_COLUMN, "v_risk_score"]);
        let idx = annotated.column_index(OVERALL_RISK_COLUMN).unwrap();
        assert_eq!(
            annotated.value(0, idx),
            Some(&Value::Number(report.records[0].overall_risk_score.unwrap()))
        );
        assert_eq!(annotated.column_type(idx), Some(ColumnType::Numeric));
    }
}
